//! Geometry helpers.
//!
//! [`undistortion`] holds the Newton solver behind the inverse projection of
//! the models without a closed form. [`sample_points`] lays out a pixel grid
//! for building ray to pixel correspondences, e.g. to check or refine a camera.

use nalgebra::Point2;

pub mod undistortion;

pub use undistortion::{
    iterative_undistortion, iterative_undistortion_with, Undistortion, UndistortOptions,
};

/// Generate a grid of pixel centers that are evenly distributed across the image
///
/// Points follow the half-integer pixel center convention, so the grid never
/// touches the image border.
///
/// # Arguments
///
/// * `width` - The width of the image in pixels
/// * `height` - The height of the image in pixels
/// * `n` - The approximate number of points to generate
///
/// # Returns
///
/// A vector of 2D points representing pixel coordinates
pub fn sample_points(width: f64, height: f64, n: usize) -> Vec<Point2<f64>> {
    let mut points = Vec::new();

    let num_cells_x = ((n as f64 * (width / height)).sqrt().round() as usize).max(1);
    let num_cells_y = ((n as f64 * (height / width)).sqrt().round() as usize).max(1);

    let cell_width = width / num_cells_x as f64;
    let cell_height = height / num_cells_y as f64;

    for i in 0..num_cells_y {
        for j in 0..num_cells_x {
            let x = (j as f64 + 0.5) * cell_width;
            let y = (i as f64 + 0.5) * cell_height;
            points.push(Point2::new(x, y));
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_points() {
        let width = 800f64;
        let height = 600f64;
        let n = 100;

        let points = sample_points(width, height, n);

        let expected_count = (n as f64 * 0.8) as usize..=(n as f64 * 1.2) as usize;
        assert!(
            expected_count.contains(&points.len()),
            "Expected around {} points, got {}",
            n,
            points.len()
        );

        for point in &points {
            assert!(point.x > 0.0 && point.x < width, "x outside image: {}", point.x);
            assert!(point.y > 0.0 && point.y < height, "y outside image: {}", point.y);
        }
    }

    #[test]
    fn test_sample_points_degenerate_request() {
        let points = sample_points(10.0, 10.0, 0);
        assert_eq!(points, vec![Point2::new(5.0, 5.0)]);
    }
}
