//! Implements the single focal length radial distortion models.
//!
//! SIMPLE_RADIAL is similar to the model VisualSfM uses, with the difference
//! that distortion is applied to the projections and not to the measurements.
//! RADIAL matches the Bundler camera model (without the inverted z-axis).
//!
//! The distortion offset is `u * (k1 * r^2 + k2 * r^4)` with `r^2 = u^2 + v^2`;
//! the inverse has no closed form and goes through the iterative solver.

use nalgebra::RealField;

use crate::camera::{normalized_to_pixel, pixel_to_normalized, CameraModel, CameraModelId};
use crate::geometry::iterative_undistortion;

/// One focal length and one radial coefficient.
///
/// Parameters: `f, cx, cy, k`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleRadial;

/// One focal length and two radial coefficients.
///
/// Parameters: `f, cx, cy, k1, k2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Radial;

/// Shared forward map of the single focal length models.
pub(crate) fn single_focal_world_to_image<T: RealField>(
    params: &[T],
    u: T,
    v: T,
    distortion: impl Fn(T, T) -> (T, T),
) -> (T, T) {
    let f = params[0].clone();
    let (du, dv) = distortion(u.clone(), v.clone());
    normalized_to_pixel(
        f.clone(),
        f,
        params[1].clone(),
        params[2].clone(),
        u + du,
        v + dv,
    )
}

/// Shared inverse map of the single focal length models.
pub(crate) fn single_focal_image_to_world<T: RealField>(
    params: &[T],
    x: T,
    y: T,
    distortion: impl Fn(T, T) -> (T, T),
) -> (T, T) {
    let f = params[0].clone();
    let (u, v) = pixel_to_normalized(f.clone(), f, params[1].clone(), params[2].clone(), x, y);
    iterative_undistortion(u, v, distortion)
}

impl CameraModel for SimpleRadial {
    const MODEL_ID: CameraModelId = CameraModelId::SimpleRadial;

    fn world_to_image<T: RealField>(params: &[T], u: T, v: T) -> (T, T) {
        single_focal_world_to_image(params, u, v, |u, v| Self::distortion(&params[3..], u, v))
    }

    fn image_to_world<T: RealField>(params: &[T], x: T, y: T) -> (T, T) {
        single_focal_image_to_world(params, x, y, |u, v| Self::distortion(&params[3..], u, v))
    }

    fn distortion<T: RealField>(extra_params: &[T], u: T, v: T) -> (T, T) {
        let k = extra_params[0].clone();

        let r2 = u.clone() * u.clone() + v.clone() * v.clone();
        let radial = k * r2;
        (u * radial.clone(), v * radial)
    }
}

impl CameraModel for Radial {
    const MODEL_ID: CameraModelId = CameraModelId::Radial;

    fn world_to_image<T: RealField>(params: &[T], u: T, v: T) -> (T, T) {
        single_focal_world_to_image(params, u, v, |u, v| Self::distortion(&params[3..], u, v))
    }

    fn image_to_world<T: RealField>(params: &[T], x: T, y: T) -> (T, T) {
        single_focal_image_to_world(params, x, y, |u, v| Self::distortion(&params[3..], u, v))
    }

    fn distortion<T: RealField>(extra_params: &[T], u: T, v: T) -> (T, T) {
        let k1 = extra_params[0].clone();
        let k2 = extra_params[1].clone();

        let r2 = u.clone() * u.clone() + v.clone() * v.clone();
        let radial = k1 * r2.clone() + k2 * r2.clone() * r2;
        (u * radial.clone(), v * radial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_simple_radial_distortion_value() {
        let (du, dv) = SimpleRadial::distortion(&[0.1], 0.3, 0.4);
        // r^2 = 0.25
        assert_relative_eq!(du, 0.3 * 0.025, epsilon = 1e-15);
        assert_relative_eq!(dv, 0.4 * 0.025, epsilon = 1e-15);
    }

    #[test]
    fn test_radial_distortion_is_odd() {
        let extra = [-0.3, 0.08];
        for &(u, v) in &[(0.1, 0.2), (-0.4, 0.25), (0.7, -0.6)] {
            let (du, dv) = Radial::distortion(&extra, u, v);
            let (du_neg, dv_neg) = Radial::distortion(&extra, -u, -v);
            assert_eq!(du_neg, -du);
            assert_eq!(dv_neg, -dv);
        }
    }

    #[test]
    fn test_radial_round_trip() {
        let params = [500.0, 320.0, 240.0, -0.2, 0.05];
        let (x, y) = Radial::world_to_image(&params, 0.25, -0.3);
        let (u, v) = Radial::image_to_world(&params, x, y);
        assert_relative_eq!(u, 0.25, epsilon = 1e-9);
        assert_relative_eq!(v, -0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_distortion_matches_pinhole() {
        let params = [400.0, 200.0, 100.0, 0.0];
        assert_eq!(
            SimpleRadial::world_to_image(&params, 0.2, 0.1),
            (280.0, 140.0)
        );
        assert_eq!(SimpleRadial::image_to_world(&params, 280.0, 140.0), (0.2, 0.1));
    }
}
