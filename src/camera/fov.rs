//! Implements the FOV camera model.
//!
//! Based on the division model of "Straight lines have to be straight",
//! F. Devernay and O. Faugeras, 2001. A single coefficient `omega` describes
//! the field of view of an ideal fisheye lens. The forward map scales the
//! normalized point by `atan(2 r tan(omega / 2)) / (r omega)` and the inverse
//! by `tan(r omega) / (2 r tan(omega / 2))`, so both directions are closed form.
//!
//! Both factors have removable singularities at `omega = 0` and `r = 0`. Near
//! them the factors are replaced by second order series expansions.

use nalgebra::RealField;

use crate::camera::{lit, normalized_to_pixel, pixel_to_normalized, CameraModel, CameraModelId};

/// Threshold on `omega^2` and `r^2` below which the series branches apply.
const SERIES_EPSILON: f64 = 1e-4;

/// Seed for `omega`. Zero is the identity map but a poor starting point for
/// refinement.
const INITIAL_OMEGA: f64 = 1e-2;

/// Parameters: `fx, fy, cx, cy, omega`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fov;

/// Forward scale factor applied to the normalized point.
fn distortion_factor<T: RealField>(omega: T, radius2: T) -> T {
    let eps: T = lit(SERIES_EPSILON);
    let two: T = lit(2.0);
    let three: T = lit(3.0);
    let omega2 = omega.clone() * omega.clone();

    if omega2 < eps {
        omega2.clone() * radius2 / three - omega2 / lit::<T>(12.0) + T::one()
    } else if radius2 < eps {
        let tan_half_omega = (omega.clone() / two.clone()).tan();
        (-two * tan_half_omega.clone()
            * (lit::<T>(4.0) * radius2 * tan_half_omega.clone() * tan_half_omega - three.clone()))
            / (three * omega)
    } else {
        let radius = radius2.sqrt();
        let numerator = (radius.clone() * two * (omega.clone() / lit::<T>(2.0)).tan()).atan();
        numerator / (radius * omega)
    }
}

/// Inverse scale factor applied to the distorted normalized point.
fn undistortion_factor<T: RealField>(omega: T, radius2: T) -> T {
    let eps: T = lit(SERIES_EPSILON);
    let two: T = lit(2.0);
    let omega2 = omega.clone() * omega.clone();

    if omega2 < eps {
        omega2.clone() * radius2 / lit::<T>(3.0) - omega2 / lit::<T>(12.0) + T::one()
    } else if radius2 < eps {
        (omega.clone() * (omega.clone() * omega.clone() * radius2 + lit::<T>(3.0)))
            / (lit::<T>(6.0) * (omega / two).tan())
    } else {
        let radius = radius2.sqrt();
        let numerator = (radius.clone() * omega.clone()).tan();
        numerator / (radius * two * (omega / lit::<T>(2.0)).tan())
    }
}

impl Fov {
    /// Maps a distorted normalized point back to the undistorted one.
    pub fn undistortion<T: RealField>(extra_params: &[T], u: T, v: T) -> (T, T) {
        let radius2 = u.clone() * u.clone() + v.clone() * v.clone();
        let factor = undistortion_factor(extra_params[0].clone(), radius2);
        (u * factor.clone(), v * factor)
    }
}

impl CameraModel for Fov {
    const MODEL_ID: CameraModelId = CameraModelId::Fov;

    fn world_to_image<T: RealField>(params: &[T], u: T, v: T) -> (T, T) {
        let radius2 = u.clone() * u.clone() + v.clone() * v.clone();
        let factor = distortion_factor(params[4].clone(), radius2);
        normalized_to_pixel(
            params[0].clone(),
            params[1].clone(),
            params[2].clone(),
            params[3].clone(),
            u * factor.clone(),
            v * factor,
        )
    }

    fn image_to_world<T: RealField>(params: &[T], x: T, y: T) -> (T, T) {
        let (u, v) = pixel_to_normalized(
            params[0].clone(),
            params[1].clone(),
            params[2].clone(),
            params[3].clone(),
            x,
            y,
        );
        Self::undistortion(&params[4..], u, v)
    }

    /// Offset form of the forward map, `u * factor - u`.
    fn distortion<T: RealField>(extra_params: &[T], u: T, v: T) -> (T, T) {
        let radius2 = u.clone() * u.clone() + v.clone() * v.clone();
        let factor = distortion_factor(extra_params[0].clone(), radius2);
        (
            u.clone() * factor.clone() - u,
            v.clone() * factor - v,
        )
    }

    fn initialize_params(focal_length: f64, width: usize, height: usize) -> Vec<f64> {
        vec![
            focal_length,
            focal_length,
            width as f64 / 2.0,
            height as f64 / 2.0,
            INITIAL_OMEGA,
        ]
    }
}
