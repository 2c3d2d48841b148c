//! Implements the distortion-free pinhole camera models.
//!
//! Only focal length and principal point are modeled, so both directions are
//! closed form:
//! `x = fx * u + cx`, `y = fy * v + cy`.
//!
//! See <https://en.wikipedia.org/wiki/Pinhole_camera_model>.

use nalgebra::RealField;

use crate::camera::{normalized_to_pixel, pixel_to_normalized, CameraModel, CameraModelId};

/// Pinhole camera with a single focal length.
///
/// Parameters: `f, cx, cy`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplePinhole;

/// Pinhole camera with separate focal lengths per axis.
///
/// Parameters: `fx, fy, cx, cy`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pinhole;

impl CameraModel for SimplePinhole {
    const MODEL_ID: CameraModelId = CameraModelId::SimplePinhole;

    fn world_to_image<T: RealField>(params: &[T], u: T, v: T) -> (T, T) {
        let f = params[0].clone();
        normalized_to_pixel(f.clone(), f, params[1].clone(), params[2].clone(), u, v)
    }

    fn image_to_world<T: RealField>(params: &[T], x: T, y: T) -> (T, T) {
        let f = params[0].clone();
        pixel_to_normalized(f.clone(), f, params[1].clone(), params[2].clone(), x, y)
    }
}

impl CameraModel for Pinhole {
    const MODEL_ID: CameraModelId = CameraModelId::Pinhole;

    fn world_to_image<T: RealField>(params: &[T], u: T, v: T) -> (T, T) {
        normalized_to_pixel(
            params[0].clone(),
            params[1].clone(),
            params[2].clone(),
            params[3].clone(),
            u,
            v,
        )
    }

    fn image_to_world<T: RealField>(params: &[T], x: T, y: T) -> (T, T) {
        pixel_to_normalized(
            params[0].clone(),
            params[1].clone(),
            params[2].clone(),
            params[3].clone(),
            x,
            y,
        )
    }
}
