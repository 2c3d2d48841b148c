//! Implements the OpenCV pinhole-with-distortion camera models.
//!
//! Both models add Brown-Conrady style tangential terms to a radial term.
//! OPENCV uses a polynomial radial term and is not suitable for the large
//! radial distortion of fisheye lenses. FULL_OPENCV uses the rational radial
//! term `(1 + k1 r^2 + k2 r^4 + k3 r^6) / (1 + k4 r^2 + k5 r^4 + k6 r^6)`,
//! which keeps growth bounded at large radii.
//!
//! See
//! <http://docs.opencv.org/modules/calib3d/doc/camera_calibration_and_3d_reconstruction.html>.

use nalgebra::RealField;

use crate::camera::{lit, normalized_to_pixel, pixel_to_normalized, CameraModel, CameraModelId};
use crate::geometry::iterative_undistortion;

/// Parameters: `fx, fy, cx, cy, k1, k2, p1, p2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCv;

/// Parameters: `fx, fy, cx, cy, k1, k2, p1, p2, k3, k4, k5, k6`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullOpenCv;

/// Shared forward map of the two-focal-length models: offset, then affine map.
pub(crate) fn distorted_world_to_image<T: RealField>(
    params: &[T],
    u: T,
    v: T,
    distortion: impl Fn(T, T) -> (T, T),
) -> (T, T) {
    let (du, dv) = distortion(u.clone(), v.clone());
    normalized_to_pixel(
        params[0].clone(),
        params[1].clone(),
        params[2].clone(),
        params[3].clone(),
        u + du,
        v + dv,
    )
}

/// Shared inverse map of the two-focal-length models.
pub(crate) fn distorted_image_to_world<T: RealField>(
    params: &[T],
    x: T,
    y: T,
    distortion: impl Fn(T, T) -> (T, T),
) -> (T, T) {
    let (u, v) = pixel_to_normalized(
        params[0].clone(),
        params[1].clone(),
        params[2].clone(),
        params[3].clone(),
        x,
        y,
    );
    iterative_undistortion(u, v, distortion)
}

/// Tangential offsets `(2 p1 uv + p2 (r^2 + 2u^2), 2 p2 uv + p1 (r^2 + 2v^2))`.
pub(crate) fn tangential<T: RealField>(p1: T, p2: T, u: T, v: T) -> (T, T) {
    let two: T = lit(2.0);
    let u2 = u.clone() * u.clone();
    let v2 = v.clone() * v.clone();
    let uv = u * v;
    let r2 = u2.clone() + v2.clone();
    (
        two.clone() * p1.clone() * uv.clone() + p2.clone() * (r2.clone() + two.clone() * u2),
        two.clone() * p2 * uv + p1 * (r2 + two * v2),
    )
}

impl CameraModel for OpenCv {
    const MODEL_ID: CameraModelId = CameraModelId::OpenCv;

    fn world_to_image<T: RealField>(params: &[T], u: T, v: T) -> (T, T) {
        distorted_world_to_image(params, u, v, |u, v| Self::distortion(&params[4..], u, v))
    }

    fn image_to_world<T: RealField>(params: &[T], x: T, y: T) -> (T, T) {
        distorted_image_to_world(params, x, y, |u, v| Self::distortion(&params[4..], u, v))
    }

    fn distortion<T: RealField>(extra_params: &[T], u: T, v: T) -> (T, T) {
        let k1 = extra_params[0].clone();
        let k2 = extra_params[1].clone();
        let p1 = extra_params[2].clone();
        let p2 = extra_params[3].clone();

        let r2 = u.clone() * u.clone() + v.clone() * v.clone();
        let radial = k1 * r2.clone() + k2 * r2.clone() * r2;
        let (tu, tv) = tangential(p1, p2, u.clone(), v.clone());
        (u * radial.clone() + tu, v * radial + tv)
    }
}

impl CameraModel for FullOpenCv {
    const MODEL_ID: CameraModelId = CameraModelId::FullOpenCv;

    fn world_to_image<T: RealField>(params: &[T], u: T, v: T) -> (T, T) {
        distorted_world_to_image(params, u, v, |u, v| Self::distortion(&params[4..], u, v))
    }

    fn image_to_world<T: RealField>(params: &[T], x: T, y: T) -> (T, T) {
        distorted_image_to_world(params, x, y, |u, v| Self::distortion(&params[4..], u, v))
    }

    fn distortion<T: RealField>(extra_params: &[T], u: T, v: T) -> (T, T) {
        let k1 = extra_params[0].clone();
        let k2 = extra_params[1].clone();
        let p1 = extra_params[2].clone();
        let p2 = extra_params[3].clone();
        let k3 = extra_params[4].clone();
        let k4 = extra_params[5].clone();
        let k5 = extra_params[6].clone();
        let k6 = extra_params[7].clone();

        let r2 = u.clone() * u.clone() + v.clone() * v.clone();
        let r4 = r2.clone() * r2.clone();
        let r6 = r4.clone() * r2.clone();
        let radial = (T::one() + k1 * r2.clone() + k2 * r4.clone() + k3 * r6.clone())
            / (T::one() + k4 * r2 + k5 * r4 + k6 * r6);
        let (tu, tv) = tangential(p1, p2, u.clone(), v.clone());
        (
            u.clone() * radial.clone() + tu - u,
            v.clone() * radial + tv - v,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_opencv_tangential_terms() {
        // Pure tangential distortion.
        let (du, dv) = OpenCv::distortion(&[0.0, 0.0, 0.01, 0.02], 0.5, 0.25);
        let r2 = 0.5 * 0.5 + 0.25 * 0.25;
        assert_relative_eq!(du, 2.0 * 0.01 * 0.125 + 0.02 * (r2 + 2.0 * 0.25), epsilon = 1e-15);
        assert_relative_eq!(dv, 2.0 * 0.02 * 0.125 + 0.01 * (r2 + 2.0 * 0.0625), epsilon = 1e-15);
    }

    #[test]
    fn test_full_opencv_reduces_to_opencv() {
        let opencv = [0.1, -0.02, 0.001, 0.002];
        let full = [0.1, -0.02, 0.001, 0.002, 0.0, 0.0, 0.0, 0.0];
        for &(u, v) in &[(0.1, 0.2), (-0.3, 0.4), (0.6, -0.05)] {
            let (du, dv) = OpenCv::distortion(&opencv, u, v);
            let (fu, fv) = FullOpenCv::distortion(&full, u, v);
            assert_relative_eq!(du, fu, epsilon = 1e-14);
            assert_relative_eq!(dv, fv, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_full_opencv_rational_term_bounds_growth() {
        // With k1 == k4 the rational radial factor is exactly one.
        let extra = [0.5, 0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0];
        let (du, dv) = FullOpenCv::distortion(&extra, 3.0, 4.0);
        assert_relative_eq!(du, 0.0, epsilon = 1e-12);
        assert_relative_eq!(dv, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_opencv_round_trip() {
        let params = [458.654, 457.296, 367.215, 248.375, -0.28340811, 0.07395907, 0.00019359, 1.76187114e-05];
        for &(u, v) in &[(0.0, 0.0), (0.2, -0.1), (-0.35, 0.3)] {
            let (x, y) = OpenCv::world_to_image(&params, u, v);
            let (uu, vv) = OpenCv::image_to_world(&params, x, y);
            assert_relative_eq!(uu, u, epsilon = 1e-8);
            assert_relative_eq!(vv, v, epsilon = 1e-8);
        }
    }
}
