//! Implements the equidistant fisheye camera models.
//!
//! All four models map the angle of incidence `theta = atan(r)` linearly to the
//! image radius, corrected by an odd polynomial in `theta`. They handle fields
//! of view well beyond what a perspective model can represent.
//!
//! THIN_PRISM_FISHEYE first re-parameterizes the normalized point to
//! equidistant coordinates and then applies radial, tangential and thin prism
//! terms on top.
//!
//! See
//! <http://docs.opencv.org/master/db/d58/group__calib3d__fisheye.html> and
//! "Camera Calibration with Distortion Models and Accuracy Evaluation",
//! J. Weng et al., TPAMI 1992.

use nalgebra::RealField;

use crate::camera::opencv::{distorted_image_to_world, distorted_world_to_image, tangential};
use crate::camera::radial::{single_focal_image_to_world, single_focal_world_to_image};
use crate::camera::{lit, CameraModel, CameraModelId};

/// Parameters: `fx, fy, cx, cy, k1, k2, k3, k4`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenCvFisheye;

/// OPENCV_FISHEYE restricted to one focal length and one coefficient.
///
/// Parameters: `f, cx, cy, k`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleRadialFisheye;

/// OPENCV_FISHEYE restricted to one focal length and two coefficients.
///
/// Parameters: `f, cx, cy, k1, k2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RadialFisheye;

/// Parameters: `fx, fy, cx, cy, k1, k2, p1, p2, k3, k4, sx1, sy1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThinPrismFisheye;

/// Offset of the equidistant projection with the correction
/// `theta_d = theta * polynomial(theta^2)`.
///
/// Points within machine epsilon of the optical axis have a zero offset.
fn equidistant_offset<T: RealField>(u: T, v: T, polynomial: impl Fn(T) -> T) -> (T, T) {
    let r = (u.clone() * u.clone() + v.clone() * v.clone()).sqrt();
    if r > lit::<T>(f64::EPSILON) {
        let theta = r.clone().atan();
        let theta2 = theta.clone() * theta.clone();
        let thetad = theta * polynomial(theta2);
        (
            u.clone() * thetad.clone() / r.clone() - u,
            v.clone() * thetad / r - v,
        )
    } else {
        (T::zero(), T::zero())
    }
}

impl CameraModel for OpenCvFisheye {
    const MODEL_ID: CameraModelId = CameraModelId::OpenCvFisheye;

    fn world_to_image<T: RealField>(params: &[T], u: T, v: T) -> (T, T) {
        distorted_world_to_image(params, u, v, |u, v| Self::distortion(&params[4..], u, v))
    }

    fn image_to_world<T: RealField>(params: &[T], x: T, y: T) -> (T, T) {
        distorted_image_to_world(params, x, y, |u, v| Self::distortion(&params[4..], u, v))
    }

    fn distortion<T: RealField>(extra_params: &[T], u: T, v: T) -> (T, T) {
        let k1 = extra_params[0].clone();
        let k2 = extra_params[1].clone();
        let k3 = extra_params[2].clone();
        let k4 = extra_params[3].clone();

        equidistant_offset(u, v, |theta2: T| {
            let theta4 = theta2.clone() * theta2.clone();
            let theta6 = theta4.clone() * theta2.clone();
            let theta8 = theta4.clone() * theta4.clone();
            T::one()
                + k1.clone() * theta2
                + k2.clone() * theta4
                + k3.clone() * theta6
                + k4.clone() * theta8
        })
    }
}

impl CameraModel for SimpleRadialFisheye {
    const MODEL_ID: CameraModelId = CameraModelId::SimpleRadialFisheye;

    fn world_to_image<T: RealField>(params: &[T], u: T, v: T) -> (T, T) {
        single_focal_world_to_image(params, u, v, |u, v| Self::distortion(&params[3..], u, v))
    }

    fn image_to_world<T: RealField>(params: &[T], x: T, y: T) -> (T, T) {
        single_focal_image_to_world(params, x, y, |u, v| Self::distortion(&params[3..], u, v))
    }

    fn distortion<T: RealField>(extra_params: &[T], u: T, v: T) -> (T, T) {
        let k = extra_params[0].clone();
        equidistant_offset(u, v, |theta2: T| T::one() + k.clone() * theta2)
    }
}

impl CameraModel for RadialFisheye {
    const MODEL_ID: CameraModelId = CameraModelId::RadialFisheye;

    fn world_to_image<T: RealField>(params: &[T], u: T, v: T) -> (T, T) {
        single_focal_world_to_image(params, u, v, |u, v| Self::distortion(&params[3..], u, v))
    }

    fn image_to_world<T: RealField>(params: &[T], x: T, y: T) -> (T, T) {
        single_focal_image_to_world(params, x, y, |u, v| Self::distortion(&params[3..], u, v))
    }

    fn distortion<T: RealField>(extra_params: &[T], u: T, v: T) -> (T, T) {
        let k1 = extra_params[0].clone();
        let k2 = extra_params[1].clone();
        equidistant_offset(u, v, |theta2: T| {
            let theta4 = theta2.clone() * theta2.clone();
            T::one() + k1.clone() * theta2 + k2.clone() * theta4
        })
    }
}

impl CameraModel for ThinPrismFisheye {
    const MODEL_ID: CameraModelId = CameraModelId::ThinPrismFisheye;

    fn world_to_image<T: RealField>(params: &[T], u: T, v: T) -> (T, T) {
        // Equidistant re-parameterization; the distortion acts on (uu, vv).
        let r = (u.clone() * u.clone() + v.clone() * v.clone()).sqrt();
        let (uu, vv) = if r > lit::<T>(f64::EPSILON) {
            let theta = r.clone().atan();
            (theta.clone() * u / r.clone(), theta * v / r)
        } else {
            (u, v)
        };
        distorted_world_to_image(params, uu, vv, |u, v| Self::distortion(&params[4..], u, v))
    }

    fn image_to_world<T: RealField>(params: &[T], x: T, y: T) -> (T, T) {
        let (u, v) =
            distorted_image_to_world(params, x, y, |u, v| Self::distortion(&params[4..], u, v));

        // Undo the re-parameterization: tan(theta) / theta.
        let theta = (u.clone() * u.clone() + v.clone() * v.clone()).sqrt();
        let theta_cos_theta = theta.clone() * theta.clone().cos();
        if theta_cos_theta > lit::<T>(f64::EPSILON) {
            let scale = theta.sin() / theta_cos_theta;
            (u * scale.clone(), v * scale)
        } else {
            (u, v)
        }
    }

    fn distortion<T: RealField>(extra_params: &[T], u: T, v: T) -> (T, T) {
        let k1 = extra_params[0].clone();
        let k2 = extra_params[1].clone();
        let p1 = extra_params[2].clone();
        let p2 = extra_params[3].clone();
        let k3 = extra_params[4].clone();
        let k4 = extra_params[5].clone();
        let sx1 = extra_params[6].clone();
        let sy1 = extra_params[7].clone();

        let r2 = u.clone() * u.clone() + v.clone() * v.clone();
        let r4 = r2.clone() * r2.clone();
        let r6 = r4.clone() * r2.clone();
        let r8 = r4.clone() * r4.clone();
        let radial = k1 * r2.clone() + k2 * r4 + k3 * r6 + k4 * r8;
        let (tu, tv) = tangential(p1, p2, u.clone(), v.clone());
        (
            u * radial.clone() + tu + sx1 * r2.clone(),
            v * radial + tv + sy1 * r2,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fisheye_offset_vanishes_on_axis() {
        assert_eq!(OpenCvFisheye::distortion(&[0.1, 0.2, 0.3, 0.4], 0.0, 0.0), (0.0, 0.0));
        assert_eq!(SimpleRadialFisheye::distortion(&[0.5], 1e-17, 0.0), (0.0, 0.0));
        assert_eq!(RadialFisheye::distortion(&[0.5, 0.1], 0.0, -1e-17), (0.0, 0.0));
    }

    #[test]
    fn test_equidistant_projection_without_coefficients() {
        // Zero coefficients: the image radius equals the incidence angle.
        let params = [300.0, 300.0, 320.0, 240.0, 0.0, 0.0, 0.0, 0.0];
        let (x, y) = OpenCvFisheye::world_to_image(&params, 1.0, 0.0);
        assert_relative_eq!(x, 320.0 + 300.0 * std::f64::consts::FRAC_PI_4, epsilon = 1e-10);
        assert_relative_eq!(y, 240.0, epsilon = 1e-12);
    }

    #[test]
    fn test_radial_fisheye_reduces_to_opencv_fisheye() {
        let single = [300.0, 320.0, 240.0, 0.05, -0.01];
        let double = [300.0, 300.0, 320.0, 240.0, 0.05, -0.01, 0.0, 0.0];
        for &(u, v) in &[(0.3, 0.4), (-1.2, 0.7), (2.0, -2.5)] {
            let (x1, y1) = RadialFisheye::world_to_image(&single, u, v);
            let (x2, y2) = OpenCvFisheye::world_to_image(&double, u, v);
            assert_relative_eq!(x1, x2, epsilon = 1e-10);
            assert_relative_eq!(y1, y2, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_fisheye_round_trip_at_wide_angle() {
        let params = [400.0, 390.0, 640.0, 480.0, 0.02, -0.005, 0.001, -0.0002];
        for &(u, v) in &[(0.0, 0.0), (0.5, 0.5), (-1.5, 1.0), (2.5, -0.5)] {
            let (x, y) = OpenCvFisheye::world_to_image(&params, u, v);
            let (uu, vv) = OpenCvFisheye::image_to_world(&params, x, y);
            assert_relative_eq!(uu, u, epsilon = 1e-6);
            assert_relative_eq!(vv, v, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_thin_prism_terms() {
        // Only the prism coefficients set.
        let extra = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.01, -0.02];
        let (du, dv) = ThinPrismFisheye::distortion(&extra, 0.3, 0.4);
        assert_relative_eq!(du, 0.01 * 0.25, epsilon = 1e-15);
        assert_relative_eq!(dv, -0.02 * 0.25, epsilon = 1e-15);
    }

    #[test]
    fn test_thin_prism_round_trip() {
        let params = [
            500.0, 505.0, 640.0, 512.0, 0.01, -0.002, 0.0005, -0.0003, 0.0001, 0.0, 0.0002, -0.0001,
        ];
        for &(u, v) in &[(0.0, 0.0), (0.1, -0.2), (0.8, 0.6), (-1.1, 0.4)] {
            let (x, y) = ThinPrismFisheye::world_to_image(&params, u, v);
            let (uu, vv) = ThinPrismFisheye::image_to_world(&params, x, y);
            assert_relative_eq!(uu, u, epsilon = 1e-6);
            assert_relative_eq!(vv, v, epsilon = 1e-6);
        }
    }
}
