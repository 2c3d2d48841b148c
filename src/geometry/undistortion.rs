//! Model-agnostic inversion of lens distortion.
//!
//! Given a distortion function `D` and a distorted normalized point `y`, the
//! solver finds `x` with `x + D(x) = y` by Newton iteration. The Jacobian is
//! estimated with central differences, so any current or future distortion
//! function can be inverted without hand-written derivatives.
//!
//! There is no convergence guarantee. A singular Jacobian or divergent input
//! leaves the last iterate in place, which may be NaN for calibrations far
//! outside the well-conditioned range. Callers that need to know can use
//! [`iterative_undistortion_with`] and inspect [`Undistortion::converged`].

use log::debug;
use nalgebra::{Matrix2, RealField, Vector2};
use serde::{Deserialize, Serialize};

use crate::camera::lit;

/// Newton iteration settings used by [`iterative_undistortion_with`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct UndistortOptions {
    /// Maximum number of Newton steps.
    pub max_iterations: usize,
    /// Stop once the squared norm of an update falls below this value.
    pub max_step_squared_norm: f64,
    /// Finite difference step relative to the coordinate magnitude.
    pub relative_step_size: f64,
}

impl Default for UndistortOptions {
    fn default() -> Self {
        // 100 iterations are plenty even for models with higher order terms.
        Self {
            max_iterations: 100,
            max_step_squared_norm: 1e-10,
            relative_step_size: 1e-6,
        }
    }
}

/// Outcome of an undistortion run.
#[derive(Debug, Clone, PartialEq)]
pub struct Undistortion<T: RealField> {
    /// Last iterate, the undistorted normalized point.
    pub point: Vector2<T>,
    /// Number of Newton steps taken.
    pub iterations: usize,
    /// `true` if the step size criterion was met before the iteration cap.
    pub converged: bool,
}

/// Inverts `y = x + distortion(x)` starting from `x = y` with default options.
///
/// Returns the undistorted `(u, v)`.
pub fn iterative_undistortion<T, F>(u: T, v: T, distortion: F) -> (T, T)
where
    T: RealField,
    F: Fn(T, T) -> (T, T),
{
    let point = iterative_undistortion_with(u, v, &UndistortOptions::default(), distortion).point;
    (point[0].clone(), point[1].clone())
}

/// Inverts `y = x + distortion(x)` and reports how the iteration ended.
pub fn iterative_undistortion_with<T, F>(
    u: T,
    v: T,
    options: &UndistortOptions,
    distortion: F,
) -> Undistortion<T>
where
    T: RealField,
    F: Fn(T, T) -> (T, T),
{
    let eps: T = lit(f64::EPSILON);
    let relative_step: T = lit(options.relative_step_size);
    let max_step_norm: T = lit(options.max_step_squared_norm);
    let two: T = lit(2.0);

    let x0 = Vector2::new(u, v);
    let mut x = x0.clone();

    for iteration in 0..options.max_iterations {
        let x_u = x[0].clone();
        let x_v = x[1].clone();
        let step0 = eps.clone().max((relative_step.clone() * x_u.clone()).abs());
        let step1 = eps.clone().max((relative_step.clone() * x_v.clone()).abs());

        let (du, dv) = distortion(x_u.clone(), x_v.clone());
        let (du_0b, dv_0b) = distortion(x_u.clone() - step0.clone(), x_v.clone());
        let (du_0f, dv_0f) = distortion(x_u.clone() + step0.clone(), x_v.clone());
        let (du_1b, dv_1b) = distortion(x_u.clone(), x_v.clone() - step1.clone());
        let (du_1f, dv_1f) = distortion(x_u.clone(), x_v.clone() + step1.clone());

        let two_step0 = two.clone() * step0;
        let two_step1 = two.clone() * step1;
        let jacobian = Matrix2::new(
            T::one() + (du_0f - du_0b) / two_step0.clone(),
            (du_1f - du_1b) / two_step1.clone(),
            (dv_0f - dv_0b) / two_step0,
            T::one() + (dv_1f - dv_1b) / two_step1,
        );
        let residual = Vector2::new(
            x_u + du - x0[0].clone(),
            x_v + dv - x0[1].clone(),
        );

        let Some(jacobian_inv) = jacobian.try_inverse() else {
            debug!(
                "Undistortion stopped after {} iterations: singular Jacobian",
                iteration
            );
            return Undistortion {
                point: x,
                iterations: iteration,
                converged: false,
            };
        };

        let step = jacobian_inv * residual;
        let step_norm = step.norm_squared();
        x -= step;

        if step_norm < max_step_norm {
            return Undistortion {
                point: x,
                iterations: iteration + 1,
                converged: true,
            };
        }
    }

    debug!(
        "Undistortion did not converge after {} iterations",
        options.max_iterations
    );
    Undistortion {
        point: x,
        iterations: options.max_iterations,
        converged: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn radial(u: f64, v: f64) -> (f64, f64) {
        let k1 = -0.25;
        let k2 = 0.05;
        let r2 = u * u + v * v;
        let radial = k1 * r2 + k2 * r2 * r2;
        (u * radial, v * radial)
    }

    #[test]
    fn test_inverts_radial_distortion() {
        let (u, v) = (0.3, -0.2);
        let (du, dv) = radial(u, v);
        let (uu, vv) = iterative_undistortion(u + du, v + dv, radial);
        assert_relative_eq!(uu, u, epsilon = 1e-9);
        assert_relative_eq!(vv, v, epsilon = 1e-9);
    }

    #[test]
    fn test_identity_distortion_converges_immediately() {
        let result =
            iterative_undistortion_with(0.4, 0.1, &UndistortOptions::default(), |_, _| (0.0, 0.0));
        assert!(result.converged);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.point, Vector2::new(0.4, 0.1));
    }

    #[test]
    fn test_reports_non_convergence_at_iteration_cap() {
        let options = UndistortOptions {
            max_iterations: 1,
            ..UndistortOptions::default()
        };
        let (du, dv) = radial(0.5, 0.5);
        let result = iterative_undistortion_with(0.5 + du, 0.5 + dv, &options, radial);
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_singular_jacobian_returns_last_iterate() {
        // x + D(x) is constant, so the Jacobian vanishes.
        let result = iterative_undistortion_with(
            0.0,
            0.0,
            &UndistortOptions::default(),
            |u: f64, v: f64| (-u, -v),
        );
        assert!(!result.converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.point, Vector2::new(0.0, 0.0));
    }

    #[test]
    fn test_default_path_matches_reporting_path() {
        let (du, dv) = radial(0.6, 0.45);
        let (u, v) = iterative_undistortion(0.6 + du, 0.45 + dv, radial);
        let report =
            iterative_undistortion_with(0.6 + du, 0.45 + dv, &UndistortOptions::default(), radial);
        assert!(report.converged);
        assert_eq!(u, report.point.x);
        assert_eq!(v, report.point.y);
    }
}
