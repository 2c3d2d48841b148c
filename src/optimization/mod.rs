//! The `optimization` module connects the camera models to a nonlinear
//! least-squares solver.
//!
//! Every model's forward map is generic over [`nalgebra::RealField`], so a
//! single [`ReprojectionFactor`] serves all of them: `tiny_solver` evaluates it
//! with its dual-number scalar and obtains exact parameter derivatives.
//!
//! The [`Optimizer`] trait is the interface collaborators refine cameras
//! through. [`ReprojectionCost`] implements it with Levenberg-Marquardt over
//! the full parameter vector of a [`Camera`].

use crate::camera::{lit, Camera, CameraModelError, CameraModelId};
use crate::util::{compute_reprojection_error, ProjectionError};

use log::{debug, info};
use nalgebra::{DVector, Matrix2xX, Vector2};
use std::collections::HashMap;
use tiny_solver::factors::Factor;
use tiny_solver::{LevenbergMarquardtOptimizer, Optimizer as TinySolverOptimizer};

/// Pixel residuals of fixed normalized rays against observed pixels.
///
/// The only variable block is the full parameter vector of `model_id`.
#[derive(Debug, Clone)]
pub struct ReprojectionFactor {
    model_id: CameraModelId,
    /// Normalized `(u, v)` coordinates.
    rays: Vec<Vector2<f64>>,
    /// Observed pixel coordinates.
    pixels: Vec<Vector2<f64>>,
}

impl ReprojectionFactor {
    pub fn new(model_id: CameraModelId, rays: &Matrix2xX<f64>, pixels: &Matrix2xX<f64>) -> Self {
        let rays = rays.column_iter().map(|ray| ray.into_owned()).collect();
        let pixels = pixels.column_iter().map(|pixel| pixel.into_owned()).collect();
        Self {
            model_id,
            rays,
            pixels,
        }
    }

    pub fn num_residuals(&self) -> usize {
        self.pixels.len() * 2
    }
}

impl<T: nalgebra::RealField> Factor<T> for ReprojectionFactor {
    fn residual_func(&self, params: &[DVector<T>]) -> DVector<T> {
        let cam_params = params[0].as_slice();
        let mut residuals = DVector::zeros(self.num_residuals());

        for (i, (ray, pixel)) in self.rays.iter().zip(&self.pixels).enumerate() {
            let (x, y) = self
                .model_id
                .world_to_image(cam_params, lit::<T>(ray.x), lit::<T>(ray.y));
            residuals[i * 2] = x - lit::<T>(pixel.x);
            residuals[i * 2 + 1] = y - lit::<T>(pixel.y);
        }
        residuals
    }
}

/// A trait for camera refinement tasks.
pub trait Optimizer {
    /// Refines the camera parameters in place by minimizing the reprojection
    /// error.
    ///
    /// # Arguments
    ///
    /// * `verbose` - If `true`, logs progress and the error before and after.
    fn optimize(&mut self, verbose: bool) -> Result<(), CameraModelError>;

    /// The camera with the current parameter estimate.
    fn camera(&self) -> &Camera;
}

/// Refinement problem: a camera plus ray to pixel correspondences.
#[derive(Debug, Clone)]
pub struct ReprojectionCost {
    camera: Camera,
    /// Normalized rays, one per column.
    rays: Matrix2xX<f64>,
    /// Observed pixels, one per column.
    pixels: Matrix2xX<f64>,
}

impl ReprojectionCost {
    pub fn new(camera: Camera, rays: Matrix2xX<f64>, pixels: Matrix2xX<f64>) -> Self {
        ReprojectionCost {
            camera,
            rays,
            pixels,
        }
    }

    pub fn into_camera(self) -> Camera {
        self.camera
    }

    pub fn reprojection_error(&self) -> Result<ProjectionError, CameraModelError> {
        compute_reprojection_error(&self.camera, &self.rays, &self.pixels)
    }
}

impl Optimizer for ReprojectionCost {
    fn optimize(&mut self, verbose: bool) -> Result<(), CameraModelError> {
        if self.rays.ncols() != self.pixels.ncols() {
            return Err(CameraModelError::InvalidParams(
                "Number of rays and pixels must match".to_string(),
            ));
        }

        if self.rays.ncols() == 0 {
            return Err(CameraModelError::InvalidParams(
                "Point arrays cannot be empty".to_string(),
            ));
        }

        if verbose {
            info!(
                "Refining {} camera ({}) from {} correspondences",
                self.camera.model_id(),
                self.camera.model_id().params_info(),
                self.rays.ncols()
            );
            info!("Before: {:?}", self.reprojection_error()?);
        }

        let mut problem = tiny_solver::Problem::new();
        let factor = ReprojectionFactor::new(self.camera.model_id(), &self.rays, &self.pixels);
        let num_residuals = factor.num_residuals();
        problem.add_residual_block(num_residuals, &["params"], Box::new(factor), None);

        let mut initial_values = HashMap::new();
        initial_values.insert(
            "params".to_string(),
            DVector::from_column_slice(self.camera.params()),
        );

        let optimizer = LevenbergMarquardtOptimizer::default();
        let result = optimizer
            .optimize(&problem, &initial_values, None)
            .ok_or_else(|| CameraModelError::NumericalError("Optimization failed".to_string()))?;

        let optimized_params = result.get("params").ok_or_else(|| {
            CameraModelError::NumericalError("Optimizer returned no parameters".to_string())
        })?;
        if optimized_params.iter().any(|p| !p.is_finite()) {
            return Err(CameraModelError::NumericalError(
                "Optimized parameters are not finite".to_string(),
            ));
        }
        debug!("Optimized parameters: {:?}", optimized_params.as_slice());

        self.camera
            .set_params(optimized_params.iter().copied().collect())?;

        if verbose {
            info!("After: {:?}", self.reprojection_error()?);
        }

        Ok(())
    }

    fn camera(&self) -> &Camera {
        &self.camera
    }
}

/// Refines `camera` against the correspondences and returns the updated copy.
pub fn refine_params(
    camera: &Camera,
    rays: &Matrix2xX<f64>,
    pixels: &Matrix2xX<f64>,
    verbose: bool,
) -> Result<Camera, CameraModelError> {
    let mut cost = ReprojectionCost::new(camera.clone(), rays.clone(), pixels.clone());
    cost.optimize(verbose)?;
    Ok(cost.into_camera())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::sample_points;
    use approx::assert_relative_eq;

    fn get_sample_camera() -> Camera {
        Camera::new(
            CameraModelId::OpenCv,
            752,
            480,
            vec![461.629, 460.152, 362.680, 246.049, -0.2834, 0.0739, 0.0001, 1.7618e-05],
        )
        .unwrap()
    }

    /// Lifts a pixel grid to rays with the true camera.
    fn correspondences(camera: &Camera, n: usize) -> (Matrix2xX<f64>, Matrix2xX<f64>) {
        let pixels = sample_points(camera.width as f64, camera.height as f64, n);
        let rays: Vec<Vector2<f64>> = pixels
            .iter()
            .map(|p| {
                let (u, v) = camera.image_to_world(p.x, p.y);
                Vector2::new(u, v)
            })
            .collect();
        let pixels: Vec<Vector2<f64>> = pixels.iter().map(|p| p.coords).collect();
        (Matrix2xX::from_columns(&rays), Matrix2xX::from_columns(&pixels))
    }

    #[test]
    fn test_factor_residual_is_zero_at_truth() {
        let camera = get_sample_camera();
        let (rays, pixels) = correspondences(&camera, 50);
        let factor = ReprojectionFactor::new(camera.model_id(), &rays, &pixels);
        let residuals = factor.residual_func(&[DVector::from_column_slice(camera.params())]);
        assert_eq!(residuals.len(), factor.num_residuals());
        assert!(residuals.amax() < 1e-4, "max residual {}", residuals.amax());
    }

    #[test]
    fn test_refine_recovers_perturbed_camera() {
        let _ = env_logger::builder().is_test(true).try_init();

        let truth = get_sample_camera();
        let (rays, pixels) = correspondences(&truth, 200);

        let mut params = truth.params().to_vec();
        params[0] *= 1.02;
        params[1] *= 0.98;
        params[2] += 3.0;
        params[4] = -0.25;
        params[5] = 0.05;
        let mut initial = truth.clone();
        initial.set_params(params).unwrap();

        let refined = refine_params(&initial, &rays, &pixels, true).unwrap();
        for (estimated, expected) in refined.params().iter().zip(truth.params()) {
            assert_relative_eq!(*estimated, *expected, epsilon = 1e-4, max_relative = 1e-4);
        }

        let stats = compute_reprojection_error(&refined, &rays, &pixels).unwrap();
        assert!(stats.rmse < 1e-3, "rmse {}", stats.rmse);
    }

    #[test]
    fn test_optimize_rejects_bad_input() {
        let camera = get_sample_camera();
        let (rays, pixels) = correspondences(&camera, 20);

        let mut cost =
            ReprojectionCost::new(camera.clone(), rays.clone(), pixels.columns(0, 5).into_owned());
        assert!(matches!(cost.optimize(false), Err(CameraModelError::InvalidParams(_))));

        let mut cost = ReprojectionCost::new(camera, Matrix2xX::zeros(0), Matrix2xX::zeros(0));
        assert!(matches!(cost.optimize(false), Err(CameraModelError::InvalidParams(_))));
    }
}
