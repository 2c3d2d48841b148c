//! This module defines the camera models and their shared plumbing.
//!
//! Every model converts between normalized camera coordinates `(u, v, 1)` and
//! pixel coordinates. The image convention is that the upper left image corner
//! has coordinate `(0, 0)` and the lower right corner `(width, height)`, so the
//! upper left pixel center sits at `(0.5, 0.5)` and the lower right one at
//! `(width - 0.5, height - 0.5)`.
//!
//! Models are zero-sized types implementing [`CameraModel`]; runtime dispatch
//! goes through the closed [`CameraModelId`] enum and its descriptor table:
//! - `pinhole`: SIMPLE_PINHOLE and PINHOLE (no distortion).
//! - `radial`: SIMPLE_RADIAL and RADIAL.
//! - `opencv`: OPENCV and FULL_OPENCV.
//! - `fisheye`: OPENCV_FISHEYE, SIMPLE_RADIAL_FISHEYE, RADIAL_FISHEYE and
//!   THIN_PRISM_FISHEYE.
//! - `fov`: the FOV (division) model.
//!
//! All formulas are generic over [`nalgebra::RealField`] so that an optimizer can
//! evaluate them with dual numbers.

use nalgebra::RealField;
use serde::{Deserialize, Serialize};

pub mod fisheye;
pub mod fov;
pub mod model_id;
pub mod opencv;
pub mod pinhole;
pub mod radial;
pub mod registry;
pub mod validation;

pub use fisheye::{OpenCvFisheye, RadialFisheye, SimpleRadialFisheye, ThinPrismFisheye};
pub use fov::Fov;
pub use model_id::{CameraModelId, ModelDescriptor, INVALID_CAMERA_MODEL_ID, MODEL_DESCRIPTORS};
pub use opencv::{FullOpenCv, OpenCv};
pub use pinhole::{Pinhole, SimplePinhole};
pub use radial::{Radial, SimpleRadial};
pub use validation::BogusParamsOptions;

/// Defines the possible errors that can occur during camera model operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CameraModelError {
    /// The model id or name is not registered.
    #[error("Camera model does not exist: {0}")]
    UnknownModel(String),
    /// The parameter vector length does not match the model.
    #[error("{model} expects {expected} parameters, got {actual}")]
    ParamCountMismatch {
        model: CameraModelId,
        expected: usize,
        actual: usize,
    },
    /// One or more camera parameters are malformed.
    #[error("Invalid camera parameters: {0}")]
    InvalidParams(String),
    /// A numerical routine failed, e.g. the refinement did not produce a result.
    #[error("NumericalError: {0}")]
    NumericalError(String),
}

impl From<csv::Error> for CameraModelError {
    fn from(err: csv::Error) -> Self {
        CameraModelError::InvalidParams(err.to_string())
    }
}

/// Converts an `f64` constant into the scalar type of a generic formula.
#[inline]
pub(crate) fn lit<T: RealField>(value: f64) -> T {
    nalgebra::convert(value)
}

/// Applies the affine focal length / principal point map.
#[inline]
pub(crate) fn normalized_to_pixel<T: RealField>(fx: T, fy: T, cx: T, cy: T, u: T, v: T) -> (T, T) {
    (fx * u + cx, fy * v + cy)
}

/// Inverts [`normalized_to_pixel`].
#[inline]
pub(crate) fn pixel_to_normalized<T: RealField>(fx: T, fy: T, cx: T, cy: T, x: T, y: T) -> (T, T) {
    ((x - cx) / fx, (y - cy) / fy)
}

/// Trait implemented by every camera model.
///
/// Parameter slices passed to [`CameraModel::world_to_image`] and
/// [`CameraModel::image_to_world`] hold the full parameter vector in the order
/// given by the model's descriptor; [`CameraModel::distortion`] receives only
/// the distortion tail.
pub trait CameraModel {
    const MODEL_ID: CameraModelId;

    /// Projects normalized camera coordinates to pixel coordinates.
    fn world_to_image<T: RealField>(params: &[T], u: T, v: T) -> (T, T);

    /// Lifts pixel coordinates to normalized camera coordinates.
    fn image_to_world<T: RealField>(params: &[T], x: T, y: T) -> (T, T);

    /// Offset added to normalized coordinates by the lens distortion.
    fn distortion<T: RealField>(_extra_params: &[T], _u: T, _v: T) -> (T, T) {
        (T::zero(), T::zero())
    }

    /// Focal lengths set to `focal_length`, principal point at the image center,
    /// distortion parameters zeroed.
    fn initialize_params(focal_length: f64, width: usize, height: usize) -> Vec<f64> {
        let descriptor = Self::MODEL_ID.descriptor();
        let mut params = vec![0.0; descriptor.num_params];
        for &idx in descriptor.focal_length_idxs {
            params[idx] = focal_length;
        }
        params[descriptor.principal_point_idxs[0]] = width as f64 / 2.0;
        params[descriptor.principal_point_idxs[1]] = height as f64 / 2.0;
        params
    }
}

/// A camera: model, image size and parameter vector.
///
/// The parameter count always matches the model. Construction, deserialization
/// and [`Camera::set_params`] all check it, so the transforms never index past
/// the end of the vector.
///
/// The model is serialized by its canonical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CameraData")]
pub struct Camera {
    model_id: CameraModelId,
    pub width: usize,
    pub height: usize,
    params: Vec<f64>,
}

/// Unchecked serialized form of a [`Camera`].
#[derive(Deserialize)]
struct CameraData {
    model_id: CameraModelId,
    width: usize,
    height: usize,
    params: Vec<f64>,
}

impl TryFrom<CameraData> for Camera {
    type Error = CameraModelError;

    fn try_from(data: CameraData) -> Result<Self, Self::Error> {
        Camera::new(data.model_id, data.width, data.height, data.params)
    }
}

impl Camera {
    /// Creates a camera, checking the parameter count against the model.
    pub fn new(
        model_id: CameraModelId,
        width: usize,
        height: usize,
        params: Vec<f64>,
    ) -> Result<Self, CameraModelError> {
        check_param_count(model_id, &params)?;
        Ok(Camera {
            model_id,
            width,
            height,
            params,
        })
    }

    /// Creates a camera with default parameters for the given focal length.
    pub fn with_focal_length(
        model_id: CameraModelId,
        focal_length: f64,
        width: usize,
        height: usize,
    ) -> Self {
        Camera {
            model_id,
            width,
            height,
            params: model_id.initialize_params(focal_length, width, height),
        }
    }

    /// Creates a camera from a model name and a comma-separated parameter list.
    pub fn from_text(
        model_name: &str,
        width: usize,
        height: usize,
        params_text: &str,
    ) -> Result<Self, CameraModelError> {
        let model_id = CameraModelId::from_name(model_name)?;
        let params = crate::util::parse_params(params_text)?;
        Camera::new(model_id, width, height, params)
    }

    /// Comma-separated parameter list, see [`crate::util::format_params`].
    pub fn params_to_text(&self) -> String {
        crate::util::format_params(&self.params)
    }

    pub fn model_id(&self) -> CameraModelId {
        self.model_id
    }

    pub fn params(&self) -> &[f64] {
        &self.params
    }

    /// Replaces the parameter vector, keeping the old one on a count mismatch.
    pub fn set_params(&mut self, params: Vec<f64>) -> Result<(), CameraModelError> {
        check_param_count(self.model_id, &params)?;
        self.params = params;
        Ok(())
    }

    pub fn model_name(&self) -> &'static str {
        self.model_id.name()
    }

    pub fn focal_length_x(&self) -> f64 {
        self.params[self.model_id.focal_length_idxs()[0]]
    }

    /// Falls back to the single focal length for `f, cx, cy` style models.
    pub fn focal_length_y(&self) -> f64 {
        let idxs = self.model_id.focal_length_idxs();
        self.params[idxs[idxs.len() - 1]]
    }

    pub fn mean_focal_length(&self) -> f64 {
        let idxs = self.model_id.focal_length_idxs();
        idxs.iter().map(|&idx| self.params[idx]).sum::<f64>() / idxs.len() as f64
    }

    pub fn principal_point_x(&self) -> f64 {
        self.params[self.model_id.principal_point_idxs()[0]]
    }

    pub fn principal_point_y(&self) -> f64 {
        self.params[self.model_id.principal_point_idxs()[1]]
    }

    pub fn extra_params(&self) -> &[f64] {
        &self.params[self.model_id.descriptor().extra_params_offset()..]
    }

    pub fn has_bogus_params(&self, options: &BogusParamsOptions) -> bool {
        validation::has_bogus_params_with(
            self.model_id,
            &self.params,
            self.width,
            self.height,
            options,
        )
    }

    pub fn world_to_image(&self, u: f64, v: f64) -> (f64, f64) {
        self.model_id.world_to_image(&self.params, u, v)
    }

    pub fn image_to_world(&self, x: f64, y: f64) -> (f64, f64) {
        self.model_id.image_to_world(&self.params, x, y)
    }

    pub fn image_to_world_threshold(&self, threshold: f64) -> f64 {
        self.model_id.image_to_world_threshold(&self.params, threshold)
    }
}

fn check_param_count(model_id: CameraModelId, params: &[f64]) -> Result<(), CameraModelError> {
    if validation::verify_params(model_id, params) {
        Ok(())
    } else {
        Err(CameraModelError::ParamCountMismatch {
            model: model_id,
            expected: model_id.num_params(),
            actual: params.len(),
        })
    }
}
