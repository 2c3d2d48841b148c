//! Plausibility checks on camera parameter vectors.
//!
//! None of these predicates fail: a parameter vector is either acceptable or
//! bogus. The reconstruction pipeline uses them to reject cameras after
//! refinement drifted into implausible territory.

use serde::{Deserialize, Serialize};

use crate::camera::CameraModelId;

/// Bounds used by [`has_bogus_params_with`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BogusParamsOptions {
    /// Smallest accepted `focal_length / max(width, height)`.
    pub min_focal_length_ratio: f64,
    /// Largest accepted `focal_length / max(width, height)`.
    pub max_focal_length_ratio: f64,
    /// Largest accepted absolute value of a distortion parameter.
    pub max_extra_param: f64,
}

impl Default for BogusParamsOptions {
    fn default() -> Self {
        Self {
            min_focal_length_ratio: 0.1,
            max_focal_length_ratio: 10.0,
            max_extra_param: 1.0,
        }
    }
}

/// `true` iff `params` has exactly the number of entries the model expects.
pub fn verify_params(model_id: CameraModelId, params: &[f64]) -> bool {
    params.len() == model_id.num_params()
}

/// The principal point must lie inside the image, borders included.
pub fn has_bogus_principal_point(
    model_id: CameraModelId,
    params: &[f64],
    width: usize,
    height: usize,
) -> bool {
    let [cx_idx, cy_idx] = model_id.descriptor().principal_point_idxs;
    let cx = params[cx_idx];
    let cy = params[cy_idx];
    cx < 0.0 || cx > width as f64 || cy < 0.0 || cy > height as f64
}

pub fn has_bogus_focal_length(
    model_id: CameraModelId,
    params: &[f64],
    width: usize,
    height: usize,
    min_focal_length_ratio: f64,
    max_focal_length_ratio: f64,
) -> bool {
    let max_size = width.max(height) as f64;
    model_id.focal_length_idxs().iter().any(|&idx| {
        let focal_length_ratio = params[idx] / max_size;
        focal_length_ratio < min_focal_length_ratio || focal_length_ratio > max_focal_length_ratio
    })
}

pub fn has_bogus_extra_params(model_id: CameraModelId, params: &[f64], max_extra_param: f64) -> bool {
    model_id
        .extra_params_idxs()
        .iter()
        .any(|&idx| params[idx].abs() > max_extra_param)
}

/// Checks principal point, focal length and distortion parameters, in that
/// order, stopping at the first bogus group.
///
/// `params` must satisfy [`verify_params`].
pub fn has_bogus_params(
    model_id: CameraModelId,
    params: &[f64],
    width: usize,
    height: usize,
    min_focal_length_ratio: f64,
    max_focal_length_ratio: f64,
    max_extra_param: f64,
) -> bool {
    has_bogus_principal_point(model_id, params, width, height)
        || has_bogus_focal_length(
            model_id,
            params,
            width,
            height,
            min_focal_length_ratio,
            max_focal_length_ratio,
        )
        || has_bogus_extra_params(model_id, params, max_extra_param)
}

/// [`has_bogus_params`] with the bounds taken from `options`.
pub fn has_bogus_params_with(
    model_id: CameraModelId,
    params: &[f64],
    width: usize,
    height: usize,
    options: &BogusParamsOptions,
) -> bool {
    has_bogus_params(
        model_id,
        params,
        width,
        height,
        options.min_focal_length_ratio,
        options.max_focal_length_ratio,
        options.max_extra_param,
    )
}
