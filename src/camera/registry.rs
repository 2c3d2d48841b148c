//! Integer id and name keyed registry surface.
//!
//! Collaborators that persist cameras keep the raw model id or name around.
//! These functions resolve it against the descriptor table and dispatch to the
//! model. Every lookup failure is reported as
//! [`CameraModelError::UnknownModel`].

use crate::camera::validation;
use crate::camera::{CameraModelError, CameraModelId};

/// Name lookup, case-sensitive.
pub fn exists_camera_model_with_name(model_name: &str) -> bool {
    CameraModelId::from_name(model_name).is_ok()
}

pub fn exists_camera_model_with_id(model_id: i32) -> bool {
    CameraModelId::from_id(model_id).is_ok()
}

/// Maps a canonical name to its id.
///
/// Callers that need the sentinel form can use
/// `.unwrap_or(INVALID_CAMERA_MODEL_ID)`.
///
/// [`INVALID_CAMERA_MODEL_ID`]: crate::camera::INVALID_CAMERA_MODEL_ID
pub fn camera_model_name_to_id(model_name: &str) -> Result<i32, CameraModelError> {
    CameraModelId::from_name(model_name).map(CameraModelId::id)
}

pub fn camera_model_id_to_name(model_id: i32) -> Result<&'static str, CameraModelError> {
    CameraModelId::from_id(model_id).map(CameraModelId::name)
}

pub fn camera_model_num_params(model_id: i32) -> Result<usize, CameraModelError> {
    CameraModelId::from_id(model_id).map(CameraModelId::num_params)
}

pub fn camera_model_params_info(model_id: i32) -> Result<String, CameraModelError> {
    CameraModelId::from_id(model_id).map(CameraModelId::params_info)
}

pub fn camera_model_focal_length_idxs(model_id: i32) -> Result<&'static [usize], CameraModelError> {
    CameraModelId::from_id(model_id).map(CameraModelId::focal_length_idxs)
}

pub fn camera_model_principal_point_idxs(
    model_id: i32,
) -> Result<&'static [usize], CameraModelError> {
    CameraModelId::from_id(model_id).map(CameraModelId::principal_point_idxs)
}

pub fn camera_model_extra_params_idxs(model_id: i32) -> Result<&'static [usize], CameraModelError> {
    CameraModelId::from_id(model_id).map(CameraModelId::extra_params_idxs)
}

pub fn camera_model_initialize_params(
    model_id: i32,
    focal_length: f64,
    width: usize,
    height: usize,
) -> Result<Vec<f64>, CameraModelError> {
    let model = CameraModelId::from_id(model_id)?;
    Ok(model.initialize_params(focal_length, width, height))
}

/// `Ok(false)` for a registered model with the wrong number of parameters.
pub fn camera_model_verify_params(model_id: i32, params: &[f64]) -> Result<bool, CameraModelError> {
    let model = CameraModelId::from_id(model_id)?;
    Ok(validation::verify_params(model, params))
}

pub fn camera_model_has_bogus_params(
    model_id: i32,
    params: &[f64],
    width: usize,
    height: usize,
    min_focal_length_ratio: f64,
    max_focal_length_ratio: f64,
    max_extra_param: f64,
) -> Result<bool, CameraModelError> {
    let model = checked_model(model_id, params)?;
    Ok(validation::has_bogus_params(
        model,
        params,
        width,
        height,
        min_focal_length_ratio,
        max_focal_length_ratio,
        max_extra_param,
    ))
}

pub fn camera_model_world_to_image(
    model_id: i32,
    params: &[f64],
    u: f64,
    v: f64,
) -> Result<(f64, f64), CameraModelError> {
    let model = checked_model(model_id, params)?;
    Ok(model.world_to_image(params, u, v))
}

pub fn camera_model_image_to_world(
    model_id: i32,
    params: &[f64],
    x: f64,
    y: f64,
) -> Result<(f64, f64), CameraModelError> {
    let model = checked_model(model_id, params)?;
    Ok(model.image_to_world(params, x, y))
}

pub fn camera_model_image_to_world_threshold(
    model_id: i32,
    params: &[f64],
    threshold: f64,
) -> Result<f64, CameraModelError> {
    let model = checked_model(model_id, params)?;
    Ok(model.image_to_world_threshold(params, threshold))
}

/// Resolves the id and rejects parameter vectors of the wrong length, which
/// would otherwise panic on indexing.
fn checked_model(model_id: i32, params: &[f64]) -> Result<CameraModelId, CameraModelError> {
    let model = CameraModelId::from_id(model_id)?;
    if !validation::verify_params(model, params) {
        return Err(CameraModelError::ParamCountMismatch {
            model,
            expected: model.num_params(),
            actual: params.len(),
        });
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::INVALID_CAMERA_MODEL_ID;
    use approx::assert_relative_eq;

    #[test]
    fn test_existence_checks() {
        assert!(exists_camera_model_with_name("SIMPLE_RADIAL_FISHEYE"));
        assert!(!exists_camera_model_with_name("BOGUS"));
        assert!(!exists_camera_model_with_name("pinhole"));
        assert!((0..=10).all(exists_camera_model_with_id));
        assert!(!exists_camera_model_with_id(11));
        assert!(!exists_camera_model_with_id(INVALID_CAMERA_MODEL_ID));
    }

    #[test]
    fn test_name_id_bijection() {
        for id in 0..=10 {
            let name = camera_model_id_to_name(id).unwrap();
            assert_eq!(camera_model_name_to_id(name).unwrap(), id);
        }
        assert_eq!(
            camera_model_name_to_id("BOGUS").unwrap_or(INVALID_CAMERA_MODEL_ID),
            INVALID_CAMERA_MODEL_ID
        );
        assert_eq!(
            camera_model_id_to_name(42),
            Err(CameraModelError::UnknownModel("42".to_string()))
        );
    }

    #[test]
    fn test_metadata_queries() {
        assert_eq!(camera_model_num_params(6).unwrap(), 12);
        assert_eq!(camera_model_params_info(2).unwrap(), "f, cx, cy, k");
        assert_eq!(camera_model_focal_length_idxs(1).unwrap(), &[0, 1]);
        assert_eq!(camera_model_principal_point_idxs(0).unwrap(), &[1, 2]);
        assert_eq!(camera_model_extra_params_idxs(7).unwrap(), &[4]);
        assert!(camera_model_extra_params_idxs(0).unwrap().is_empty());
        assert!(camera_model_num_params(-3).is_err());
    }

    #[test]
    fn test_initialize_and_verify() {
        let params = camera_model_initialize_params(5, 400.0, 1024, 768).unwrap();
        assert_eq!(params, vec![400.0, 400.0, 512.0, 384.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(camera_model_verify_params(5, &params).unwrap());
        assert!(!camera_model_verify_params(5, &params[..7]).unwrap());
        assert!(camera_model_verify_params(99, &params).is_err());
    }

    #[test]
    fn test_transforms_reject_short_parameter_vectors() {
        let result = camera_model_world_to_image(4, &[500.0, 500.0, 320.0, 240.0], 0.1, 0.1);
        assert_eq!(
            result,
            Err(CameraModelError::ParamCountMismatch {
                model: CameraModelId::OpenCv,
                expected: 8,
                actual: 4,
            })
        );
    }

    #[test]
    fn test_transform_dispatch() {
        let params = [500.0, 320.0, 240.0, -0.1];
        let (x, y) = camera_model_world_to_image(2, &params, 0.1, 0.2).unwrap();
        let (u, v) = camera_model_image_to_world(2, &params, x, y).unwrap();
        assert_relative_eq!(u, 0.1, epsilon = 1e-10);
        assert_relative_eq!(v, 0.2, epsilon = 1e-10);
        assert_eq!(camera_model_image_to_world_threshold(2, &params, 5.0).unwrap(), 0.01);
        assert!(!camera_model_has_bogus_params(2, &params, 640, 480, 0.1, 10.0, 1.0).unwrap());
        assert!(camera_model_has_bogus_params(2, &params, 640, 480, 0.1, 0.5, 1.0).unwrap());
    }
}
