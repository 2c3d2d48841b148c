//! SfM Camera Models Library
//!
//! Camera projection models for a structure-from-motion pipeline. Each model
//! converts between normalized camera coordinates and pixel coordinates:
//! - Pinhole models without distortion
//! - Radial distortion models
//! - OpenCV and full OpenCV (rational) models
//! - Equidistant fisheye models, including the thin-prism variant
//! - The FOV (division) model
//!
//! Inverse projections without a closed form go through a shared Newton solver
//! in [`geometry`]. The library also includes a reprojection factor for the
//! tiny-solver optimization framework, so models can be refined with exact
//! derivatives.

pub mod camera;
pub mod geometry;
pub mod optimization;
pub mod util;

// Re-export commonly used types
pub use camera::{
    registry, BogusParamsOptions, Camera, CameraModel, CameraModelError, CameraModelId,
    ModelDescriptor, INVALID_CAMERA_MODEL_ID, MODEL_DESCRIPTORS,
};

pub use geometry::{iterative_undistortion, iterative_undistortion_with, UndistortOptions};

pub use optimization::{refine_params, Optimizer, ReprojectionCost, ReprojectionFactor};

pub use util::{format_params, parse_params, verify_camera_params};
