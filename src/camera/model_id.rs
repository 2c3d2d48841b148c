//! Model identifiers and the static descriptor table.
//!
//! Every supported camera model has exactly one [`ModelDescriptor`] in
//! [`MODEL_DESCRIPTORS`], stored at the position of its integer id. The table is
//! the single source of truth for the id/name bijection, the parameter layout and
//! the dispatch performed by [`CameraModelId`].

use std::fmt;
use std::str::FromStr;

use nalgebra::RealField;
use serde::{Deserialize, Serialize};

use crate::camera::fisheye::{
    OpenCvFisheye, RadialFisheye, SimpleRadialFisheye, ThinPrismFisheye,
};
use crate::camera::fov::Fov;
use crate::camera::opencv::{FullOpenCv, OpenCv};
use crate::camera::pinhole::{Pinhole, SimplePinhole};
use crate::camera::radial::{Radial, SimpleRadial};
use crate::camera::{CameraModel, CameraModelError};

/// Id returned by the integer-keyed registry surface for unknown models.
pub const INVALID_CAMERA_MODEL_ID: i32 = -1;

/// Closed set of supported camera models.
///
/// The discriminant is the stable integer id used when cameras are persisted,
/// so variants must never be reordered or reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
#[repr(i32)]
pub enum CameraModelId {
    SimplePinhole = 0,
    Pinhole = 1,
    SimpleRadial = 2,
    Radial = 3,
    OpenCv = 4,
    OpenCvFisheye = 5,
    FullOpenCv = 6,
    Fov = 7,
    SimpleRadialFisheye = 8,
    RadialFisheye = 9,
    ThinPrismFisheye = 10,
}

/// Immutable metadata describing the parameter layout of one camera model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub model_id: CameraModelId,
    /// Canonical uppercase name, e.g. `"OPENCV"`.
    pub name: &'static str,
    pub num_params: usize,
    /// Parameter names in storage order.
    pub params_info: &'static [&'static str],
    pub focal_length_idxs: &'static [usize],
    pub principal_point_idxs: [usize; 2],
    /// Distortion parameter indices; always the contiguous tail of the vector.
    pub extra_params_idxs: &'static [usize],
}

impl ModelDescriptor {
    /// Index of the first distortion parameter, equal to `num_params` for
    /// models without distortion.
    pub fn extra_params_offset(&self) -> usize {
        self.extra_params_idxs
            .first()
            .copied()
            .unwrap_or(self.num_params)
    }
}

const SINGLE_FOCAL: &[usize] = &[0];
const DOUBLE_FOCAL: &[usize] = &[0, 1];
const SINGLE_FOCAL_PP: [usize; 2] = [1, 2];
const DOUBLE_FOCAL_PP: [usize; 2] = [2, 3];

/// Descriptor table, indexed by model id.
pub static MODEL_DESCRIPTORS: [ModelDescriptor; 11] = [
    ModelDescriptor {
        model_id: CameraModelId::SimplePinhole,
        name: "SIMPLE_PINHOLE",
        num_params: 3,
        params_info: &["f", "cx", "cy"],
        focal_length_idxs: SINGLE_FOCAL,
        principal_point_idxs: SINGLE_FOCAL_PP,
        extra_params_idxs: &[],
    },
    ModelDescriptor {
        model_id: CameraModelId::Pinhole,
        name: "PINHOLE",
        num_params: 4,
        params_info: &["fx", "fy", "cx", "cy"],
        focal_length_idxs: DOUBLE_FOCAL,
        principal_point_idxs: DOUBLE_FOCAL_PP,
        extra_params_idxs: &[],
    },
    ModelDescriptor {
        model_id: CameraModelId::SimpleRadial,
        name: "SIMPLE_RADIAL",
        num_params: 4,
        params_info: &["f", "cx", "cy", "k"],
        focal_length_idxs: SINGLE_FOCAL,
        principal_point_idxs: SINGLE_FOCAL_PP,
        extra_params_idxs: &[3],
    },
    ModelDescriptor {
        model_id: CameraModelId::Radial,
        name: "RADIAL",
        num_params: 5,
        params_info: &["f", "cx", "cy", "k1", "k2"],
        focal_length_idxs: SINGLE_FOCAL,
        principal_point_idxs: SINGLE_FOCAL_PP,
        extra_params_idxs: &[3, 4],
    },
    ModelDescriptor {
        model_id: CameraModelId::OpenCv,
        name: "OPENCV",
        num_params: 8,
        params_info: &["fx", "fy", "cx", "cy", "k1", "k2", "p1", "p2"],
        focal_length_idxs: DOUBLE_FOCAL,
        principal_point_idxs: DOUBLE_FOCAL_PP,
        extra_params_idxs: &[4, 5, 6, 7],
    },
    ModelDescriptor {
        model_id: CameraModelId::OpenCvFisheye,
        name: "OPENCV_FISHEYE",
        num_params: 8,
        params_info: &["fx", "fy", "cx", "cy", "k1", "k2", "k3", "k4"],
        focal_length_idxs: DOUBLE_FOCAL,
        principal_point_idxs: DOUBLE_FOCAL_PP,
        extra_params_idxs: &[4, 5, 6, 7],
    },
    ModelDescriptor {
        model_id: CameraModelId::FullOpenCv,
        name: "FULL_OPENCV",
        num_params: 12,
        params_info: &[
            "fx", "fy", "cx", "cy", "k1", "k2", "p1", "p2", "k3", "k4", "k5", "k6",
        ],
        focal_length_idxs: DOUBLE_FOCAL,
        principal_point_idxs: DOUBLE_FOCAL_PP,
        extra_params_idxs: &[4, 5, 6, 7, 8, 9, 10, 11],
    },
    ModelDescriptor {
        model_id: CameraModelId::Fov,
        name: "FOV",
        num_params: 5,
        params_info: &["fx", "fy", "cx", "cy", "omega"],
        focal_length_idxs: DOUBLE_FOCAL,
        principal_point_idxs: DOUBLE_FOCAL_PP,
        extra_params_idxs: &[4],
    },
    ModelDescriptor {
        model_id: CameraModelId::SimpleRadialFisheye,
        name: "SIMPLE_RADIAL_FISHEYE",
        num_params: 4,
        params_info: &["f", "cx", "cy", "k"],
        focal_length_idxs: SINGLE_FOCAL,
        principal_point_idxs: SINGLE_FOCAL_PP,
        extra_params_idxs: &[3],
    },
    ModelDescriptor {
        model_id: CameraModelId::RadialFisheye,
        name: "RADIAL_FISHEYE",
        num_params: 5,
        params_info: &["f", "cx", "cy", "k1", "k2"],
        focal_length_idxs: SINGLE_FOCAL,
        principal_point_idxs: SINGLE_FOCAL_PP,
        extra_params_idxs: &[3, 4],
    },
    ModelDescriptor {
        model_id: CameraModelId::ThinPrismFisheye,
        name: "THIN_PRISM_FISHEYE",
        num_params: 12,
        params_info: &[
            "fx", "fy", "cx", "cy", "k1", "k2", "p1", "p2", "k3", "k4", "sx1", "sy1",
        ],
        focal_length_idxs: DOUBLE_FOCAL,
        principal_point_idxs: DOUBLE_FOCAL_PP,
        extra_params_idxs: &[4, 5, 6, 7, 8, 9, 10, 11],
    },
];

impl CameraModelId {
    /// All models in id order.
    pub const ALL: [CameraModelId; 11] = [
        CameraModelId::SimplePinhole,
        CameraModelId::Pinhole,
        CameraModelId::SimpleRadial,
        CameraModelId::Radial,
        CameraModelId::OpenCv,
        CameraModelId::OpenCvFisheye,
        CameraModelId::FullOpenCv,
        CameraModelId::Fov,
        CameraModelId::SimpleRadialFisheye,
        CameraModelId::RadialFisheye,
        CameraModelId::ThinPrismFisheye,
    ];

    /// Looks up a model by its integer id.
    pub fn from_id(model_id: i32) -> Result<Self, CameraModelError> {
        usize::try_from(model_id)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or_else(|| CameraModelError::UnknownModel(model_id.to_string()))
    }

    /// Looks up a model by its canonical name. Matching is case-sensitive.
    pub fn from_name(model_name: &str) -> Result<Self, CameraModelError> {
        MODEL_DESCRIPTORS
            .iter()
            .find(|descriptor| descriptor.name == model_name)
            .map(|descriptor| descriptor.model_id)
            .ok_or_else(|| CameraModelError::UnknownModel(model_name.to_string()))
    }

    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn descriptor(self) -> &'static ModelDescriptor {
        &MODEL_DESCRIPTORS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn num_params(self) -> usize {
        self.descriptor().num_params
    }

    /// Human readable parameter order, e.g. `"f, cx, cy, k"`.
    pub fn params_info(self) -> String {
        self.descriptor().params_info.join(", ")
    }

    pub fn focal_length_idxs(self) -> &'static [usize] {
        self.descriptor().focal_length_idxs
    }

    pub fn principal_point_idxs(self) -> &'static [usize] {
        &self.descriptor().principal_point_idxs
    }

    pub fn extra_params_idxs(self) -> &'static [usize] {
        self.descriptor().extra_params_idxs
    }

    /// Default parameter vector for a camera with the given focal length and
    /// image size. See [`CameraModel::initialize_params`].
    pub fn initialize_params(self, focal_length: f64, width: usize, height: usize) -> Vec<f64> {
        match self {
            CameraModelId::SimplePinhole => {
                SimplePinhole::initialize_params(focal_length, width, height)
            }
            CameraModelId::Pinhole => Pinhole::initialize_params(focal_length, width, height),
            CameraModelId::SimpleRadial => {
                SimpleRadial::initialize_params(focal_length, width, height)
            }
            CameraModelId::Radial => Radial::initialize_params(focal_length, width, height),
            CameraModelId::OpenCv => OpenCv::initialize_params(focal_length, width, height),
            CameraModelId::OpenCvFisheye => {
                OpenCvFisheye::initialize_params(focal_length, width, height)
            }
            CameraModelId::FullOpenCv => FullOpenCv::initialize_params(focal_length, width, height),
            CameraModelId::Fov => Fov::initialize_params(focal_length, width, height),
            CameraModelId::SimpleRadialFisheye => {
                SimpleRadialFisheye::initialize_params(focal_length, width, height)
            }
            CameraModelId::RadialFisheye => {
                RadialFisheye::initialize_params(focal_length, width, height)
            }
            CameraModelId::ThinPrismFisheye => {
                ThinPrismFisheye::initialize_params(focal_length, width, height)
            }
        }
    }

    /// Projects normalized camera coordinates `(u, v, 1)` to pixel coordinates.
    ///
    /// `params` must hold exactly [`Self::num_params`] values; shorter slices panic
    /// on indexing. Generic over the scalar so the same code path serves plain
    /// `f64` evaluation and dual numbers used for automatic differentiation.
    pub fn world_to_image<T: RealField>(self, params: &[T], u: T, v: T) -> (T, T) {
        match self {
            CameraModelId::SimplePinhole => SimplePinhole::world_to_image(params, u, v),
            CameraModelId::Pinhole => Pinhole::world_to_image(params, u, v),
            CameraModelId::SimpleRadial => SimpleRadial::world_to_image(params, u, v),
            CameraModelId::Radial => Radial::world_to_image(params, u, v),
            CameraModelId::OpenCv => OpenCv::world_to_image(params, u, v),
            CameraModelId::OpenCvFisheye => OpenCvFisheye::world_to_image(params, u, v),
            CameraModelId::FullOpenCv => FullOpenCv::world_to_image(params, u, v),
            CameraModelId::Fov => Fov::world_to_image(params, u, v),
            CameraModelId::SimpleRadialFisheye => {
                SimpleRadialFisheye::world_to_image(params, u, v)
            }
            CameraModelId::RadialFisheye => RadialFisheye::world_to_image(params, u, v),
            CameraModelId::ThinPrismFisheye => ThinPrismFisheye::world_to_image(params, u, v),
        }
    }

    /// Lifts pixel coordinates to normalized camera coordinates `(u, v, 1)`.
    pub fn image_to_world<T: RealField>(self, params: &[T], x: T, y: T) -> (T, T) {
        match self {
            CameraModelId::SimplePinhole => SimplePinhole::image_to_world(params, x, y),
            CameraModelId::Pinhole => Pinhole::image_to_world(params, x, y),
            CameraModelId::SimpleRadial => SimpleRadial::image_to_world(params, x, y),
            CameraModelId::Radial => Radial::image_to_world(params, x, y),
            CameraModelId::OpenCv => OpenCv::image_to_world(params, x, y),
            CameraModelId::OpenCvFisheye => OpenCvFisheye::image_to_world(params, x, y),
            CameraModelId::FullOpenCv => FullOpenCv::image_to_world(params, x, y),
            CameraModelId::Fov => Fov::image_to_world(params, x, y),
            CameraModelId::SimpleRadialFisheye => {
                SimpleRadialFisheye::image_to_world(params, x, y)
            }
            CameraModelId::RadialFisheye => RadialFisheye::image_to_world(params, x, y),
            CameraModelId::ThinPrismFisheye => ThinPrismFisheye::image_to_world(params, x, y),
        }
    }

    /// Distortion offset `(du, dv)` of the model at normalized coordinates.
    ///
    /// `extra_params` is the distortion tail of the parameter vector only.
    pub fn distortion<T: RealField>(self, extra_params: &[T], u: T, v: T) -> (T, T) {
        match self {
            CameraModelId::SimplePinhole => SimplePinhole::distortion(extra_params, u, v),
            CameraModelId::Pinhole => Pinhole::distortion(extra_params, u, v),
            CameraModelId::SimpleRadial => SimpleRadial::distortion(extra_params, u, v),
            CameraModelId::Radial => Radial::distortion(extra_params, u, v),
            CameraModelId::OpenCv => OpenCv::distortion(extra_params, u, v),
            CameraModelId::OpenCvFisheye => OpenCvFisheye::distortion(extra_params, u, v),
            CameraModelId::FullOpenCv => FullOpenCv::distortion(extra_params, u, v),
            CameraModelId::Fov => Fov::distortion(extra_params, u, v),
            CameraModelId::SimpleRadialFisheye => {
                SimpleRadialFisheye::distortion(extra_params, u, v)
            }
            CameraModelId::RadialFisheye => RadialFisheye::distortion(extra_params, u, v),
            CameraModelId::ThinPrismFisheye => ThinPrismFisheye::distortion(extra_params, u, v),
        }
    }

    /// Converts a pixel threshold into normalized units by dividing by the mean
    /// focal length.
    pub fn image_to_world_threshold<T: RealField>(self, params: &[T], threshold: T) -> T {
        let focal_length_idxs = self.focal_length_idxs();
        let mut mean_focal_length = T::zero();
        for &idx in focal_length_idxs {
            mean_focal_length += params[idx].clone();
        }
        mean_focal_length /= nalgebra::convert::<f64, T>(focal_length_idxs.len() as f64);
        threshold / mean_focal_length
    }
}

impl fmt::Display for CameraModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CameraModelId {
    type Err = CameraModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl TryFrom<i32> for CameraModelId {
    type Error = CameraModelError;

    fn try_from(model_id: i32) -> Result<Self, Self::Error> {
        Self::from_id(model_id)
    }
}

impl TryFrom<String> for CameraModelId {
    type Error = CameraModelError;

    fn try_from(model_name: String) -> Result<Self, Self::Error> {
        Self::from_name(&model_name)
    }
}

impl From<CameraModelId> for i32 {
    fn from(model_id: CameraModelId) -> Self {
        model_id.id()
    }
}

impl From<CameraModelId> for &'static str {
    fn from(model_id: CameraModelId) -> Self {
        model_id.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_table_is_indexed_by_id() {
        for (idx, descriptor) in MODEL_DESCRIPTORS.iter().enumerate() {
            assert_eq!(descriptor.model_id.id() as usize, idx);
            assert_eq!(descriptor.params_info.len(), descriptor.num_params);
        }
    }

    #[test]
    fn test_index_sets_partition_parameter_vector() {
        for model in CameraModelId::ALL {
            let descriptor = model.descriptor();
            let mut seen = vec![false; descriptor.num_params];
            let all_idxs = descriptor
                .focal_length_idxs
                .iter()
                .chain(descriptor.principal_point_idxs.iter())
                .chain(descriptor.extra_params_idxs.iter());
            for &idx in all_idxs {
                assert!(idx < descriptor.num_params, "{}: index {} out of range", model, idx);
                assert!(!seen[idx], "{}: index {} appears twice", model, idx);
                seen[idx] = true;
            }
            assert!(seen.iter().all(|&s| s), "{}: index sets do not cover vector", model);
        }
    }

    #[test]
    fn test_extra_params_are_contiguous_tail() {
        for model in CameraModelId::ALL {
            let descriptor = model.descriptor();
            let offset = descriptor.extra_params_offset();
            let expected: Vec<usize> = (offset..descriptor.num_params).collect();
            assert_eq!(descriptor.extra_params_idxs, expected.as_slice());
        }
    }

    #[test]
    fn test_name_and_id_lookups() {
        assert_eq!(CameraModelId::from_id(4).unwrap(), CameraModelId::OpenCv);
        assert_eq!(
            "THIN_PRISM_FISHEYE".parse::<CameraModelId>().unwrap(),
            CameraModelId::ThinPrismFisheye
        );
        assert!(CameraModelId::from_id(11).is_err());
        assert!(CameraModelId::from_id(INVALID_CAMERA_MODEL_ID).is_err());
        assert!(CameraModelId::from_name("opencv").is_err());
        assert_eq!(CameraModelId::Fov.params_info(), "fx, fy, cx, cy, omega");
    }

    #[test]
    fn test_serde_uses_canonical_name() {
        let json = serde_json::to_string(&CameraModelId::RadialFisheye).unwrap();
        assert_eq!(json, "\"RADIAL_FISHEYE\"");
        let parsed: CameraModelId = serde_json::from_str("\"FULL_OPENCV\"").unwrap();
        assert_eq!(parsed, CameraModelId::FullOpenCv);
        assert!(serde_json::from_str::<CameraModelId>("\"BOGUS\"").is_err());
    }

    #[test]
    fn test_image_to_world_threshold_uses_mean_focal_length() {
        let params = [100.0, 300.0, 50.0, 50.0];
        let threshold = CameraModelId::Pinhole.image_to_world_threshold(&params, 4.0);
        assert_eq!(threshold, 4.0 / 200.0);
        let params = [250.0, 50.0, 50.0, 0.1];
        let threshold = CameraModelId::SimpleRadial.image_to_world_threshold(&params, 5.0);
        assert_eq!(threshold, 0.02);
    }
}
