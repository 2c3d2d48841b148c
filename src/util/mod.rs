use crate::camera::{Camera, CameraModelError, CameraModelId};
use log::warn;
use nalgebra::Matrix2xX;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parses a comma-separated parameter list such as `"500, 320, 240, -0.1"`.
///
/// Whitespace around entries is ignored and empty entries are skipped, so an
/// empty string yields an empty vector.
pub fn parse_params(params_text: &str) -> Result<Vec<f64>, CameraModelError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(params_text.as_bytes());

    let mut params = Vec::new();
    for record in reader.records() {
        let record = record?;
        for field in record.iter().filter(|field| !field.is_empty()) {
            let value = field.parse::<f64>().map_err(|e| {
                CameraModelError::InvalidParams(format!("cannot parse '{field}': {e}"))
            })?;
            params.push(value);
        }
    }
    Ok(params)
}

/// Formats parameters as a `", "` separated list.
///
/// Values are printed in their shortest round-trip form, so
/// `parse_params(&format_params(p))` reproduces `p` exactly.
pub fn format_params(params: &[f64]) -> String {
    params
        .iter()
        .map(|param| param.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Checks user supplied camera parameters before a camera is created.
///
/// An empty parameter list is accepted: defaults are initialized later from
/// the image size.
pub fn verify_camera_params(model_name: &str, params_text: &str) -> bool {
    let model_id = match CameraModelId::from_name(model_name) {
        Ok(model_id) => model_id,
        Err(e) => {
            warn!("{e}");
            return false;
        }
    };

    let params = match parse_params(params_text) {
        Ok(params) => params,
        Err(e) => {
            warn!("{e}");
            return false;
        }
    };

    if !params.is_empty() && params.len() != model_id.num_params() {
        warn!(
            "Invalid number of camera parameters for {}: expected {} ({}), got {}",
            model_id,
            model_id.num_params(),
            model_id.params_info(),
            params.len()
        );
        return false;
    }

    true
}

/// Statistics of per-point reprojection errors in pixels.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProjectionError {
    pub rmse: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    pub median: f64,
}

impl fmt::Debug for ProjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Projection Error [ rmse: {}, min: {}, max: {}, mean: {}, stddev: {}, median: {} ]",
            self.rmse, self.min, self.max, self.mean, self.stddev, self.median
        )
    }
}

/// Projects normalized rays with `camera` and compares them to observed pixels.
///
/// `rays` holds normalized `(u, v)` coordinates column-wise, `pixels` the
/// matching observations.
pub fn compute_reprojection_error(
    camera: &Camera,
    rays: &Matrix2xX<f64>,
    pixels: &Matrix2xX<f64>,
) -> Result<ProjectionError, CameraModelError> {
    if rays.ncols() != pixels.ncols() {
        return Err(CameraModelError::InvalidParams(format!(
            "{} rays but {} pixels",
            rays.ncols(),
            pixels.ncols()
        )));
    }

    let errors: Vec<f64> = rays
        .column_iter()
        .zip(pixels.column_iter())
        .map(|(ray, pixel)| {
            let (x, y) = camera.world_to_image(ray[0], ray[1]);
            (x - pixel[0]).hypot(y - pixel[1])
        })
        .filter(|error| error.is_finite())
        .collect();

    if errors.is_empty() {
        return Err(CameraModelError::NumericalError(
            "no finite reprojection errors".to_string(),
        ));
    }

    let n = errors.len() as f64;
    let mean = errors.iter().sum::<f64>() / n;

    let variance: f64 = errors.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let sum_squared: f64 = errors.iter().map(|x| x.powi(2)).sum::<f64>();
    let rmse = (sum_squared / n).sqrt();

    let min = errors.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = errors.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

    let mut sorted_errors = errors;
    sorted_errors.sort_by(f64::total_cmp);
    let mid = sorted_errors.len() / 2;
    let median = if sorted_errors.len() % 2 == 0 {
        (sorted_errors[mid - 1] + sorted_errors[mid]) / 2.0
    } else {
        sorted_errors[mid]
    };

    Ok(ProjectionError {
        rmse,
        min,
        max,
        mean,
        stddev,
        median,
    })
}
