//! Calibration files
//!
//! - gamma response: one line of at least 256 increasing values
//! - vignette: grey image, normalized so its brightest pixel is 1
//! - geometric: four-line camera file (model, input size, output mode, output size)

use std::path::{Path, PathBuf};

use contracts::GammaResponse;
use tracing::info;

use crate::error::{DatasetError, Result};

/// Load a gamma response file
pub fn load_gamma(path: &Path) -> Result<GammaResponse> {
    let content = read(path)?;
    let line = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| DatasetError::calibration(path, "gamma file is empty"))?;

    let values = line
        .split_whitespace()
        .map(str::parse::<f32>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| DatasetError::calibration(path, format!("invalid gamma value: {e}")))?;

    GammaResponse::from_values(values).map_err(|e| DatasetError::calibration(path, e.to_string()))
}

/// Per-pixel attenuation factors in (0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Vignette {
    pub width: u32,
    pub height: u32,
    factors: Vec<f32>,
}

impl Vignette {
    pub fn from_factors(width: u32, height: u32, factors: Vec<f32>) -> Option<Self> {
        (factors.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            factors,
        })
    }

    pub fn factor(&self, idx: usize) -> f32 {
        self.factors.get(idx).copied().unwrap_or(1.0)
    }
}

/// Load a vignette image
pub fn load_vignette(path: &Path) -> Result<Vignette> {
    let img = image::open(path)
        .map_err(|source| DatasetError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_luma32f();
    let (width, height) = img.dimensions();
    let raw = img.into_raw();

    let max = raw.iter().copied().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return Err(DatasetError::calibration(path, "vignette image is black"));
    }
    let factors = raw.into_iter().map(|v| v / max).collect();
    Vignette::from_factors(width, height, factors)
        .ok_or_else(|| DatasetError::calibration(path, "vignette buffer size mismatch"))
}

/// Photometric correction applied to decoded frames
#[derive(Debug, Clone)]
pub struct PhotometricUndistorter {
    gamma: GammaResponse,
    vignette: Option<Vignette>,
}

impl PhotometricUndistorter {
    pub fn new(gamma: GammaResponse, vignette: Option<Vignette>) -> Self {
        Self { gamma, vignette }
    }

    pub fn gamma(&self) -> &GammaResponse {
        &self.gamma
    }

    /// Map raw grey values to irradiance, then remove vignetting
    ///
    /// The vignette is skipped when its size differs from the frame.
    pub fn apply(&self, width: u32, height: u32, pixels: &mut [f32]) {
        for v in pixels.iter_mut() {
            *v = self.gamma.lookup(*v);
        }
        let Some(vignette) = &self.vignette else {
            return;
        };
        if vignette.width != width || vignette.height != height {
            return;
        }
        for (idx, v) in pixels.iter_mut().enumerate() {
            let factor = vignette.factor(idx);
            if factor > 0.0 {
                *v /= factor;
            }
        }
    }
}

/// Output rectification of the geometric calibration
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMode {
    Crop,
    Full,
    None,
    /// Explicit pinhole intrinsics for the output image
    Pinhole([f64; 4]),
}

/// Geometric camera calibration
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricCalibration {
    pub path: PathBuf,
    pub model: String,
    pub params: Vec<f64>,
    pub input_size: (u32, u32),
    pub output_mode: OutputMode,
    pub output_size: (u32, u32),
}

impl GeometricCalibration {
    /// fx, fy, cx, cy in pixels of the input image
    ///
    /// Values below 1 are relative to the image size.
    pub fn intrinsics(&self) -> [f64; 4] {
        let (w, h) = (self.input_size.0 as f64, self.input_size.1 as f64);
        let p = &self.params;
        if p[2] < 1.0 && p[3] < 1.0 {
            [p[0] * w, p[1] * h, p[2] * w - 0.5, p[3] * h - 0.5]
        } else {
            [p[0], p[1], p[2], p[3]]
        }
    }
}

/// Parse a geometric calibration file
pub fn load_geometric(path: &Path) -> Result<GeometricCalibration> {
    let content = read(path)?;
    parse_geometric(path, &content)
}

fn parse_geometric(path: &Path, content: &str) -> Result<GeometricCalibration> {
    let mut lines = content.lines().map(str::trim).filter(|l| !l.is_empty());
    let mut next_line = |what: &str| {
        lines
            .next()
            .ok_or_else(|| DatasetError::calibration(path, format!("missing {what} line")))
    };

    let (model, params) = parse_model_line(path, next_line("camera model")?)?;
    let input_size = parse_size(path, next_line("input size")?)?;
    let output_mode = parse_output_mode(path, next_line("output mode")?)?;
    let output_size = parse_size(path, next_line("output size")?)?;

    let calibration = GeometricCalibration {
        path: path.to_path_buf(),
        model,
        params,
        input_size,
        output_mode,
        output_size,
    };
    info!(
        path = %path.display(),
        model = %calibration.model,
        input = ?calibration.input_size,
        output = ?calibration.output_size,
        "loaded geometric calibration"
    );
    Ok(calibration)
}

fn parse_model_line(path: &Path, line: &str) -> Result<(String, Vec<f64>)> {
    let mut tokens = line.split_whitespace().peekable();
    let first_is_name = tokens.peek().is_some_and(|t| t.parse::<f64>().is_err());
    let named = if first_is_name {
        tokens.next().map(str::to_string)
    } else {
        None
    };

    let params = parse_floats(path, tokens)?;
    if params.len() < 4 {
        return Err(DatasetError::calibration(
            path,
            format!("expected at least 4 intrinsics, got {}", params.len()),
        ));
    }

    let model = named.unwrap_or_else(|| match params.len() {
        5 if params[4] == 0.0 => "Pinhole".to_string(),
        5 => "FOV".to_string(),
        8 => "RadTan".to_string(),
        _ => "Pinhole".to_string(),
    });
    Ok((model, params))
}

fn parse_size(path: &Path, line: &str) -> Result<(u32, u32)> {
    let values: Vec<u32> = line
        .split_whitespace()
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| DatasetError::calibration(path, format!("invalid image size '{line}': {e}")))?;
    match values.as_slice() {
        [w, h] if *w > 0 && *h > 0 => Ok((*w, *h)),
        _ => Err(DatasetError::calibration(
            path,
            format!("invalid image size '{line}'"),
        )),
    }
}

fn parse_output_mode(path: &Path, line: &str) -> Result<OutputMode> {
    match line.to_lowercase().as_str() {
        "crop" => return Ok(OutputMode::Crop),
        "full" => return Ok(OutputMode::Full),
        "none" => return Ok(OutputMode::None),
        _ => {}
    }
    let values = parse_floats(path, line.split_whitespace())?;
    match values.as_slice() {
        [fx, fy, cx, cy, ..] => Ok(OutputMode::Pinhole([*fx, *fy, *cx, *cy])),
        _ => Err(DatasetError::calibration(
            path,
            format!("invalid output mode '{line}'"),
        )),
    }
}

fn parse_floats<'a>(path: &Path, tokens: impl Iterator<Item = &'a str>) -> Result<Vec<f64>> {
    tokens
        .map(str::parse::<f64>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| DatasetError::calibration(path, format!("invalid number: {e}")))
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| DatasetError::Read {
        path: path.to_path_buf(),
        source,
    })
}
