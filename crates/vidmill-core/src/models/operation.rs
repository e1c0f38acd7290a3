//! The media operation catalog.
//!
//! The six supported transformations form a closed set. Each variant carries
//! its validated parameters, so a descriptor for an operation that requires
//! parameters cannot exist unless every one of them passed validation.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Error raised while resolving an operation request into a descriptor.
///
/// `MissingParameter` / `InvalidParameter` name the first offending parameter
/// in declaration order (width, height / aspect_ratio / start_time, duration).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },
}

impl From<OperationError> for AppError {
    fn from(err: OperationError) -> Self {
        match err {
            OperationError::UnsupportedOperation(name) => AppError::UnsupportedOperation(name),
            OperationError::MissingParameter(name) => AppError::MissingParameter(name.to_string()),
            OperationError::InvalidParameter { name, reason } => AppError::InvalidParameter {
                name: name.to_string(),
                reason,
            },
        }
    }
}

/// Raw, unvalidated operation parameters as they arrive from the transport
/// layer. All fields are optional; which ones are required depends on the
/// requested operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOperationParams {
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub aspect_ratio: Option<String>,
    pub start_time: Option<f64>,
    pub duration: Option<f64>,
}

impl RawOperationParams {
    /// Parse a single named parameter from its textual form (e.g. a multipart
    /// text field). Unknown names are ignored so transports can feed every
    /// form field through without pre-filtering.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), OperationError> {
        match name {
            "width" => self.width = Some(parse_int("width", value)?),
            "height" => self.height = Some(parse_int("height", value)?),
            "aspect_ratio" => self.aspect_ratio = Some(value.to_string()),
            "start_time" => self.start_time = Some(parse_float("start_time", value)?),
            "duration" => self.duration = Some(parse_float("duration", value)?),
            _ => {}
        }
        Ok(())
    }
}

fn parse_int(name: &'static str, value: &str) -> Result<i64, OperationError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| OperationError::InvalidParameter {
            name,
            reason: format!("must be an integer, got '{}'", value),
        })
}

fn parse_float(name: &'static str, value: &str) -> Result<f64, OperationError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| OperationError::InvalidParameter {
            name,
            reason: format!("must be a number, got '{}'", value),
        })
}

/// A validated, immutable transformation descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    Compress,
    ChangeResolution { width: u32, height: u32 },
    ChangeAspectRatio { aspect_ratio: String },
    ExtractAudio,
    CreateGif { start_time: f64, duration: f64 },
    CreateWebm { start_time: f64, duration: f64 },
}

impl Operation {
    /// Resolve an operation name plus raw parameters into a descriptor.
    ///
    /// An absent name defaults to `compress`. Parameters are checked in a
    /// deterministic order and the first offending one is reported.
    pub fn resolve(
        name: Option<&str>,
        params: &RawOperationParams,
    ) -> Result<Operation, OperationError> {
        let name = match name {
            Some(n) if !n.trim().is_empty() => n.trim(),
            _ => "compress",
        };

        match name {
            "compress" => Ok(Operation::Compress),
            "extract_audio" => Ok(Operation::ExtractAudio),
            "change_resolution" => {
                let width = require_dimension("width", params.width)?;
                let height = require_dimension("height", params.height)?;
                Ok(Operation::ChangeResolution { width, height })
            }
            "change_aspect_ratio" => {
                let aspect_ratio = params
                    .aspect_ratio
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or(OperationError::MissingParameter("aspect_ratio"))?;
                Ok(Operation::ChangeAspectRatio {
                    aspect_ratio: aspect_ratio.to_string(),
                })
            }
            "create_gif" => {
                let (start_time, duration) = require_clip_window(params)?;
                Ok(Operation::CreateGif {
                    start_time,
                    duration,
                })
            }
            "create_webm" => {
                let (start_time, duration) = require_clip_window(params)?;
                Ok(Operation::CreateWebm {
                    start_time,
                    duration,
                })
            }
            other => Err(OperationError::UnsupportedOperation(other.to_string())),
        }
    }

    /// Wire name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Compress => "compress",
            Operation::ChangeResolution { .. } => "change_resolution",
            Operation::ChangeAspectRatio { .. } => "change_aspect_ratio",
            Operation::ExtractAudio => "extract_audio",
            Operation::CreateGif { .. } => "create_gif",
            Operation::CreateWebm { .. } => "create_webm",
        }
    }

    /// File extension of the output artifact, dot included.
    pub fn output_extension(&self) -> &'static str {
        match self {
            Operation::ExtractAudio => ".mp3",
            Operation::CreateGif { .. } => ".gif",
            Operation::CreateWebm { .. } => ".webm",
            _ => ".mp4",
        }
    }

    /// MIME type matching `output_extension`.
    pub fn output_content_type(&self) -> &'static str {
        match self {
            Operation::ExtractAudio => "audio/mpeg",
            Operation::CreateGif { .. } => "image/gif",
            Operation::CreateWebm { .. } => "video/webm",
            _ => "video/mp4",
        }
    }
}

fn require_dimension(name: &'static str, value: Option<i64>) -> Result<u32, OperationError> {
    let value = value.ok_or(OperationError::MissingParameter(name))?;
    if value <= 0 {
        return Err(OperationError::InvalidParameter {
            name,
            reason: format!("must be a positive integer, got {}", value),
        });
    }
    u32::try_from(value).map_err(|_| OperationError::InvalidParameter {
        name,
        reason: format!("{} is out of range", value),
    })
}

fn require_clip_window(params: &RawOperationParams) -> Result<(f64, f64), OperationError> {
    let start_time = params
        .start_time
        .ok_or(OperationError::MissingParameter("start_time"))?;
    if !start_time.is_finite() || start_time < 0.0 {
        return Err(OperationError::InvalidParameter {
            name: "start_time",
            reason: format!("must be >= 0, got {}", start_time),
        });
    }
    let duration = params
        .duration
        .ok_or(OperationError::MissingParameter("duration"))?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(OperationError::InvalidParameter {
            name: "duration",
            reason: format!("must be > 0, got {}", duration),
        });
    }
    Ok((start_time, duration))
}
