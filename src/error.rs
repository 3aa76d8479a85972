use std::collections::TryReserveError;

use thiserror::Error;

/// Rejected input to a pure builder (geometry, projection, scene assembly).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid parameters: {0}")]
pub struct InvalidParameters(pub String);

impl InvalidParameters {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

pub(crate) fn require_positive(name: &str, value: f32) -> Result<(), InvalidParameters> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(InvalidParameters(format!(
            "{name} must be finite and positive, got {value}"
        )))
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("render target size must be positive, got {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("pixel density must be finite and positive, got {0}")]
    InvalidDensity(f32),

    #[error("render target {width}x{height} exceeds the maximum dimension {max}")]
    ExceedsMaxDimension { width: u32, height: u32, max: u32 },

    #[error("could not allocate {what} for a {width}x{height} target")]
    Allocation {
        what: &'static str,
        width: u32,
        height: u32,
        #[source]
        source: TryReserveError,
    },

    #[error("unsupported multisample count {0}, expected 1, 2, 4 or 8")]
    UnsupportedSamples(u32),

    #[error("raster band height must be positive")]
    InvalidBandHeight,

    #[error("render target does not preserve its drawing buffer, readback is unavailable")]
    ReadbackUnavailable,

    #[error("no frame has been rendered at the current size")]
    NoFrame,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("frame readback failed: {0}")]
    Readback(#[source] PipelineError),

    #[error("pixel buffer holds {actual} bytes, a {width}x{height} RGBA8 image needs {expected}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("PNG encoding failed: {0}")]
    Png(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    InvalidParameters(#[from] InvalidParameters),

    #[error("an export is already in progress")]
    ConcurrentExportRejected,

    #[error("export controller is no longer running")]
    ControllerUnavailable,

    #[error("render target could not be prepared for export: {0}")]
    PipelineResizeFailure(#[source] PipelineError),

    #[error("exported frame could not be encoded: {0}")]
    EncodingError(#[from] EncodeError),

    /// The interactive render target could not be put back. `original` is the
    /// failure that preceded restoration, if any.
    #[error("render target could not be restored after export: {cause}")]
    RestoreFailed {
        #[source]
        cause: PipelineError,
        original: Option<Box<ExportError>>,
    },
}
