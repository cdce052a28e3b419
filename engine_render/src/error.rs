//! Error types for asset loading, offscreen rendering and PNG export

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Asset lookup and loading failures
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("{0} is not a prefab or model and cannot be instantiated")]
    NotInstantiable(String),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("failed to parse prefab {path}: {source}")]
    Prefab {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl AssetError {
    pub fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        AssetError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Offscreen render failures
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid render surface size {width}x{height}")]
    InvalidSurface { width: u32, height: u32 },

    #[error("entity is not a camera")]
    MissingCamera,

    #[error("pixel readback failed: {0}")]
    Readback(String),
}

/// PNG encode/write failures. Encoding and writing are reported separately.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("image has no pixels")]
    Empty,

    #[error("failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors surfaced by the preview tools
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("no object selected")]
    NoObjectSelected,

    #[error("invalid render configuration: {0}")]
    InvalidConfig(String),

    #[error("no preview or thumbnail available for {0}")]
    PreviewUnavailable(String),

    #[error("no preview has been generated")]
    NoPreview,

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl PreviewError {
    /// Invalid or unloadable sources are errors; everything else is a warning
    pub fn is_severe(&self) -> bool {
        matches!(
            self,
            PreviewError::Asset(
                AssetError::NotInstantiable(_)
                    | AssetError::Load { .. }
                    | AssetError::Prefab { .. }
                    | AssetError::UnsupportedFormat(_)
            )
        )
    }
}

/// Result type alias for preview operations
pub type PreviewResult<T> = Result<T, PreviewError>;
