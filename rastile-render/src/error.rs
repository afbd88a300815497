//! Error handling for the render pipeline

use rastile_core::SchemaError;
use thiserror::Error;

/// Failures that can occur while resolving or drawing a single tile
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Composite error: {message}")]
    Composite { message: String },

    #[error("Schema mismatch: {0}")]
    Schema(#[from] SchemaError),
}

impl RenderError {
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode { message: message.into() }
    }

    pub fn composite<S: Into<String>>(message: S) -> Self {
        Self::Composite { message: message.into() }
    }
}

impl From<image::ImageError> for RenderError {
    fn from(err: image::ImageError) -> Self {
        Self::decode(err.to_string())
    }
}

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;
