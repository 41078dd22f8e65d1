use thiserror::Error;

use crate::core_modules::texture::TextureError;

/// Stream-level failures. Every variant is terminal: the pipeline never
/// retries internally, it surfaces the failure to the host and stops.
#[derive(Error, Debug, Clone)]
pub enum BrickError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to load brick texture: {0}")]
    TextureLoad(#[from] TextureError),

    #[error("frame received before the brick texture was loaded")]
    NotInitialized,

    #[error("invalid frame: {0}")]
    InvalidFrame(String),
}

pub type Result<T> = std::result::Result<T, BrickError>;
