use crate::config::ConfigError;

/// The backend lost the textures/buffers it was holding (device reset,
/// asset dropped underneath us).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("graphics context lost: {reason}")]
pub struct ContextLostError {
    pub reason: String,
}

impl ContextLostError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LiquidError {
    #[error("invalid liquid config: {0}")]
    Config(#[from] ConfigError),
    /// Reallocation after a context loss failed as well; the surface has stopped.
    #[error("liquid surface failed after reallocation: {0}")]
    Fatal(ContextLostError),
}

pub type LiquidResult<T> = Result<T, LiquidError>;
