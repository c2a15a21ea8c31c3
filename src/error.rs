use thiserror::Error;

/// Everything that can stop an effect from running.
///
/// None of these are fatal to the page: callers log them and carry on with
/// the effect absent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FxError {
    #[error("viewport is {width}px wide, effect needs at least {min}px")]
    ViewportTooNarrow { width: f64, min: f64 },

    #[error("surface `{0}` is already owned by a live effect")]
    SurfaceBusy(String),

    #[error("rendering capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("rendering context lost")]
    ContextLost,

    #[error("element not found: {0}")]
    MissingElement(String),

    #[error("failed to load `{url}`: {reason}")]
    AssetLoad { url: String, reason: String },

    #[error("invalid typeface data: {0}")]
    FontParse(String),

    #[error("release failed: {0}")]
    Release(String),

    #[error("invalid config: {0}")]
    Config(String),
}

pub type FxResult<T> = Result<T, FxError>;
