//! Error types for solver configuration.

/// Errors raised while loading or validating a [`CcdConfig`].
///
/// [`CcdConfig`]: crate::config::CcdConfig
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("max_iterations must be at least 1")]
    ZeroIterations,

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} must be within [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f32 },
}
