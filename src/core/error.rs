//! Error types for logz.

use thiserror::Error;

/// Errors of configuration, page rendering and I/O.
#[derive(Error, Debug)]
pub enum LogzError {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Page could not be rendered, typically a sample failed to marshal
    #[error("Page rendering error: {0}")]
    Render(String),

    /// JSON serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parse failure
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A page needs at least one observer
    #[error("At least one observer is required")]
    NoObservers,
}

/// Result type alias for logz operations
pub type Result<T> = std::result::Result<T, LogzError>;

impl LogzError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new render error
    pub fn render<S: Into<String>>(msg: S) -> Self {
        Self::Render(msg.into())
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::Yaml(_) | Self::NoObservers => "config",
            Self::Render(_) => "render",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }
}
