//! Configuration and error types shared by every logz component.

#![warn(missing_docs)]

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{
    Config, ConfigBuilder, Retention, Settings, MAX_DIST_RESOLUTION, MAX_SAMPLES_LIMIT,
};
pub use error::{LogzError, Result};
