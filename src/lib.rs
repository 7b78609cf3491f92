//! logz - aggregated in-process view of log messages.
//!
//! logz observes log messages as they are emitted and keeps a bounded
//! summary of them: an exact count per message, first and last occurrence,
//! a few recent samples with their structured payload, and a time
//! histogram. Memory stays bounded whatever the input cardinality.
//!
//! # Architecture
//!
//! - `observer`: the concurrent registry of per-message aggregates
//! - `histogram`: bounded dynamic histogram used for time distributions
//! - `filter`: message normalization reducing key cardinality
//! - `layer`: `tracing-subscriber` layer, one observer per level
//! - `ctx`: context-scoped logging facade, one observer per semantic level
//! - `page`: HTTP page exposing observers
//! - `core`: configuration and errors
//! - `cli`: demo server
//!
//! # Example
//!
//! ```
//! use logz::core::ConfigBuilder;
//! use logz::observer::Observer;
//!
//! let config = ConfigBuilder::new().max_cardinality(2).build().unwrap();
//! let observer = Observer::new(config);
//!
//! for i in 0..3 {
//!     observer.observe_message("request failed", serde_json::json!({"attempt": i}));
//! }
//! observer.observe_message("disk full", ());
//! observer.observe_message("cache cold", ());
//!
//! assert_eq!(observer.find("request failed").unwrap().count, 3);
//! assert_eq!(observer.entries().len(), 2);
//! assert_eq!(observer.other(false).count, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod core;
pub mod ctx;
pub mod filter;
pub mod histogram;
pub mod layer;
pub mod observer;
pub mod page;

// Re-export core types for convenience
pub use crate::core::{Config, LogzError, Result};
pub use crate::observer::{Entry, Observer, PreparedObserver};
