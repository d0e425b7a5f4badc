//! Seedline Core - Foundation crate for the Seedline discovery pipeline.
//!
//! This crate provides the shared types, error handling, configuration
//! management and logging setup that the producer crate builds on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes and request descriptors (`Target`, `WorkItem`, `ProducerId`)
//! - [`logging`] - Tracing subscriber setup
//!
//! # Example
//!
//! ```rust
//! use seedline_core::{logging, AppConfig, Target};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! logging::init_tracing();
//!
//! let config = AppConfig::default();
//! assert!(config.seeding.use_cache);
//!
//! let target = Target::new("http://a.example/")?;
//! assert_eq!(target.domain(), "a.example");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, HttpConfig, ScopePolicy, SeedingConfig};
pub use error::{ConfigError, ConfigResult, Result, SeedlineError};
pub use types::{HttpMethod, ProducerId, Target, WorkItem, WorkItemId};
