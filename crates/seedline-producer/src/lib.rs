//! Seedline Producer - Seeding the discovery pipeline.
//!
//! This crate turns a list of target URLs into the first batch of work items
//! for a discovery pipeline. A [`SeedProducer`] fetches each target, extracts
//! candidate requests, keeps those in scope of the target, registers them for
//! deduplication and hands them to consumers through a shared
//! [`SeedOutputChannel`], finishing with exactly one sentinel.
//!
//! # Features
//!
//! - Per-target failure isolation: fetch errors and collaborator panics are
//!   reported and never abort the batch
//! - Tagged queue entries so the sentinel cannot be mistaken for an item
//! - Cooperative cancellation that still emits the sentinel
//! - Reference `reqwest` fetcher with response caching and an HTML form
//!   extractor
//!
//! # Example
//!
//! ```rust,ignore
//! use seedline_producer::{
//!     HtmlItemExtractor, HttpFetcher, InMemoryDedupRegistry, QueueEntry, SeedProducer,
//!     TracingReporter,
//! };
//! use seedline_core::{logging, AppConfig, Target};
//! use std::sync::Arc;
//!
//! logging::init_tracing();
//! let config = AppConfig::load_with_env()?;
//!
//! let producer = SeedProducer::from_config(
//!     &config.seeding,
//!     vec![Target::new("http://a.example/")?],
//!     Arc::new(HttpFetcher::from_config(&config.http)?),
//!     Arc::new(HtmlItemExtractor::new()),
//!     Arc::new(InMemoryDedupRegistry::new()),
//!     Arc::new(TracingReporter),
//! );
//!
//! let handle = producer.start();
//! loop {
//!     match handle.get_result().await {
//!         Some(QueueEntry::Item { item, .. }) => println!("seed: {item}"),
//!         Some(QueueEntry::Sentinel { .. }) => break,
//!         None => continue,
//!     }
//! }
//! let summary = handle.join().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod channel;
pub mod dedup;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod extract;
pub mod fetch;
pub mod lifecycle;
pub mod producer;
pub mod report;
#[allow(missing_docs)]
pub mod scope;

// Re-export commonly used types
pub use channel::{Provenance, QueueEntry, SeedOutputChannel, SentinelTally};
pub use dedup::{DedupRegistry, InMemoryDedupRegistry};
pub use error::{FetchError, ProducerError, Result};
pub use extract::{HtmlItemExtractor, ItemExtractor};
pub use fetch::{FetchedResponse, Fetcher, HttpFetcher};
pub use lifecycle::ProducerHandle;
pub use producer::{SeedProducer, SeedSummary, DEFAULT_POLL_TIMEOUT};
pub use report::{CapturingReporter, ErrorReporter, TracingReporter};
pub use scope::ScopeFilter;
