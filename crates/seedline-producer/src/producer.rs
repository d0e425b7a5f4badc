//! Seed producer for bootstrapping a discovery pipeline.
//!
//! This module provides the `SeedProducer`, which fetches each target in
//! turn, extracts candidate work items, keeps the in-scope ones, registers
//! them for deduplication and hands them to consumers through a
//! [`SeedOutputChannel`]. Every run ends with exactly one sentinel.

use crate::channel::{QueueEntry, SeedOutputChannel};
use crate::dedup::DedupRegistry;
use crate::error::FetchError;
use crate::extract::ItemExtractor;
use crate::fetch::{FetchedResponse, Fetcher};
use crate::lifecycle::ProducerHandle;
use crate::report::ErrorReporter;
use crate::scope::ScopeFilter;
use futures::FutureExt;
use seedline_core::{ProducerId, SeedingConfig, Target};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default bounded wait used by [`ProducerHandle::get_result`].
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Counters describing one seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSummary {
    /// Targets whose processing was started
    pub targets_attempted: usize,
    /// Targets that failed to fetch or extract
    pub targets_failed: usize,
    /// Work items placed on the output channel
    pub items_enqueued: usize,
    /// Candidates dropped by the scope filter
    pub items_out_of_scope: usize,
    /// Whether the run stopped early on cancellation
    pub cancelled: bool,
}

/// Outcome of processing a single target.
enum TargetOutcome {
    Seeded { enqueued: usize, dropped: usize },
    /// Failed after enqueueing `enqueued` items.
    Failed { enqueued: usize, dropped: usize },
    Cancelled,
}

impl TargetOutcome {
    const NOTHING_SEEDED: Self = Self::Failed {
        enqueued: 0,
        dropped: 0,
    };
}

/// Enqueues the producer's sentinel exactly once, at the latest when the
/// run is dropped.
struct SentinelGuard<'a> {
    output: &'a SeedOutputChannel,
    producer: ProducerId,
    emitted: bool,
}

impl<'a> SentinelGuard<'a> {
    fn new(output: &'a SeedOutputChannel, producer: ProducerId) -> Self {
        Self {
            output,
            producer,
            emitted: false,
        }
    }

    fn emit(&mut self) {
        if !self.emitted {
            self.emitted = true;
            self.output.enqueue(QueueEntry::Sentinel {
                producer: self.producer,
            });
        }
    }
}

impl Drop for SentinelGuard<'_> {
    fn drop(&mut self) {
        self.emit();
    }
}

/// Converts a list of targets into the first batch of work items.
pub struct SeedProducer {
    id: ProducerId,
    targets: Vec<Target>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn ItemExtractor>,
    dedup: Arc<dyn DedupRegistry>,
    reporter: Arc<dyn ErrorReporter>,
    scope: ScopeFilter,
    output: SeedOutputChannel,
    use_cache: bool,
    poll_timeout: Duration,
}

impl SeedProducer {
    /// Create a producer with its own output channel, domain scoping and
    /// caching enabled.
    #[must_use]
    pub fn new(
        targets: Vec<Target>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn ItemExtractor>,
        dedup: Arc<dyn DedupRegistry>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            id: ProducerId::generate(),
            targets,
            fetcher,
            extractor,
            dedup,
            reporter,
            scope: ScopeFilter::default(),
            output: SeedOutputChannel::new(),
            use_cache: true,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Create a producer using the scope, cache and poll settings from
    /// configuration.
    #[must_use]
    pub fn from_config(
        config: &SeedingConfig,
        targets: Vec<Target>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn ItemExtractor>,
        dedup: Arc<dyn DedupRegistry>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self::new(targets, fetcher, extractor, dedup, reporter)
            .with_scope_filter(ScopeFilter::new(config.scope_policy))
            .with_cache(config.use_cache)
            .with_poll_timeout(config.poll_timeout())
    }

    /// Write into `output` instead of a private channel, e.g. to share one
    /// channel between several producers.
    #[must_use]
    pub fn with_output_channel(mut self, output: SeedOutputChannel) -> Self {
        self.output = output;
        self
    }

    /// Set the scope filter.
    #[must_use]
    pub fn with_scope_filter(mut self, scope: ScopeFilter) -> Self {
        self.scope = scope;
        self
    }

    /// Enable or disable fetch caching.
    #[must_use]
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Set the default bounded wait for [`ProducerHandle::get_result`].
    #[must_use]
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Identifier carried by this producer's sentinel.
    #[must_use]
    pub fn id(&self) -> ProducerId {
        self.id
    }

    /// The channel this producer writes to.
    #[must_use]
    pub fn output(&self) -> &SeedOutputChannel {
        &self.output
    }

    /// Targets this producer will seed from.
    #[must_use]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Run the producer on the current tokio runtime and return its handle.
    ///
    /// Returns immediately. Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(self) -> ProducerHandle {
        self.start_with_token(CancellationToken::new())
    }

    /// Like [`start`](Self::start), stopping when `cancel` is cancelled.
    ///
    /// Pass a child of a supervisor-wide token to stop many producers at
    /// once.
    #[must_use]
    pub fn start_with_token(self, cancel: CancellationToken) -> ProducerHandle {
        let poll_timeout = self.poll_timeout;
        ProducerHandle::spawn(self, cancel, poll_timeout)
    }

    /// Seed the output channel from every target, then enqueue the sentinel.
    ///
    /// Targets are processed one at a time. A failure on one target is
    /// reported and never stops the others. `cancel` is checked between
    /// targets and while a fetch is in flight; the sentinel is enqueued
    /// either way. The run consumes the producer, so each producer emits
    /// one sentinel.
    pub async fn seed_output_queue(self, cancel: &CancellationToken) -> SeedSummary {
        let mut sentinel = SentinelGuard::new(&self.output, self.id);
        let mut summary = SeedSummary::default();

        info!(
            producer = %self.id,
            targets = self.targets.len(),
            "starting seed run"
        );

        for target in &self.targets {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            summary.targets_attempted += 1;
            match self.seed_target(target, cancel).await {
                TargetOutcome::Seeded { enqueued, dropped } => {
                    summary.items_enqueued += enqueued;
                    summary.items_out_of_scope += dropped;
                }
                TargetOutcome::Failed { enqueued, dropped } => {
                    summary.targets_failed += 1;
                    summary.items_enqueued += enqueued;
                    summary.items_out_of_scope += dropped;
                }
                TargetOutcome::Cancelled => {
                    summary.cancelled = true;
                    break;
                }
            }
        }

        if summary.cancelled {
            warn!(
                producer = %self.id,
                remaining = self.targets.len() - summary.targets_attempted,
                "seed run cancelled"
            );
        }

        sentinel.emit();

        info!(
            producer = %self.id,
            attempted = summary.targets_attempted,
            failed = summary.targets_failed,
            enqueued = summary.items_enqueued,
            out_of_scope = summary.items_out_of_scope,
            "seed run finished"
        );

        summary
    }

    async fn seed_target(&self, target: &Target, cancel: &CancellationToken) -> TargetOutcome {
        debug!(target = %target, "fetching seed target");

        let fetch = AssertUnwindSafe(self.fetcher.fetch(target, self.use_cache)).catch_unwind();
        let fetched = tokio::select! {
            () = cancel.cancelled() => {
                debug!(target = %target, "fetch abandoned on cancellation");
                return TargetOutcome::Cancelled;
            }
            fetched = fetch => fetched,
        };

        let response = match fetched {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                self.report_failure(target, &err);
                return TargetOutcome::NOTHING_SEEDED;
            }
            Err(payload) => {
                self.report_failure(target, &panic_to_error("fetcher", payload.as_ref()));
                return TargetOutcome::NOTHING_SEEDED;
            }
        };

        self.enqueue_seeds(target, &response)
    }

    /// Extract, filter, register and enqueue the items of one response.
    ///
    /// A panicking extractor fails the target with nothing enqueued. A
    /// panicking registry fails it after the items already enqueued.
    fn enqueue_seeds(&self, target: &Target, response: &FetchedResponse) -> TargetOutcome {
        let extracted = panic::catch_unwind(AssertUnwindSafe(|| self.extractor.extract(response)));
        let items = match extracted {
            Ok(items) => items,
            Err(payload) => {
                self.report_failure(target, &panic_to_error("item extraction", payload.as_ref()));
                return TargetOutcome::NOTHING_SEEDED;
            }
        };

        let mut enqueued = 0;
        let mut dropped = 0;

        for item in items {
            if !self.scope.in_scope(&item, target) {
                debug!(target = %target, item = %item, "dropping out-of-scope item");
                dropped += 1;
                continue;
            }

            let registered = panic::catch_unwind(AssertUnwindSafe(|| self.dedup.register(&item)));
            if let Err(payload) = registered {
                self.report_failure(
                    target,
                    &panic_to_error("dedup registration", payload.as_ref()),
                );
                return TargetOutcome::Failed { enqueued, dropped };
            }
            self.output.enqueue(QueueEntry::seed(item));
            enqueued += 1;
        }

        debug!(target = %target, enqueued, dropped, "seeded target");
        TargetOutcome::Seeded { enqueued, dropped }
    }

    fn report_failure(&self, target: &Target, err: &FetchError) {
        match err {
            FetchError::ControlledStop { .. } | FetchError::Request(_) => {
                self.reporter
                    .error(&format!("The target URL: {target} is unreachable."));
                self.reporter.error(&format!("Error description: {err}"));
            }
            FetchError::Unexpected(source) => {
                self.reporter.error(&format!(
                    "The target URL: {target} is unreachable because of an unhandled error."
                ));
                self.reporter.error(&format!("Error description: {source}"));
                self.reporter
                    .error(&format!("Trace for this error: {source:?}"));
            }
        }
    }
}

fn panic_to_error(stage: &str, payload: &(dyn Any + Send)) -> FetchError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    FetchError::Unexpected(anyhow::anyhow!("{stage} panicked: {message}"))
}
