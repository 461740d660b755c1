//! Progressive processing engine, split into focused submodules:
//! - [`progress`] - Progress snapshot construction and the sink trait
//! - [`item_task`] - Per-item retry controller and fallback synthesis
//! - [`run_loop`] - Ordered item iteration, pacing, bounded concurrency
//! - [`summary`] - Result aggregation and summary synthesis

mod item_task;
pub(crate) mod progress;
mod run_loop;
mod summary;


pub use progress::{NullSink, ProgressSink};

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::provider::AnalysisProvider;
use crate::types::{ItemResult, ProcessingMode, RunOutcome, RunStats, WorkItem};
use progress::ProgressReporter;

/// The progressive coverage engine
///
/// Owns a provider handle and a configuration; each call to [`run`] executes
/// one independent run with its own accumulator. The engine itself holds no
/// per-run state, so one instance can serve many runs (a fresh cancellation
/// token is required per run).
///
/// [`run`]: CoverageEngine::run
pub struct CoverageEngine {
    pub(crate) provider: Arc<dyn AnalysisProvider>,
    pub(crate) config: EngineConfig,
}

impl CoverageEngine {
    /// Create an engine with the default configuration
    pub fn new(provider: Arc<dyn AnalysisProvider>) -> Self {
        Self {
            provider,
            config: EngineConfig::default(),
        }
    }

    /// Create an engine with a custom configuration
    ///
    /// Fails with [`Error::InvalidConfig`] when the configuration is
    /// internally inconsistent.
    pub fn with_config(provider: Arc<dyn AnalysisProvider>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { provider, config })
    }

    /// The engine's configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute one run over an ordered item list
    ///
    /// Items are processed in order; every item reaches exactly one terminal
    /// result (success or fallback) unless cancellation stops the run first.
    /// Per-item provider failures never surface as errors; they become
    /// fallback results and the run continues. The only failure modes of this
    /// method are caller misuse (empty list, duplicate ids), raised before
    /// any work starts.
    ///
    /// Cancellation is a normal terminal state: the returned outcome is
    /// flagged `partial` and its summary states how many items were never
    /// attempted.
    ///
    /// `perspectives` names the viewpoints a blended run merges; it is
    /// ignored in single and chunked modes.
    pub async fn run(
        &self,
        items: &[WorkItem],
        mode: ProcessingMode,
        perspectives: &[String],
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<RunOutcome> {
        validate_items(items)?;

        let run_id = Uuid::new_v4();
        tracing::info!(
            run_id = %run_id,
            items = items.len(),
            mode = mode.label(),
            max_concurrent = self.config.max_concurrent,
            "Coverage run started"
        );

        let reporter = ProgressReporter::new(sink, mode, items.len());

        self.drive_items(items, mode, perspectives, cancel, &reporter)
            .await;

        let completed = reporter.completed_len();
        let partial = completed < items.len();

        let terminal_message = if partial {
            format!(
                "Run stopped early after {} of {} sections",
                completed,
                items.len()
            )
        } else {
            "Coverage run complete".to_string()
        };
        reporter.finished(terminal_message);

        let (results, _failed_ids) = reporter.into_results();
        let stats = compute_stats(&results, items.len());

        let summary = self
            .build_summary(&results, mode, perspectives, &stats, cancel)
            .await;

        tracing::info!(
            run_id = %run_id,
            succeeded = stats.succeeded,
            fallbacks = stats.rate_limited_fallbacks + stats.permanently_failed,
            unattempted = stats.unattempted,
            partial = partial,
            "Coverage run finished"
        );

        Ok(RunOutcome {
            run_id,
            finished_at: Utc::now(),
            mode,
            results,
            summary,
            stats,
            partial,
        })
    }
}

fn validate_items(items: &[WorkItem]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::EmptyRun);
    }
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(&item.id) {
            return Err(Error::DuplicateItemId(item.id.clone()));
        }
    }
    Ok(())
}

fn compute_stats(results: &[ItemResult], total_items: usize) -> RunStats {
    let mut stats = RunStats {
        unattempted: total_items - results.len(),
        ..Default::default()
    };
    for result in results {
        stats.total_retry_attempts += result.retries();
        match result.failure_kind() {
            None => stats.succeeded += 1,
            Some(crate::types::FailureKind::RateLimited) => stats.rate_limited_fallbacks += 1,
            Some(_) => stats.permanently_failed += 1,
        }
    }
    stats
}
