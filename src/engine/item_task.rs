//! Per-item retry controller
//!
//! Drives one work item through the processor with bounded retries:
//! `Pending → Attempting → {Succeeded | Retrying → Attempting | Failed}`.
//! Retryable errors wait out the backoff policy (racing the cancellation
//! token) and try again while budget remains; non-retryable errors and
//! budget exhaustion synthesize a fallback result. An exhausted item never
//! aborts the run.

use crate::backoff::backoff_delay;
use crate::classify::{classify, ErrorClass};
use crate::config::EngineConfig;
use crate::engine::progress::ProgressReporter;
use crate::error::ProviderError;
use crate::processor::{ItemProcessor, SectionAnalysis};
use crate::types::{FailureKind, ItemResult, ProcessingMode, WorkItem};
use tokio_util::sync::CancellationToken;

/// Everything a single item task needs, borrowed from the run loop
pub(crate) struct ItemTask<'a> {
    pub processor: &'a ItemProcessor,
    pub config: &'a EngineConfig,
    pub reporter: &'a ProgressReporter<'a>,
    pub cancel: &'a CancellationToken,
    pub mode: ProcessingMode,
    pub perspectives: &'a [String],
}

impl ItemTask<'_> {
    /// Process one item to a terminal state
    ///
    /// Returns `None` only when cancellation interrupted the item before it
    /// reached a terminal state; the run loop treats that as "unattempted".
    pub(crate) async fn process_item(&self, index: usize, item: &WorkItem) -> Option<ItemResult> {
        let mut retries: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return None;
            }

            self.reporter.attempt(index, &item.title, retries);

            let error = match self
                .processor
                .process(item, self.mode, self.perspectives, self.cancel)
                .await
            {
                Ok(analysis) => return Some(self.success(item, analysis, retries)),
                Err(error) => error,
            };

            // An attempt aborted by cancellation is not an item failure
            if self.cancel.is_cancelled() {
                return None;
            }

            let class = classify(&error);

            if class.is_retryable() && retries < self.config.retry.max_retries {
                retries += 1;
                let delay = backoff_delay(retries, &class, &self.config.retry);
                tracing::warn!(
                    item_id = %item.id,
                    error = %error,
                    retry = retries,
                    max_retries = self.config.retry.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Provider call failed, retrying"
                );
                self.reporter.retrying(index, &item.title, retries, delay);

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.cancel.cancelled() => return None,
                }
            } else {
                tracing::error!(
                    item_id = %item.id,
                    error = %error,
                    retries = retries,
                    "Item permanently failed, synthesizing fallback"
                );
                return Some(self.fallback(item, &class, &error, retries));
            }
        }
    }

    fn success(&self, item: &WorkItem, analysis: SectionAnalysis, retries: u32) -> ItemResult {
        ItemResult::Success {
            item_id: item.id.clone(),
            title: item.title.clone(),
            structured: analysis.structured,
            freeform: analysis.freeform,
            categories: analysis.categories,
            source: analysis.source,
            perspectives: analysis.perspectives,
            retries,
        }
    }

    fn fallback(
        &self,
        item: &WorkItem,
        class: &ErrorClass,
        error: &ProviderError,
        retries: u32,
    ) -> ItemResult {
        let kind = fallback_kind(class, self.mode);
        ItemResult::Fallback {
            item_id: item.id.clone(),
            title: item.title.clone(),
            placeholder: placeholder_text(item, kind),
            kind,
            detail: error.message.clone(),
            retries,
        }
    }
}

/// Map a terminal error class to the recorded failure kind
///
/// Blended runs report `BlendFailed` for unknown permanent failures so
/// downstream display can suggest dropping perspectives; oversized content
/// keeps its more specific classification.
fn fallback_kind(class: &ErrorClass, mode: ProcessingMode) -> FailureKind {
    match (class, mode) {
        (ErrorClass::Other, ProcessingMode::Blended) => FailureKind::BlendFailed,
        _ => class.failure_kind(),
    }
}

/// Synthesize the user-facing placeholder for a permanently failed item
///
/// Callers may display it directly without further processing.
fn placeholder_text(item: &WorkItem, kind: FailureKind) -> String {
    let words = item.payload.split_whitespace().count();
    let size_note = if item.participants.is_empty() {
        format!("about {words} words")
    } else {
        format!("about {words} words, {} participants", item.participants.len())
    };

    let next_step = match kind {
        FailureKind::RateLimited => {
            "retry this section during off-peak hours, when the provider is less busy"
        }
        FailureKind::ContentTooLarge => {
            "split this section into smaller parts and analyze them separately"
        }
        FailureKind::BlendFailed => {
            "re-run with fewer perspectives, or analyze this section from a single perspective"
        }
        FailureKind::Other => "re-run this section; repeated failures may be a provider outage",
    };

    format!(
        "Analysis for \"{}\" could not be completed: {}. The section is {}. Suggested next step: {}.",
        item.title,
        kind.label(),
        size_note,
        next_step
    )
}
