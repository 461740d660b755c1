//! Ordered item iteration with pacing and cancellation
//!
//! Two paths share the per-item retry machinery. The sequential path
//! (`max_concurrent == 1`, the default) processes strictly in order with an
//! inter-item pause scaled by how many retries the previous item needed. The
//! bounded path uses `futures::stream::buffered`, which starts up to N items
//! and still yields completions in original item order, so progress and the
//! final result list keep their ordering guarantees; pacing is skipped there
//! since the caller has declared the provider tolerant of concurrent load.

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use super::item_task::ItemTask;
use super::progress::ProgressReporter;
use super::CoverageEngine;
use crate::processor::ItemProcessor;
use crate::types::{ProcessingMode, WorkItem};

impl CoverageEngine {
    /// Process every item to a terminal state or until cancellation
    ///
    /// Completions are recorded on the reporter in original item order.
    pub(crate) async fn drive_items(
        &self,
        items: &[WorkItem],
        mode: ProcessingMode,
        perspectives: &[String],
        cancel: &CancellationToken,
        reporter: &ProgressReporter<'_>,
    ) {
        let processor = ItemProcessor::new(self.provider.clone());
        let task = ItemTask {
            processor: &processor,
            config: &self.config,
            reporter,
            cancel,
            mode,
            perspectives,
        };

        if self.config.max_concurrent <= 1 {
            self.drive_sequential(items, &task, cancel, reporter).await;
        } else {
            self.drive_buffered(items, &task, cancel, reporter).await;
        }
    }

    async fn drive_sequential(
        &self,
        items: &[WorkItem],
        task: &ItemTask<'_>,
        cancel: &CancellationToken,
        reporter: &ProgressReporter<'_>,
    ) {
        let mut prior_retries: u32 = 0;

        for (index, item) in items.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }

            if index > 0 {
                let pause = self.config.inter_item_delay
                    + self.config.inter_item_retry_step * prior_retries;
                if !pause.is_zero() {
                    tokio::select! {
                        _ = tokio::time::sleep(pause) => {}
                        _ = cancel.cancelled() => break,
                    }
                }
                // The sleep may have completed in the same poll as the
                // cancellation; no new work starts either way
                if cancel.is_cancelled() {
                    break;
                }
            }

            match task.process_item(index, item).await {
                Some(result) => {
                    prior_retries = result.retries();
                    reporter.item_completed(index, result);
                }
                None => break,
            }
        }
    }

    async fn drive_buffered(
        &self,
        items: &[WorkItem],
        task: &ItemTask<'_>,
        cancel: &CancellationToken,
        reporter: &ProgressReporter<'_>,
    ) {
        let results = stream::iter(items.iter().enumerate())
            .map(|(index, item)| async move {
                // Items whose future starts after cancellation are
                // reported as never attempted
                if cancel.is_cancelled() {
                    return (index, None);
                }
                (index, task.process_item(index, item).await)
            })
            .buffered(self.config.max_concurrent);
        futures::pin_mut!(results);

        while let Some((index, outcome)) = results.next().await {
            if let Some(result) = outcome {
                reporter.item_completed(index, result);
            }
        }
    }
}
