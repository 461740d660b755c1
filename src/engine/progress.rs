//! Progress snapshot construction and emission
//!
//! Every emission builds a complete, immutable [`RunProgress`] value, never
//! a partially-filled object passed by reference. The reporter owns the run
//! totals and the accumulated results, keeps `current_index` monotone even
//! when concurrent item tasks report out of order, and keeps the completed
//! list prefix-consistent with the final outcome.

use crate::types::{ItemId, ItemResult, ProcessingMode, RunProgress};
use std::sync::Mutex;
use std::time::Duration;

/// Caller-supplied sink receiving progress snapshots
///
/// Called synchronously from the engine's task; implementations must not
/// block significantly.
pub trait ProgressSink: Send + Sync {
    /// Receive one progress snapshot
    fn on_progress(&self, snapshot: &RunProgress);
}

impl<F> ProgressSink for F
where
    F: Fn(&RunProgress) + Send + Sync,
{
    fn on_progress(&self, snapshot: &RunProgress) {
        self(snapshot)
    }
}

/// Sink that discards all snapshots
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_progress(&self, _snapshot: &RunProgress) {}
}

struct ReporterState {
    current_index: usize,
    completed: Vec<ItemResult>,
    failed_ids: Vec<ItemId>,
}

/// Owns progress state for one run and emits snapshots through the sink
pub(crate) struct ProgressReporter<'a> {
    sink: &'a dyn ProgressSink,
    mode: ProcessingMode,
    total_items: usize,
    state: Mutex<ReporterState>,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink, mode: ProcessingMode, total_items: usize) -> Self {
        Self {
            sink,
            mode,
            total_items,
            state: Mutex::new(ReporterState {
                current_index: 0,
                completed: Vec::new(),
                failed_ids: Vec::new(),
            }),
        }
    }

    /// Emit a snapshot for an attempt starting on an item
    pub(crate) fn attempt(&self, index: usize, title: &str, retry_count: u32) {
        let message = attempt_message(self.mode, index, self.total_items, title);
        self.emit(index, title, message, false, retry_count, None);
    }

    /// Emit a snapshot announcing a scheduled retry and its delay
    pub(crate) fn retrying(&self, index: usize, title: &str, retry_count: u32, delay: Duration) {
        let message = format!(
            "Provider busy, retrying \"{}\" in {:.1}s (retry {})",
            title,
            delay.as_secs_f64(),
            retry_count
        );
        self.emit(index, title, message, true, retry_count, Some(delay));
    }

    /// Record a finished item (success or fallback) and emit its snapshot
    ///
    /// Completions must arrive in original item order; the run loop
    /// guarantees this even under bounded concurrency.
    pub(crate) fn item_completed(&self, index: usize, result: ItemResult) {
        let title = result.title().to_string();
        let message = match &result {
            ItemResult::Success { .. } => format!("Completed \"{title}\""),
            ItemResult::Fallback { kind, .. } => {
                format!("Could not analyze \"{title}\" ({})", kind.label())
            }
        };
        {
            let mut state = self.lock_state();
            if !result.is_success() {
                state.failed_ids.push(result.item_id().clone());
            }
            state.completed.push(result);
        }
        self.emit(index, &title, message, false, 0, None);
    }

    /// Emit the terminal snapshot for the run
    ///
    /// Reports the highest index actually reached, so a cancelled run's
    /// terminal snapshot never claims an item position that was never
    /// attempted.
    pub(crate) fn finished(&self, message: String) {
        let reached = self.lock_state().current_index;
        self.emit(reached, "", message, false, 0, None);
    }

    /// Number of items recorded as completed so far
    pub(crate) fn completed_len(&self) -> usize {
        self.lock_state().completed.len()
    }

    /// Hand the accumulated results and failed ids to the aggregator
    pub(crate) fn into_results(self) -> (Vec<ItemResult>, Vec<ItemId>) {
        let state = self.state.into_inner().unwrap_or_else(|e| e.into_inner());
        (state.completed, state.failed_ids)
    }

    fn emit(
        &self,
        index: usize,
        title: &str,
        message: String,
        is_retrying: bool,
        retry_count: u32,
        next_retry_in: Option<Duration>,
    ) {
        let snapshot = {
            let mut state = self.lock_state();
            // Index never goes backwards, even if a concurrent earlier item
            // reports after a later one started
            state.current_index = state.current_index.max(index);
            RunProgress {
                current_index: state.current_index,
                total_items: self.total_items,
                current_title: title.to_string(),
                percent: percent(state.completed.len(), self.total_items),
                message,
                is_retrying,
                retry_count,
                next_retry_in,
                completed: state.completed.clone(),
                failed_ids: state.failed_ids.clone(),
            }
        };
        self.sink.on_progress(&snapshot);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ReporterState> {
        // A sink panic mid-emission must not wedge the run
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn percent(completed: usize, total: usize) -> f32 {
    if total == 0 {
        return 100.0;
    }
    (completed as f32 / total as f32) * 100.0
}

fn attempt_message(mode: ProcessingMode, index: usize, total: usize, title: &str) -> String {
    match mode {
        ProcessingMode::Single => format!("Analyzing \"{title}\""),
        ProcessingMode::Chunked => {
            format!("Analyzing section {} of {}: \"{}\"", index + 1, total, title)
        }
        ProcessingMode::Blended => format!("Synthesizing blended notes for \"{title}\""),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnalysisSource, FailureKind, ItemId};
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;

    struct CollectingSink {
        snapshots: StdMutex<Vec<RunProgress>>,
    }

    impl CollectingSink {
        fn new() -> Self {
            Self {
                snapshots: StdMutex::new(Vec::new()),
            }
        }

        fn taken(&self) -> Vec<RunProgress> {
            self.snapshots.lock().unwrap().clone()
        }
    }

    impl ProgressSink for CollectingSink {
        fn on_progress(&self, snapshot: &RunProgress) {
            self.snapshots.lock().unwrap().push(snapshot.clone());
        }
    }

    fn success(id: &str) -> ItemResult {
        ItemResult::Success {
            item_id: ItemId::new(id),
            title: format!("Scene {id}"),
            structured: String::new(),
            freeform: String::new(),
            categories: BTreeMap::new(),
            source: AnalysisSource::Single,
            perspectives: Vec::new(),
            retries: 0,
        }
    }

    fn fallback(id: &str) -> ItemResult {
        ItemResult::Fallback {
            item_id: ItemId::new(id),
            title: format!("Scene {id}"),
            placeholder: String::new(),
            kind: FailureKind::Other,
            detail: String::new(),
            retries: 1,
        }
    }

    #[test]
    fn attempt_snapshot_carries_mode_specific_message() {
        let sink = CollectingSink::new();
        let reporter = ProgressReporter::new(&sink, ProcessingMode::Chunked, 3);
        reporter.attempt(1, "The Chase", 0);

        let snaps = sink.taken();
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].message, "Analyzing section 2 of 3: \"The Chase\"");
        assert!(!snaps[0].is_retrying);
        assert_eq!(snaps[0].current_index, 1);
    }

    #[test]
    fn retry_snapshot_carries_delay_and_count() {
        let sink = CollectingSink::new();
        let reporter = ProgressReporter::new(&sink, ProcessingMode::Single, 1);
        reporter.retrying(0, "Opening", 2, Duration::from_secs(3));

        let snaps = sink.taken();
        assert!(snaps[0].is_retrying);
        assert_eq!(snaps[0].retry_count, 2);
        assert_eq!(snaps[0].next_retry_in, Some(Duration::from_secs(3)));
    }

    #[test]
    fn completed_results_accumulate_and_percent_tracks_them() {
        let sink = CollectingSink::new();
        let reporter = ProgressReporter::new(&sink, ProcessingMode::Single, 4);
        reporter.item_completed(0, success("a"));
        reporter.item_completed(1, fallback("b"));

        let snaps = sink.taken();
        assert_eq!(snaps[0].completed.len(), 1);
        assert!((snaps[0].percent - 25.0).abs() < f32::EPSILON);
        assert_eq!(snaps[1].completed.len(), 2);
        assert!((snaps[1].percent - 50.0).abs() < f32::EPSILON);
        assert_eq!(snaps[1].failed_ids, vec![ItemId::new("b")]);
    }

    #[test]
    fn completed_lists_are_prefix_consistent_across_snapshots() {
        let sink = CollectingSink::new();
        let reporter = ProgressReporter::new(&sink, ProcessingMode::Single, 3);
        reporter.item_completed(0, success("a"));
        reporter.attempt(1, "Scene b", 0);
        reporter.item_completed(1, success("b"));

        let snaps = sink.taken();
        for window in snaps.windows(2) {
            let (earlier, later) = (&window[0], &window[1]);
            assert!(earlier.completed.len() <= later.completed.len());
            for (i, result) in earlier.completed.iter().enumerate() {
                assert_eq!(
                    result.item_id(),
                    later.completed[i].item_id(),
                    "earlier snapshot must be a prefix of the later one"
                );
            }
        }
    }

    #[test]
    fn current_index_never_decreases() {
        let sink = CollectingSink::new();
        let reporter = ProgressReporter::new(&sink, ProcessingMode::Single, 5);
        reporter.attempt(2, "c", 0);
        // A slower earlier item reporting late must not move the index back
        reporter.attempt(1, "b", 1);

        let snaps = sink.taken();
        assert_eq!(snaps[0].current_index, 2);
        assert_eq!(snaps[1].current_index, 2);
    }

    #[test]
    fn terminal_snapshot_reports_the_index_actually_reached() {
        let sink = CollectingSink::new();
        let reporter = ProgressReporter::new(&sink, ProcessingMode::Single, 5);
        reporter.attempt(0, "a", 0);
        reporter.item_completed(0, success("a"));
        reporter.attempt(1, "b", 0);
        reporter.finished("stopped early".to_string());

        let snaps = sink.taken();
        let terminal = snaps.last().unwrap();
        assert_eq!(
            terminal.current_index, 1,
            "a run stopped at index 1 must not claim to have reached index 4"
        );
    }

    #[test]
    fn into_results_returns_accumulated_order() {
        let sink = CollectingSink::new();
        let reporter = ProgressReporter::new(&sink, ProcessingMode::Single, 2);
        reporter.item_completed(0, success("a"));
        reporter.item_completed(1, fallback("b"));

        let (results, failed) = reporter.into_results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].item_id().as_str(), "a");
        assert_eq!(results[1].item_id().as_str(), "b");
        assert_eq!(failed, vec![ItemId::new("b")]);
    }

    #[test]
    fn closure_sinks_work_through_blanket_impl() {
        let count = StdMutex::new(0usize);
        {
            let sink = |_: &RunProgress| {
                *count.lock().unwrap() += 1;
            };
            let reporter = ProgressReporter::new(&sink, ProcessingMode::Single, 1);
            reporter.attempt(0, "only", 0);
            reporter.finished("done".to_string());
        }
        assert_eq!(*count.lock().unwrap(), 2);
    }
}
