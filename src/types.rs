//! Core types for coverage-engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a work item
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Create a new ItemId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ItemId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl PartialEq<str> for ItemId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ItemId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One unit of input submitted for analysis (a script section or single scene)
///
/// Work items are created by the caller before the run starts and are never
/// mutated by the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkItem {
    /// Opaque unique identifier
    pub id: ItemId,

    /// Human-readable title (e.g., "Act 1, Scene 3")
    pub title: String,

    /// Text payload submitted to the analysis provider
    pub payload: String,

    /// Participant names mentioned in the payload (e.g., characters)
    pub participants: Vec<String>,
}

impl WorkItem {
    /// Create a work item with no participants
    pub fn new(
        id: impl Into<ItemId>,
        title: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            payload: payload.into(),
            participants: Vec::new(),
        }
    }
}

/// Processing mode for a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// One item analyzed on its own
    #[default]
    Single,
    /// One of many items in a longer ordered sequence (same analysis as
    /// Single; selects sequence-aware progress messages)
    Chunked,
    /// Multiple named perspectives merged into one synthesized voice per item
    Blended,
}

impl ProcessingMode {
    /// Short lowercase label used in progress messages and summaries
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingMode::Single => "single",
            ProcessingMode::Chunked => "chunked",
            ProcessingMode::Blended => "blended",
        }
    }
}

/// Where a successful analysis came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    /// A single perspective
    Single,
    /// Multiple perspectives merged by the provider
    Blended,
}

/// Classification attached to a fallback result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Provider signaled throttling and the retry budget ran out
    RateLimited,
    /// Payload exceeded provider limits (never retried)
    ContentTooLarge,
    /// A blended run failed permanently for a non-rate-limit reason
    BlendFailed,
    /// Unknown permanent failure
    Other,
}

impl FailureKind {
    /// Human-readable label used in placeholder text
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::RateLimited => "rate limited",
            FailureKind::ContentTooLarge => "content too large",
            FailureKind::BlendFailed => "blend failed",
            FailureKind::Other => "analysis failed",
        }
    }
}

/// The outcome for one work item
///
/// Every work item produces exactly one `ItemResult` by the time the run ends
/// normally; a cancelled run produces zero or one for the in-flight item and
/// none for items never attempted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemResult {
    /// Analysis completed
    Success {
        /// The work item this result belongs to
        item_id: ItemId,
        /// Work item title, carried for display
        title: String,
        /// Structured rendering (labelled sections)
        structured: String,
        /// Freeform prose rendering
        freeform: String,
        /// Category name to excerpt, extracted from the structured rendering
        categories: BTreeMap<String, String>,
        /// Whether this came from a single or blended request
        source: AnalysisSource,
        /// Contributing perspective names (non-empty only for blended)
        perspectives: Vec<String>,
        /// Retries consumed before success
        retries: u32,
    },

    /// Analysis permanently failed; a synthesized placeholder stands in
    Fallback {
        /// The work item this result belongs to
        item_id: ItemId,
        /// Work item title, carried for display
        title: String,
        /// Informative, actionable placeholder text safe to show end users
        placeholder: String,
        /// Failure classification
        kind: FailureKind,
        /// Diagnostic detail (last provider error message)
        detail: String,
        /// Retries consumed before giving up
        retries: u32,
    },
}

impl ItemResult {
    /// The work item id this result belongs to
    pub fn item_id(&self) -> &ItemId {
        match self {
            ItemResult::Success { item_id, .. } | ItemResult::Fallback { item_id, .. } => item_id,
        }
    }

    /// The work item title
    pub fn title(&self) -> &str {
        match self {
            ItemResult::Success { title, .. } | ItemResult::Fallback { title, .. } => title,
        }
    }

    /// Retries consumed producing this result
    pub fn retries(&self) -> u32 {
        match self {
            ItemResult::Success { retries, .. } | ItemResult::Fallback { retries, .. } => *retries,
        }
    }

    /// True for the `Success` variant
    pub fn is_success(&self) -> bool {
        matches!(self, ItemResult::Success { .. })
    }

    /// The failure kind, if this is a fallback
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ItemResult::Fallback { kind, .. } => Some(*kind),
            ItemResult::Success { .. } => None,
        }
    }
}

/// Immutable progress snapshot emitted to the progress sink
///
/// A new snapshot is constructed for every emission; snapshots are never
/// mutated in place. `completed.len() <= total_items` always holds, and
/// `current_index` never decreases within a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunProgress {
    /// Index of the item currently being processed (0-based)
    pub current_index: usize,

    /// Total number of items in the run
    pub total_items: usize,

    /// Title of the item currently being processed
    pub current_title: String,

    /// Overall progress percentage (0.0 to 100.0)
    pub percent: f32,

    /// Human-readable status message
    pub message: String,

    /// Whether the current item is waiting to retry
    pub is_retrying: bool,

    /// Retries consumed so far on the current item
    pub retry_count: u32,

    /// Delay before the next retry attempt, when one is scheduled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_in: Option<Duration>,

    /// Results completed so far, in item order
    pub completed: Vec<ItemResult>,

    /// Ids of items that ultimately fell back, in item order
    pub failed_ids: Vec<ItemId>,
}

/// Counters accumulated over a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Items that produced a Success result
    pub succeeded: usize,

    /// Items that fell back after exhausting retries on rate limits
    pub rate_limited_fallbacks: usize,

    /// Items that fell back on a non-retryable failure
    pub permanently_failed: usize,

    /// Total retry attempts across all items
    pub total_retry_attempts: u32,

    /// Items never attempted (non-zero only for cancelled runs)
    pub unattempted: usize,
}

/// How the run summary was produced
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryProvenance {
    /// The provider synthesized an overview from the successful analyses
    Synthesized,
    /// Deterministic template text derived from run counts
    Template,
}

/// Consolidated assessment of a run
///
/// Shaped identically whether synthesized by the provider or derived from
/// templates; `provenance` records which path produced it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Summary {
    /// Overall assessment paragraph
    pub overall: String,

    /// Identified strengths
    pub strengths: Vec<String>,

    /// Outstanding issues
    pub issues: Vec<String>,

    /// Recommendations
    pub recommendations: Vec<String>,

    /// Which strategy produced this summary
    pub provenance: SummaryProvenance,
}

/// Terminal value of a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Unique run identifier
    pub run_id: Uuid,

    /// When the run finished (completion or cancellation)
    pub finished_at: DateTime<Utc>,

    /// Processing mode the run executed in
    pub mode: ProcessingMode,

    /// Item results in original item order
    pub results: Vec<ItemResult>,

    /// Consolidated summary
    pub summary: Summary,

    /// Run counters
    pub stats: RunStats,

    /// True when cancellation stopped the run before all items were attempted
    pub partial: bool,
}

impl RunOutcome {
    /// Number of items that completed (success or fallback)
    pub fn completed_count(&self) -> usize {
        self.results.len()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    // --- ItemId conversions ---

    #[test]
    fn item_id_from_str_and_back() {
        let id = ItemId::from("scene-1");
        let raw: String = id.clone().into();
        assert_eq!(raw, "scene-1");
        assert_eq!(id.as_str(), "scene-1");
        assert_eq!("scene-1".parse::<ItemId>().unwrap(), id);
    }

    #[test]
    fn item_id_display_matches_inner_value() {
        let id = ItemId::new("act-2-scene-7");
        assert_eq!(id.to_string(), "act-2-scene-7");
    }

    #[test]
    fn item_id_partial_eq_with_str() {
        let id = ItemId::new("s1");
        assert!(id == "s1");
        assert!(id != "s2");
    }

    #[test]
    fn item_id_serializes_transparently() {
        let json = serde_json::to_string(&ItemId::new("s1")).unwrap();
        assert_eq!(json, "\"s1\"", "ItemId must serialize as a bare string");
    }

    // --- ProcessingMode ---

    #[test]
    fn processing_mode_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProcessingMode::Blended).unwrap(),
            "\"blended\""
        );
        assert_eq!(ProcessingMode::Chunked.label(), "chunked");
    }

    // --- ItemResult accessors ---

    fn success(id: &str) -> ItemResult {
        ItemResult::Success {
            item_id: ItemId::new(id),
            title: format!("Scene {id}"),
            structured: "STRENGTHS:\ngood".to_string(),
            freeform: "reads well".to_string(),
            categories: BTreeMap::new(),
            source: AnalysisSource::Single,
            perspectives: Vec::new(),
            retries: 0,
        }
    }

    fn fallback(id: &str, kind: FailureKind) -> ItemResult {
        ItemResult::Fallback {
            item_id: ItemId::new(id),
            title: format!("Scene {id}"),
            placeholder: "could not analyze".to_string(),
            kind,
            detail: "boom".to_string(),
            retries: 2,
        }
    }

    #[test]
    fn item_result_accessors_cover_both_variants() {
        let ok = success("a");
        assert!(ok.is_success());
        assert_eq!(ok.item_id().as_str(), "a");
        assert_eq!(ok.retries(), 0);
        assert_eq!(ok.failure_kind(), None);

        let failed = fallback("b", FailureKind::RateLimited);
        assert!(!failed.is_success());
        assert_eq!(failed.title(), "Scene b");
        assert_eq!(failed.retries(), 2);
        assert_eq!(failed.failure_kind(), Some(FailureKind::RateLimited));
    }

    #[test]
    fn item_result_serde_round_trips_with_outcome_tag() {
        let json = serde_json::to_string(&fallback("c", FailureKind::ContentTooLarge)).unwrap();
        assert!(
            json.contains("\"outcome\":\"fallback\""),
            "variant tag should be snake_case under the outcome key, got: {json}"
        );
        let back: ItemResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.failure_kind(), Some(FailureKind::ContentTooLarge));
    }

    #[test]
    fn failure_kind_labels_are_human_readable() {
        assert_eq!(FailureKind::RateLimited.label(), "rate limited");
        assert_eq!(FailureKind::ContentTooLarge.label(), "content too large");
    }

    #[test]
    fn run_stats_default_is_all_zero() {
        let stats = RunStats::default();
        assert_eq!(stats.succeeded, 0);
        assert_eq!(stats.total_retry_attempts, 0);
        assert_eq!(stats.unattempted, 0);
    }
}
