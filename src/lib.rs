//! # coverage-engine
//!
//! Progressive script-coverage engine: submits an ordered list of script
//! sections to a slow, rate-limited, failure-prone analysis provider and
//! produces a consolidated report with live progress, mid-flight
//! cancellation, and graceful per-item degradation.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Failure-tolerant** - One item's permanent failure never aborts a run;
//!   it becomes an informative fallback result and the run continues
//! - **Cancellation as a state, not an error** - A cancelled run returns a
//!   partial outcome that says exactly what was and was not attempted
//! - **Snapshot progress** - Every progress emission is a complete,
//!   immutable value, never a mutable object shared by reference
//!
//! ## Quick Start
//!
//! ```no_run
//! use coverage_engine::{
//!     AnalysisProvider, CoverageEngine, ProcessingMode, RunProgress, WorkItem,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(provider: Arc<dyn AnalysisProvider>) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = CoverageEngine::new(provider);
//! let items = vec![
//!     WorkItem::new("scene-1", "Act 1, Scene 1", "INT. KITCHEN - NIGHT ..."),
//!     WorkItem::new("scene-2", "Act 1, Scene 2", "EXT. STREET - DAY ..."),
//! ];
//!
//! let cancel = CancellationToken::new();
//! let sink = |snapshot: &RunProgress| {
//!     println!("[{:>5.1}%] {}", snapshot.percent, snapshot.message);
//! };
//!
//! let outcome = engine
//!     .run(&items, ProcessingMode::Chunked, &[], &cancel, &sink)
//!     .await?;
//!
//! println!("{}", outcome.summary.overall);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Backoff policy for retry waits
pub mod backoff;
/// Provider error classification
pub mod classify;
/// Configuration types
pub mod config;
/// Progressive processing engine (decomposed into focused submodules)
pub mod engine;
/// Error types
pub mod error;
/// Item processor shared by all processing modes
mod processor;
/// Analysis provider interface
pub mod provider;
/// Core types
pub mod types;

// Re-export commonly used types
pub use classify::ErrorClass;
pub use config::{EngineConfig, RetryConfig};
pub use engine::{CoverageEngine, NullSink, ProgressSink};
pub use error::{Error, ProviderError, Result};
pub use provider::{AnalysisProvider, GenerationDescriptor, ResponseShape};
pub use types::{
    AnalysisSource, FailureKind, ItemId, ItemResult, ProcessingMode, RunOutcome, RunProgress,
    RunStats, Summary, SummaryProvenance, WorkItem,
};
