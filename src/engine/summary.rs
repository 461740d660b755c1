//! Result aggregation and summary synthesis
//!
//! Two strategies produce the identical `Summary` shape. When at least one
//! item succeeded and the run completed normally, the engine asks the
//! provider for a structured overview of the successful analyses; any failure
//! on that path (provider error, malformed response) degrades to the
//! deterministic template summary without affecting the run. Partial runs
//! always use the template path and state exactly how many items were never
//! attempted.

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::CoverageEngine;
use crate::provider::{GenerationDescriptor, ResponseShape};
use crate::types::{ItemResult, ProcessingMode, RunStats, Summary, SummaryProvenance};

/// Shape the provider is asked to return for an overview request
#[derive(Debug, Deserialize)]
struct OverviewResponse {
    overall: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

impl CoverageEngine {
    /// Build the run summary, preferring provider synthesis when available
    pub(crate) async fn build_summary(
        &self,
        results: &[ItemResult],
        mode: ProcessingMode,
        perspectives: &[String],
        stats: &RunStats,
        cancel: &CancellationToken,
    ) -> Summary {
        let can_synthesize = self.config.synthesize_summary
            && stats.unattempted == 0
            && stats.succeeded > 0
            && !cancel.is_cancelled();

        if can_synthesize {
            match self.synthesize(results, mode, perspectives, cancel).await {
                Ok(summary) => return summary,
                Err(reason) => {
                    tracing::warn!(reason = %reason, "Overview synthesis failed, using template summary");
                }
            }
        }

        template_summary(stats, mode, perspectives.len(), results.len() + stats.unattempted)
    }

    async fn synthesize(
        &self,
        results: &[ItemResult],
        mode: ProcessingMode,
        perspectives: &[String],
        cancel: &CancellationToken,
    ) -> Result<Summary, String> {
        let mut sections = Vec::new();
        for result in results {
            if let ItemResult::Success {
                title, structured, ..
            } = result
            {
                sections.push(format!("## {title}\n{structured}"));
            }
        }
        let payload = sections.join("\n\n");

        let descriptor = GenerationDescriptor {
            mode,
            perspectives: perspectives.to_vec(),
            shape: ResponseShape::Overview,
        };

        let response = self
            .provider
            .generate(&payload, &descriptor, cancel)
            .await
            .map_err(|e| e.message)?;

        let parsed: OverviewResponse =
            serde_json::from_str(&response).map_err(|e| format!("malformed overview: {e}"))?;

        if parsed.overall.trim().is_empty() {
            return Err("overview paragraph was empty".to_string());
        }

        Ok(Summary {
            overall: parsed.overall,
            strengths: parsed.strengths,
            issues: parsed.issues,
            recommendations: parsed.recommendations,
            provenance: SummaryProvenance::Synthesized,
        })
    }
}

/// Deterministic summary derived from run counters
///
/// Always available; used when synthesis is disabled, fails, or the run was
/// cancelled. Phrasing is keyed by processing mode and, for blended runs,
/// the number of contributing perspectives.
pub(crate) fn template_summary(
    stats: &RunStats,
    mode: ProcessingMode,
    perspective_count: usize,
    total_items: usize,
) -> Summary {
    let overall = if stats.unattempted > 0 {
        format!(
            "Coverage stopped early: {} of {} sections completed, {} never attempted. \
             The results below cover only the completed sections.",
            total_items - stats.unattempted,
            total_items,
            stats.unattempted
        )
    } else {
        match mode {
            ProcessingMode::Single | ProcessingMode::Chunked => format!(
                "Coverage complete: {} of {} sections analyzed successfully.",
                stats.succeeded, total_items
            ),
            ProcessingMode::Blended => format!(
                "Blended coverage complete: {} of {} sections analyzed successfully, \
                 merging {} perspectives per section.",
                stats.succeeded, total_items, perspective_count
            ),
        }
    };

    let mut strengths = Vec::new();
    if stats.succeeded > 0 {
        strengths.push(format!(
            "{} section{} received full analysis, available in the per-section results.",
            stats.succeeded,
            plural(stats.succeeded)
        ));
    }

    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if stats.rate_limited_fallbacks > 0 {
        issues.push(format!(
            "{} section{} could not be analyzed because the provider was rate limited.",
            stats.rate_limited_fallbacks,
            plural(stats.rate_limited_fallbacks)
        ));
        recommendations
            .push("Retry the incomplete sections during off-peak hours.".to_string());
    }

    if stats.permanently_failed > 0 {
        issues.push(format!(
            "{} section{} failed permanently; see the per-section placeholders for detail.",
            stats.permanently_failed,
            plural(stats.permanently_failed)
        ));
        recommendations.push(
            "Split oversized sections into smaller parts before re-running.".to_string(),
        );
    }

    if stats.unattempted > 0 {
        recommendations.push(format!(
            "Re-run to analyze the {} remaining section{}.",
            stats.unattempted,
            plural(stats.unattempted)
        ));
    }

    Summary {
        overall,
        strengths,
        issues,
        recommendations,
        provenance: SummaryProvenance::Template,
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
