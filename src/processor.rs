//! One provider-call wrapper shared by all three processing modes
//!
//! Single, chunked, and blended processing share this code path entirely;
//! the mode only changes the request descriptors (and, upstream, the
//! progress-message templates). Provider errors surface unmodified so the
//! retry controller can classify them.

use crate::error::ProviderError;
use crate::provider::{AnalysisProvider, GenerationDescriptor, ResponseShape};
use crate::types::{AnalysisSource, ProcessingMode, WorkItem};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Successful analysis of one work item, before it becomes an `ItemResult`
#[derive(Clone, Debug)]
pub(crate) struct SectionAnalysis {
    /// Structured rendering with labelled sections
    pub structured: String,
    /// Freeform prose rendering
    pub freeform: String,
    /// Category map extracted from the structured rendering
    pub categories: BTreeMap<String, String>,
    /// Single or blended origin
    pub source: AnalysisSource,
    /// Contributing perspective names (blended only)
    pub perspectives: Vec<String>,
}

/// Wraps the external provider calls for one work item
pub(crate) struct ItemProcessor {
    provider: Arc<dyn AnalysisProvider>,
}

impl ItemProcessor {
    pub(crate) fn new(provider: Arc<dyn AnalysisProvider>) -> Self {
        Self { provider }
    }

    /// Run both renderings for one item in the given mode
    ///
    /// The token is checked before each provider call and passed into the
    /// call itself so an abort-capable provider can stop mid-generation.
    /// Errors come back unwrapped for classification upstream.
    pub(crate) async fn process(
        &self,
        item: &WorkItem,
        mode: ProcessingMode,
        perspectives: &[String],
        cancel: &CancellationToken,
    ) -> Result<SectionAnalysis, ProviderError> {
        let (structured_desc, freeform_desc, source) = match mode {
            ProcessingMode::Single | ProcessingMode::Chunked => (
                GenerationDescriptor::single(mode, ResponseShape::Structured),
                GenerationDescriptor::single(mode, ResponseShape::Freeform),
                AnalysisSource::Single,
            ),
            ProcessingMode::Blended => (
                GenerationDescriptor::blended(perspectives.to_vec(), ResponseShape::Structured),
                GenerationDescriptor::blended(perspectives.to_vec(), ResponseShape::Freeform),
                AnalysisSource::Blended,
            ),
        };

        let payload = build_payload(item);

        if cancel.is_cancelled() {
            return Err(ProviderError::cancelled());
        }
        let structured = self
            .provider
            .generate(&payload, &structured_desc, cancel)
            .await?;

        if cancel.is_cancelled() {
            return Err(ProviderError::cancelled());
        }
        let freeform = self
            .provider
            .generate(&payload, &freeform_desc, cancel)
            .await?;

        let categories = parse_categories(&structured);

        Ok(SectionAnalysis {
            structured,
            freeform,
            categories,
            source,
            perspectives: if source == AnalysisSource::Blended {
                perspectives.to_vec()
            } else {
                Vec::new()
            },
        })
    }
}

/// Format the provider payload for a work item
///
/// The title and participant list give the provider the context the section
/// text alone lacks.
fn build_payload(item: &WorkItem) -> String {
    if item.participants.is_empty() {
        format!("Section: {}\n\n{}", item.title, item.payload)
    } else {
        format!(
            "Section: {}\nParticipants: {}\n\n{}",
            item.title,
            item.participants.join(", "),
            item.payload
        )
    }
}

/// Extract the category map from a structured rendering
///
/// Headings are lines of the form `NAME:` (all caps, possibly multi-word);
/// each heading's body runs until the next heading. Text before the first
/// heading is ignored.
fn parse_categories(structured: &str) -> BTreeMap<String, String> {
    let mut categories = BTreeMap::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in structured.lines() {
        let trimmed = line.trim();
        if let Some(heading) = heading_name(trimmed) {
            if let Some((name, body)) = current.take() {
                categories.insert(name, body.join("\n").trim().to_string());
            }
            current = Some((heading, Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }

    if let Some((name, body)) = current {
        categories.insert(name, body.join("\n").trim().to_string());
    }

    categories
}

/// A heading is an all-caps line ending in a colon, e.g. `PACING:`
fn heading_name(line: &str) -> Option<String> {
    let name = line.strip_suffix(':')?;
    if name.is_empty() || name.len() > 40 {
        return None;
    }
    let is_heading = name
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_whitespace() || c == '&' || c == '/');
    if is_heading {
        Some(name.trim().to_string())
    } else {
        None
    }
}
