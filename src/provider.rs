//! Analysis provider interface
//!
//! The engine treats the analysis provider as a black box behind one trait:
//! it accepts a text payload and a descriptor, and either returns generated
//! text or throws a [`ProviderError`]. Implementations should honor the
//! cancellation token mid-call when their transport supports aborting; the
//! engine tolerates providers that cannot and relies on its own interruptible
//! waits instead.

use crate::error::ProviderError;
use crate::types::ProcessingMode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Shape of the response a generation request asks for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseShape {
    /// Labelled sections (STRENGTHS / ISSUES / etc.)
    Structured,
    /// Flowing prose
    Freeform,
    /// Small JSON object with an overview paragraph and three text lists
    Overview,
}

/// Descriptor accompanying a generation request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationDescriptor {
    /// Processing mode the request belongs to
    pub mode: ProcessingMode,

    /// Perspective names the response should reflect (empty for a single
    /// default perspective; multiple entries only in blended mode)
    pub perspectives: Vec<String>,

    /// Requested response shape
    pub shape: ResponseShape,
}

impl GenerationDescriptor {
    /// Descriptor for a single-perspective request
    pub fn single(mode: ProcessingMode, shape: ResponseShape) -> Self {
        Self {
            mode,
            perspectives: Vec::new(),
            shape,
        }
    }

    /// Descriptor for a blended, multi-perspective request
    pub fn blended(perspectives: Vec<String>, shape: ResponseShape) -> Self {
        Self {
            mode: ProcessingMode::Blended,
            perspectives,
            shape,
        }
    }
}

/// External analysis provider
///
/// The engine depends only on this shape. A throttling provider should embed
/// a recognizable "try again in Ns" hint in the error message for the backoff
/// fast path; the engine still functions (with generic exponential backoff)
/// when that hint is absent.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Generate text for a payload
    ///
    /// Implementations should return promptly with an error when `cancel`
    /// fires, if their transport can abort an in-flight call.
    async fn generate(
        &self,
        payload: &str,
        descriptor: &GenerationDescriptor,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError>;
}
