//! Analysis strategy trait and its type-erased form
//!
//! Each strategy analyses one concrete media representation. The dispatcher
//! keeps strategies for different representations in one ordered list, so
//! they are stored behind [`ErasedStrategy`], which checks the payload's
//! concrete type before delegating.

use std::any::{type_name, Any};
use std::sync::Arc;
use synthscan_core::{AnalysisResult, MediaCapability, MetadataRecord};
use tracing::warn;

/// Media payload as seen by the dispatcher
pub type MediaPayload = dyn Any + Send + Sync;

/// Trait for all analysis strategies
#[async_trait::async_trait]
pub trait AnalysisStrategy: Send + Sync {
    /// Concrete media representation this strategy consumes
    type Media: Send + Sync + 'static;

    /// Media type this strategy handles
    fn capability(&self) -> MediaCapability;

    /// Get the strategy name
    fn name(&self) -> &str;

    /// Analyse one asset; `None` means no result could be produced
    async fn analyze(
        &self,
        media: &Self::Media,
        metadata: &MetadataRecord,
    ) -> Option<AnalysisResult>;
}

/// Object-safe view of an [`AnalysisStrategy`] over an untyped payload
#[async_trait::async_trait]
pub trait ErasedStrategy: Send + Sync {
    /// Media type this strategy handles
    fn capability(&self) -> MediaCapability;

    /// Get the strategy name
    fn name(&self) -> &str;

    /// Name of the concrete media type expected
    fn media_type_name(&self) -> &'static str;

    /// Analyse an untyped payload; a payload of the wrong type yields `None`
    async fn analyze_any(
        &self,
        media: &MediaPayload,
        metadata: &MetadataRecord,
    ) -> Option<AnalysisResult>;
}

/// Adapter erasing a strategy's media type
pub struct Erased<S>(pub S);

#[async_trait::async_trait]
impl<S> ErasedStrategy for Erased<S>
where
    S: AnalysisStrategy,
{
    fn capability(&self) -> MediaCapability {
        self.0.capability()
    }

    fn name(&self) -> &str {
        self.0.name()
    }

    fn media_type_name(&self) -> &'static str {
        type_name::<S::Media>()
    }

    async fn analyze_any(
        &self,
        media: &MediaPayload,
        metadata: &MetadataRecord,
    ) -> Option<AnalysisResult> {
        match media.downcast_ref::<S::Media>() {
            Some(media) => self.0.analyze(media, metadata).await,
            None => {
                warn!(
                    "Strategy '{}' expects {} media; payload type does not match",
                    self.0.name(),
                    self.media_type_name()
                );
                metrics::counter!("synthscan_dispatch_mismatches_total").increment(1);
                None
            }
        }
    }
}

/// Erase a strategy's media type for storage in a dispatcher
pub fn erase<S>(strategy: S) -> Arc<dyn ErasedStrategy>
where
    S: AnalysisStrategy + 'static,
{
    Arc::new(Erased(strategy))
}
