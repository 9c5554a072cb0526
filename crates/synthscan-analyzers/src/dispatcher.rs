//! Capability-based strategy dispatch
//!
//! The dispatcher holds an ordered, fixed list of strategies and routes each
//! request to the first one registered for the requested media type. Earlier
//! registrations take priority over later ones with the same capability.

use crate::strategy::{erase, AnalysisStrategy, ErasedStrategy, MediaPayload};
use std::sync::Arc;
use synthscan_core::{AnalysisResult, MediaCapability, MetadataRecord};
use tracing::{debug, info};

/// Routes analysis requests to strategies by media capability
#[derive(Clone)]
pub struct Dispatcher {
    strategies: Arc<[Arc<dyn ErasedStrategy>]>,
}

impl Dispatcher {
    /// Start building a dispatcher
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// First strategy registered for a capability
    pub fn strategy_for(&self, capability: MediaCapability) -> Option<&Arc<dyn ErasedStrategy>> {
        self.strategies
            .iter()
            .find(|strategy| strategy.capability() == capability)
    }

    /// Registered capabilities, in priority order (duplicates included)
    pub fn capabilities(&self) -> Vec<MediaCapability> {
        self.strategies.iter().map(|s| s.capability()).collect()
    }

    /// Number of registered strategies
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether no strategies are registered
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Analyse a payload with the strategy for `capability`.
    ///
    /// Returns `None` when no strategy handles the capability, or when the
    /// selected strategy cannot use the payload's type.
    pub async fn analyze(
        &self,
        capability: MediaCapability,
        media: &MediaPayload,
        metadata: &MetadataRecord,
    ) -> Option<AnalysisResult> {
        let Some(strategy) = self.strategy_for(capability) else {
            debug!("No strategy registered for {} media", capability);
            metrics::counter!("synthscan_unhandled_requests_total").increment(1);
            return None;
        };

        debug!("Dispatching {} request to '{}'", capability, strategy.name());
        strategy.analyze_any(media, metadata).await
    }

    /// Analyse an image payload
    pub async fn analyze_image(
        &self,
        media: &MediaPayload,
        metadata: &MetadataRecord,
    ) -> Option<AnalysisResult> {
        self.analyze(MediaCapability::Image, media, metadata).await
    }

    /// Run a request in the background and deliver its outcome to `callback`.
    ///
    /// The callback is invoked exactly once, on a Tokio worker, with the same
    /// value [`analyze`](Self::analyze) would have produced. Must be called
    /// from within a Tokio runtime.
    pub fn analyze_with_callback<M, F>(
        &self,
        capability: MediaCapability,
        media: M,
        metadata: MetadataRecord,
        callback: F,
    ) -> tokio::task::JoinHandle<()>
    where
        M: Send + Sync + 'static,
        F: FnOnce(Option<AnalysisResult>) + Send + 'static,
    {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let result = dispatcher.analyze(capability, &media, &metadata).await;
            callback(result);
        })
    }
}

/// Builder collecting strategies in priority order
#[derive(Default)]
pub struct DispatcherBuilder {
    strategies: Vec<Arc<dyn ErasedStrategy>>,
}

impl DispatcherBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy after all previously registered ones
    pub fn strategy<S>(mut self, strategy: S) -> Self
    where
        S: AnalysisStrategy + 'static,
    {
        self.strategies.push(erase(strategy));
        self
    }

    /// Register an already type-erased strategy
    pub fn erased(mut self, strategy: Arc<dyn ErasedStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Freeze the strategy list
    pub fn build(self) -> Dispatcher {
        info!("Dispatcher initialized with {} strategies", self.strategies.len());
        Dispatcher {
            strategies: self.strategies.into(),
        }
    }
}
