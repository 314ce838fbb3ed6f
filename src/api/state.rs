//! Application state for the API server

use crate::extractor::Extractor;
use crate::resolver::MetadataResolver;
use crate::streaming::StreamOrchestrator;
use crate::Config;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request. Holds no per-request data: every extraction
/// request owns its own process handle.
#[derive(Clone)]
pub struct AppState {
    /// Configuration (read-only at runtime)
    pub config: Arc<Config>,

    /// Metadata lookups (`info`, `trending`, title fallback)
    pub resolver: MetadataResolver,

    /// Download streams
    pub orchestrator: StreamOrchestrator,

    /// Tool launcher shared by both, kept for health reporting
    pub extractor: Extractor,
}

impl AppState {
    /// Create a new AppState, resolving tool locations once
    pub fn new(config: Arc<Config>) -> Self {
        let extractor = Extractor::new(config.clone());
        Self {
            config,
            resolver: MetadataResolver::new(extractor.clone()),
            orchestrator: StreamOrchestrator::new(extractor.clone()),
            extractor,
        }
    }
}
