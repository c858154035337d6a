//! Document store client construction.

use crate::document_store::DocumentStorePort;
use rally_metrics_shared::Result;
use std::sync::Arc;

/// Creates the document store client a metrics store owns for its lifetime.
pub trait ClientFactory: Send + Sync {
    /// Build a connected client.
    fn create(&self) -> Result<Arc<dyn DocumentStorePort>>;
}
