//! Index template boundary contract.

use crate::document_store::IndexTemplate;
use rally_metrics_shared::Result;

/// Supplies the template applied when a yearly index is created.
pub trait IndexTemplateProvider: Send + Sync {
    /// Load the template.
    fn template(&self) -> Result<IndexTemplate>;
}
