//! PlanSource trait — the contract both plan strategies implement

use super::types::{ControlQuery, PlanResult};
use crate::catalog::ChannelCatalog;
use async_trait::async_trait;

/// A source of control-sample metadata for one experiment plan.
#[async_trait]
pub trait PlanSource: Send + Sync {
    /// Strategy name, for logs
    fn strategy(&self) -> &'static str;

    /// Resolve bead, blank and positive-control sample identifiers.
    ///
    /// Lookup misses are reported as absent values in the result, not as
    /// errors.
    async fn resolve_controls(&self, catalog: &ChannelCatalog) -> PlanResult<ControlQuery>;

    /// The `sample` value recorded for a manifest sample in the
    /// experimental data document.
    fn sample_uri(&self, sample_id: &str) -> String;
}
