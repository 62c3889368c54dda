//! Control query results and plan errors

use crate::catalog::CatalogError;
use crate::remote::GraphError;
use thiserror::Error;

/// Bead batch assumed when a plan names a bead model but no batch
pub const DEFAULT_BEAD_BATCH: &str = "Lot AJ02";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("graph query failed: {0}")]
    Graph(#[from] GraphError),

    #[error("channel matching failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("no bead sample found for plan {0}")]
    NoBeadSample(String),

    #[error("bead query result has no ?{var} binding")]
    MissingVariable { var: &'static str },

    #[error("plan URI cannot be used in a query: {0}")]
    InvalidPlanUri(String),
}

/// Result type for plan operations
pub type PlanResult<T> = Result<T, PlanError>;

/// The bead calibration sample named by a plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeadReference {
    /// Sample identifier; `None` when the plan names no bead sample
    pub sample: Option<String>,
    pub model: String,
    pub batch: String,
}

/// The positive control chosen for one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelControl {
    pub channel: String,
    /// Sample identifier; `None` leaves the channel without a calibration file
    pub sample: Option<String>,
}

impl ChannelControl {
    pub fn new(channel: impl Into<String>, sample: Option<String>) -> Self {
        Self {
            channel: channel.into(),
            sample,
        }
    }
}

/// Control sample identifiers resolved from a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlQuery {
    pub bead: BeadReference,
    /// Blank/negative control candidates, in preference order
    pub blank_candidates: Vec<String>,
    /// One entry per retained channel, in catalog order. Channels absent
    /// here are dropped from all documents.
    pub positive_controls: Vec<ChannelControl>,
}
