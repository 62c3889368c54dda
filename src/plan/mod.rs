//! Experiment plan sources
//!
//! A plan source names the control samples of an experiment: the bead
//! calibration sample, blank/negative control candidates and one positive
//! control per channel. Two strategies implement the same `PlanSource`
//! contract:
//!
//! - `InlinePlanSource` reads the plan document referenced by the manifest
//! - `GraphPlanSource` queries the knowledge store about the plan URI
//!
//! Exactly one source is active per run; shared stages only see the trait.

mod graph;
mod inline;
pub mod queries;
mod traits;
mod types;

pub use graph::GraphPlanSource;
pub use inline::{ExperimentPlan, ExperimentState, InlinePlanSource, Strain, COMBINED_STRAINS};
pub use traits::PlanSource;
pub use types::{BeadReference, ChannelControl, ControlQuery, PlanError, PlanResult, DEFAULT_BEAD_BATCH};
