//! Cytoplan: flow-cytometry analysis configuration synthesis
//!
//! Reconciles a sample manifest, a cytometer channel catalog and an
//! experiment plan into the four configuration documents of a TASBE flow
//! analysis job, then submits the job.
//!
//! # Core Concepts
//!
//! - **Channel catalog**: cytometer channels, matched to control samples by
//!   excitation wavelength and emission filter
//! - **Plan source**: names the bead, blank and positive control samples,
//!   either from an inline plan document or from graph queries
//! - **Documents**: typed, sorted-key JSON consumed by the analysis job
//!
//! # Example
//!
//! ```
//! use cytoplan::{Channel, ChannelCatalog, ChannelSpec, EmissionFilter};
//!
//! let catalog = ChannelCatalog::new(vec![
//!     Channel::new("FITC-A", 488, EmissionFilter::Bandpass { center: 530, width: 30 }),
//!     Channel::new("PE-A", 561, EmissionFilter::Bandpass { center: 582, width: 15 }),
//! ])
//! .unwrap();
//!
//! let spec = ChannelSpec::bandpass(488, 530, 30);
//! assert_eq!(catalog.match_channel(&spec).unwrap(), Some("FITC-A"));
//! ```

pub mod catalog;
pub mod config;
pub mod controls;
pub mod documents;
pub mod job;
pub mod manifest;
pub mod pipeline;
pub mod plan;
pub mod remote;
pub mod samples;

pub use catalog::{CatalogError, Channel, ChannelCatalog, ChannelSpec, EmissionFilter, MatchMode};
pub use config::{ConfigError, PlanStrategy, Settings};
pub use controls::{ControlResolver, ResolvedControlSet};
pub use documents::{DocumentBuilder, DocumentError, DocumentKind, DocumentLinks, DocumentSet};
pub use job::{JobSpec, JobSpecAssembler, Notification};
pub use manifest::{Manifest, ManifestError, ManifestIndex, Sample};
pub use pipeline::{synthesize, Pipeline, PipelineError, RunContext, RunReport, Synthesis};
pub use plan::{ControlQuery, GraphPlanSource, InlinePlanSource, PlanError, PlanSource};
pub use remote::{GraphClient, JobSubmitter, ObjectStore, StorageUri};
pub use samples::{ExperimentalRecord, SampleMapper, UNDEFINED_SAMPLE};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
