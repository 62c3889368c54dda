//! Experimental data records
//!
//! One record per file of every collected sample that is not a bead
//! control. The `sample` field comes from the active plan source.

use crate::manifest::{file_and_parent, ManifestIndex};
use crate::plan::PlanSource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sample value for samples whose plan metadata is incomplete
pub const UNDEFINED_SAMPLE: &str = "undefined";

/// A data file and the sample it was acquired from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExperimentalRecord {
    /// `parent/filename` of the data file
    pub file: String,
    /// Sample URI, or `"undefined"`
    pub sample: String,
}

pub struct SampleMapper<'a> {
    index: &'a ManifestIndex,
    plan: &'a dyn PlanSource,
}

impl<'a> SampleMapper<'a> {
    pub fn new(index: &'a ManifestIndex, plan: &'a dyn PlanSource) -> Self {
        Self { index, plan }
    }

    /// Records in manifest order.
    pub fn records(&self) -> Vec<ExperimentalRecord> {
        let mut records = Vec::new();
        for sample in self.index.collected_samples() {
            if sample.is_bead_control() {
                tracing::debug!(sample = %sample.identifier, "skipping bead control");
                continue;
            }
            let uri = self.plan.sample_uri(&sample.identifier);
            records.extend(sample.files.iter().map(|f| ExperimentalRecord {
                file: file_and_parent(&f.path),
                sample: uri.clone(),
            }));
        }

        let undefined = records.iter().filter(|r| r.sample == UNDEFINED_SAMPLE).count();
        if undefined > 0 {
            tracing::warn!(undefined, total = records.len(), "records without a resolvable sample URI");
        }
        records
    }
}
