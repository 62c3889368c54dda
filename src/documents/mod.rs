//! Analysis configuration documents
//!
//! Four fixed-shape JSON documents configure the downstream analysis job:
//! experimental data, process controls, color model parameters and analysis
//! parameters. They are built as typed values and rendered with sorted keys
//! so identical inputs give byte-identical files.

mod builder;
pub mod types;
mod writer;

pub use builder::{DocumentBuilder, DocumentLinks, DocumentSet};
pub use writer::to_sorted_pretty;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("rendered document is not UTF-8: {0}")]
    Encoding(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One of the output documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    ExperimentalData,
    ProcessControlData,
    ColorModelParameters,
    AnalysisParameters,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::ExperimentalData,
        DocumentKind::ProcessControlData,
        DocumentKind::ColorModelParameters,
        DocumentKind::AnalysisParameters,
    ];

    /// Name of the document without extension
    pub fn name(&self) -> &'static str {
        match self {
            DocumentKind::ExperimentalData => "experimental_data",
            DocumentKind::ProcessControlData => "process_control_data",
            DocumentKind::ColorModelParameters => "color_model_parameters",
            DocumentKind::AnalysisParameters => "analysis_parameters",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.name())
    }

    /// Job input the uploaded document is passed as
    pub fn input_role(&self) -> &'static str {
        match self {
            DocumentKind::ExperimentalData => "experimentalData",
            DocumentKind::ProcessControlData => "processControl",
            DocumentKind::ColorModelParameters => "colorModelParameters",
            DocumentKind::AnalysisParameters => "analysisParameters",
        }
    }

    /// JSON Schema of the document
    pub fn schema(&self) -> schemars::Schema {
        match self {
            DocumentKind::ExperimentalData => schemars::schema_for!(types::ExperimentalData),
            DocumentKind::ProcessControlData => schemars::schema_for!(types::ProcessControlData),
            DocumentKind::ColorModelParameters => schemars::schema_for!(types::ColorModelParameters),
            DocumentKind::AnalysisParameters => schemars::schema_for!(types::AnalysisParameters),
        }
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim_end_matches(".json");
        DocumentKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| {
                format!(
                    "unknown document '{}' (expected one of: {})",
                    s,
                    DocumentKind::ALL.map(|k| k.name()).join(", ")
                )
            })
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
