//! Sample manifest and its identifier index
//!
//! A manifest lists the samples of one experiment and the files collected
//! for each. Only collected samples take part in control resolution and
//! experimental data extraction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Substring of a file path that marks a bead-control sample
pub const BEAD_CONTROL_MARKER: &str = "beadcontrol";

/// Errors that can occur while loading a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file attached to a sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Absolute path of the file on its storage system
    #[serde(rename = "file", alias = "path")]
    pub path: String,
}

impl FileRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// One manifest entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "sample")]
    pub identifier: String,
    #[serde(default)]
    pub collected: bool,
    #[serde(default)]
    pub files: Vec<FileRef>,
}

impl Sample {
    pub fn new(identifier: impl Into<String>, collected: bool) -> Self {
        Self {
            identifier: identifier.into(),
            collected,
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files.push(FileRef::new(path));
        self
    }

    /// True if the first attached file is a bead-control acquisition
    pub fn is_bead_control(&self) -> bool {
        self.files
            .first()
            .map(|f| f.path.contains(BEAD_CONTROL_MARKER))
            .unwrap_or(false)
    }
}

/// The manifest document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub samples: Vec<Sample>,
    /// URI of the experiment plan
    pub plan: String,
    /// URI of the instrument configuration document
    pub instrument_configuration: String,
    /// Persistent identifier of this manifest
    #[serde(rename = "rdf:about")]
    pub about: String,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Reduce a path to its `parent/filename` form.
///
/// `/products/v1/run_1/sample.fcs` becomes `run_1/sample.fcs`; a bare
/// filename is returned unchanged.
pub fn file_and_parent(path: &str) -> String {
    let mut parts = path.rsplitn(3, '/');
    let file = parts.next().unwrap_or_default();
    match parts.next() {
        Some(parent) if !parent.is_empty() => format!("{}/{}", parent, file),
        _ => file.to_string(),
    }
}

/// A manifest indexed by sample identifier.
#[derive(Debug, Clone)]
pub struct ManifestIndex {
    manifest: Manifest,
    /// First sample entry per identifier
    first_entry: HashMap<String, usize>,
    /// First collected sample entry per identifier
    first_collected: HashMap<String, usize>,
}

impl ManifestIndex {
    pub fn new(manifest: Manifest) -> Self {
        let mut first_entry = HashMap::new();
        let mut first_collected = HashMap::new();
        for (i, sample) in manifest.samples.iter().enumerate() {
            first_entry.entry(sample.identifier.clone()).or_insert(i);
            if sample.collected {
                first_collected.entry(sample.identifier.clone()).or_insert(i);
            }
        }
        Self {
            manifest,
            first_entry,
            first_collected,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Collected samples in manifest order
    pub fn collected_samples(&self) -> impl Iterator<Item = &Sample> {
        self.manifest.samples.iter().filter(|s| s.collected)
    }

    pub fn is_collected(&self, identifier: &str) -> bool {
        self.first_collected.contains_key(identifier)
    }

    /// `parent/filename` of the first file of the first collected sample
    /// with this identifier.
    pub fn files_for(&self, identifier: &str) -> Option<String> {
        let index = *self.first_collected.get(identifier)?;
        self.manifest.samples[index]
            .files
            .first()
            .map(|f| file_and_parent(&f.path))
    }

    /// True if the identifier's first file path carries the bead-control
    /// marker, whether or not the sample was collected.
    pub fn is_control_sample(&self, identifier: &str) -> bool {
        self.first_entry
            .get(identifier)
            .map(|&i| self.manifest.samples[i].is_bead_control())
            .unwrap_or(false)
    }
}
