//! Control resolution
//!
//! Turns the control sample identifiers named by a plan into file
//! references from the manifest. A lookup miss leaves an empty string for
//! that field; nothing here fails.

use crate::catalog::ChannelCatalog;
use crate::manifest::ManifestIndex;
use crate::plan::ControlQuery;
use std::collections::BTreeMap;

/// Control files for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedControlSet {
    pub bead_model: String,
    pub bead_batch: String,
    /// `parent/filename` of the bead sample, or empty
    pub bead_file: String,
    /// `parent/filename` of the first collected blank candidate, or empty
    pub blank_file: String,
    /// Channel name → `parent/filename` of its positive control, or empty.
    /// Every key names a catalog channel.
    pub positive_control_files: BTreeMap<String, String>,
}

impl ResolvedControlSet {
    /// The catalog restricted to channels that have a positive control slot
    pub fn effective_catalog(&self, catalog: &ChannelCatalog) -> ChannelCatalog {
        catalog.retain_named(self.positive_control_files.keys().map(String::as_str))
    }
}

/// Resolves control identifiers against a manifest.
pub struct ControlResolver<'a> {
    index: &'a ManifestIndex,
}

impl<'a> ControlResolver<'a> {
    pub fn new(index: &'a ManifestIndex) -> Self {
        Self { index }
    }

    fn file_or_empty(&self, sample: Option<&str>) -> String {
        sample.and_then(|s| self.index.files_for(s)).unwrap_or_default()
    }

    pub fn resolve(&self, query: &ControlQuery, catalog: &ChannelCatalog) -> ResolvedControlSet {
        let bead_file = self.file_or_empty(query.bead.sample.as_deref());
        if bead_file.is_empty() {
            tracing::warn!(sample = ?query.bead.sample, "no collected file for bead sample");
        }

        let blank_file = query
            .blank_candidates
            .iter()
            .find(|candidate| self.index.is_collected(candidate))
            .and_then(|candidate| self.index.files_for(candidate))
            .unwrap_or_default();
        if blank_file.is_empty() {
            tracing::warn!(candidates = query.blank_candidates.len(), "no collected blank sample");
        }

        let mut positive_control_files = BTreeMap::new();
        for control in &query.positive_controls {
            if !catalog.contains(&control.channel) {
                tracing::warn!(channel = %control.channel, "positive control names a channel missing from the catalog; skipping");
                continue;
            }
            let file = self.file_or_empty(control.sample.as_deref());
            if control.sample.is_some() && file.is_empty() {
                tracing::debug!(channel = %control.channel, sample = ?control.sample, "positive control sample has no collected file");
            }
            positive_control_files.insert(control.channel.clone(), file);
        }

        ResolvedControlSet {
            bead_model: query.bead.model.clone(),
            bead_batch: query.bead.batch.clone(),
            bead_file,
            blank_file,
            positive_control_files,
        }
    }
}
