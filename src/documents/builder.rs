use super::types::*;
use super::writer::to_sorted_pretty;
use super::{DocumentError, DocumentKind};
use crate::catalog::ChannelCatalog;
use crate::controls::ResolvedControlSet;
use crate::samples::ExperimentalRecord;
use std::path::{Path, PathBuf};

/// URIs of external resources the documents point at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentLinks {
    /// Storage URI of the instrument configuration
    pub cytometer_configuration: String,
    /// `rdf:about` of the source manifest
    pub manifest_about: String,
}

/// The four documents of one run
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSet {
    pub experimental_data: ExperimentalData,
    pub process_control_data: ProcessControlData,
    pub color_model_parameters: ColorModelParameters,
    pub analysis_parameters: AnalysisParameters,
}

impl DocumentSet {
    /// Render one document as sorted-key JSON
    pub fn render(&self, kind: DocumentKind) -> Result<String, DocumentError> {
        match kind {
            DocumentKind::ExperimentalData => to_sorted_pretty(&self.experimental_data),
            DocumentKind::ProcessControlData => to_sorted_pretty(&self.process_control_data),
            DocumentKind::ColorModelParameters => to_sorted_pretty(&self.color_model_parameters),
            DocumentKind::AnalysisParameters => to_sorted_pretty(&self.analysis_parameters),
        }
    }

    /// Write all documents into `dir` under their standard file names.
    ///
    /// Returns the written paths in `DocumentKind::ALL` order.
    pub async fn write_to(&self, dir: &Path) -> Result<Vec<(DocumentKind, PathBuf)>, DocumentError> {
        let mut written = Vec::with_capacity(DocumentKind::ALL.len());
        for kind in DocumentKind::ALL {
            let path = dir.join(kind.file_name());
            let contents = self.render(kind)?;
            tokio::fs::write(&path, contents)
                .await
                .map_err(|source| DocumentError::Io {
                    path: path.clone(),
                    source,
                })?;
            tracing::debug!(path = %path.display(), "wrote document");
            written.push((kind, path));
        }
        Ok(written)
    }
}

/// Assembles the output documents from resolved run data.
pub struct DocumentBuilder {
    links: DocumentLinks,
}

impl DocumentBuilder {
    pub fn new(links: DocumentLinks) -> Self {
        Self { links }
    }

    /// Build all four documents.
    ///
    /// Per-channel sections follow `catalog` order. Pass the catalog already
    /// restricted to channels with a control slot.
    pub fn build(
        &self,
        catalog: &ChannelCatalog,
        controls: &ResolvedControlSet,
        records: &[ExperimentalRecord],
    ) -> DocumentSet {
        DocumentSet {
            experimental_data: self.experimental_data(records),
            process_control_data: self.process_control_data(catalog, controls),
            color_model_parameters: Self::color_model_parameters(catalog),
            analysis_parameters: AnalysisParameters {
                tasbe_analysis_parameters: Analysis::default(),
            },
        }
    }

    fn experimental_data(&self, records: &[ExperimentalRecord]) -> ExperimentalData {
        ExperimentalData {
            tasbe_experimental_data: ExperimentalSamples {
                samples: records.to_vec(),
                about: self.links.manifest_about.clone(),
            },
        }
    }

    fn process_control_data(&self, catalog: &ChannelCatalog, controls: &ResolvedControlSet) -> ProcessControlData {
        let channels = catalog
            .names()
            .map(|name| ChannelCalibration {
                name: name.to_string(),
                calibration_file: controls
                    .positive_control_files
                    .get(name)
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();

        ProcessControlData {
            tasbe_process_control_data: ProcessControls {
                about: PLACEHOLDER.to_string(),
                tasbe_version: TASBE_VERSION.to_string(),
                cyometer_configuration: self.links.cytometer_configuration.clone(),
                bead_file: controls.bead_file.clone(),
                tasbe_config: BeadConfig {
                    beads: BeadSettings {
                        bead_model: controls.bead_model.clone(),
                        bead_batch: controls.bead_batch.clone(),
                    },
                },
                blank_file: controls.blank_file.clone(),
                channels,
                cross_file_pairs: Vec::new(),
            },
        }
    }

    fn color_model_parameters(catalog: &ChannelCatalog) -> ColorModelParameters {
        let channel_parameters = catalog
            .names()
            .map(|name| ChannelParameters {
                name: name.to_string(),
                species: SPECIES_URI.to_string(),
                label: SPECIES_LABEL.to_string(),
                min: 2,
                chart_color: "y".to_string(),
            })
            .collect();

        ColorModelParameters {
            tasbe_color_model_parameters: ColorModel {
                about: PLACEHOLDER.to_string(),
                plot_config: ColorModelPlots {
                    heatmap_plottype: "contour".to_string(),
                    plots: PlotPath {
                        plot_path: "plots".to_string(),
                    },
                },
                tasbe_version: TASBE_VERSION.to_string(),
                process_control_data: PLACEHOLDER.to_string(),
                channel_parameters,
                tasbe_config: ProcessingConfig {
                    gating: Gating {
                        kind: "auto".to_string(),
                        k_components: 2,
                    },
                    autofluorescence: MethodChoice::placeholder(),
                    compensation: MethodChoice::placeholder(),
                    beads: MethodChoice::placeholder(),
                },
                bead_min: 2,
                erf_channel_name: catalog.names().next().unwrap_or_default().to_string(),
                translation_plot: false,
                noise_plot: false,
            },
        }
    }
}
