//! Output document shapes
//!
//! Field names follow the downstream analysis schema exactly, including its
//! mixed casing.

use crate::samples::ExperimentalRecord;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Interface version advertised by every document
pub const TASBE_VERSION: &str = "https://github.com/SD2E/reactors-etl/releases/tag/2";

/// Value of identifiers this pipeline does not resolve
pub const PLACEHOLDER: &str = "placeholder";

pub const SPECIES_URI: &str = "https://www.ncbi.nlm.nih.gov/protein/AMZ00011.1";
pub const SPECIES_LABEL: &str = "GFP";

// ---------------------------------------------------------------------------
// experimental_data.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExperimentalData {
    pub tasbe_experimental_data: ExperimentalSamples,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExperimentalSamples {
    pub samples: Vec<ExperimentalRecord>,
    /// Persistent identifier of the source manifest
    #[serde(rename = "rdf:about")]
    pub about: String,
}

// ---------------------------------------------------------------------------
// process_control_data.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessControlData {
    pub tasbe_process_control_data: ProcessControls,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessControls {
    #[serde(rename = "rdf:about")]
    pub about: String,
    pub tasbe_version: String,
    /// URI of the instrument configuration. The key spelling is fixed by
    /// the consumer.
    pub cyometer_configuration: String,
    pub bead_file: String,
    #[serde(rename = "TASBEConfig")]
    pub tasbe_config: BeadConfig,
    pub blank_file: String,
    pub channels: Vec<ChannelCalibration>,
    /// Always empty; cross-channel calibration is not produced
    pub cross_file_pairs: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BeadConfig {
    pub beads: BeadSettings,
}

/// Bead catalog entry used for unit calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BeadSettings {
    pub bead_model: String,
    pub bead_batch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChannelCalibration {
    pub name: String,
    /// Single positive control file, or empty
    pub calibration_file: String,
}

// ---------------------------------------------------------------------------
// color_model_parameters.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColorModelParameters {
    pub tasbe_color_model_parameters: ColorModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColorModel {
    #[serde(rename = "rdf:about")]
    pub about: String,
    #[serde(rename = "TASBEConfig")]
    pub plot_config: ColorModelPlots,
    pub tasbe_version: String,
    pub process_control_data: String,
    pub channel_parameters: Vec<ChannelParameters>,
    pub tasbe_config: ProcessingConfig,
    pub bead_min: u32,
    /// Channel used for unit calibration
    #[serde(rename = "ERF_channel_name")]
    pub erf_channel_name: String,
    pub translation_plot: bool,
    pub noise_plot: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColorModelPlots {
    pub heatmap_plottype: String,
    pub plots: PlotPath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlotPath {
    pub plot_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChannelParameters {
    pub name: String,
    pub species: String,
    pub label: String,
    pub min: u32,
    pub chart_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProcessingConfig {
    pub gating: Gating,
    pub autofluorescence: MethodChoice,
    pub compensation: MethodChoice,
    pub beads: MethodChoice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Gating {
    #[serde(rename = "type")]
    pub kind: String,
    pub k_components: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MethodChoice {
    #[serde(rename = "type")]
    pub kind: String,
}

impl MethodChoice {
    pub fn placeholder() -> Self {
        Self {
            kind: PLACEHOLDER.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// analysis_parameters.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisParameters {
    pub tasbe_analysis_parameters: Analysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Analysis {
    #[serde(rename = "rdf:about")]
    pub about: String,
    pub tasbe_version: String,
    pub color_model: String,
    pub experimental_data: String,
    pub replicate_groups: Vec<ReplicateGroup>,
    #[serde(rename = "TASBEConfig")]
    pub tasbe_config: AnalysisConfig,
    pub output: OutputOptions,
    pub channels: Vec<String>,
    pub additional_outputs: Vec<String>,
    pub min_valid_count: u32,
    pub pem_drop_threshold: u32,
    pub bin_min: u32,
    pub bin_max: u32,
    pub bin_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReplicateGroup {
    pub label: String,
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    pub flow: FlowOutput,
    #[serde(rename = "OutputSettings")]
    pub output_settings: OutputSettings,
    pub output_directory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowOutput {
    pub output_point_cloud: bool,
    pub point_cloud_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct OutputSettings {
    pub stem_name: String,
    pub fixed_input_axis: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutputOptions {
    pub title: String,
    pub plots: bool,
    pub plots_folder: String,
    pub file: String,
    pub quicklook: bool,
    pub quicklook_folder: String,
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            about: PLACEHOLDER.to_string(),
            tasbe_version: TASBE_VERSION.to_string(),
            color_model: PLACEHOLDER.to_string(),
            experimental_data: PLACEHOLDER.to_string(),
            replicate_groups: vec![ReplicateGroup {
                label: String::new(),
                samples: Vec::new(),
            }],
            tasbe_config: AnalysisConfig {
                flow: FlowOutput {
                    output_point_cloud: true,
                    point_cloud_path: "output".to_string(),
                },
                output_settings: OutputSettings {
                    stem_name: "plots".to_string(),
                    fixed_input_axis: false,
                },
                output_directory: "output".to_string(),
            },
            output: OutputOptions {
                title: PLACEHOLDER.to_string(),
                plots: true,
                plots_folder: "plots".to_string(),
                file: "./output/output.csv".to_string(),
                quicklook: true,
                quicklook_folder: "./output/quicklook".to_string(),
            },
            channels: vec![SPECIES_LABEL.to_string()],
            additional_outputs: ["histogram", "point_clouds", "bayesdb_files"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_valid_count: 100,
            pem_drop_threshold: 5,
            bin_min: 6,
            bin_max: 10,
            bin_width: 0.1,
        }
    }
}
