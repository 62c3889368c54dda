//! Shared fixtures for pipeline integration tests
//!
//! A small two-channel experiment: one bead sample, one blank, two
//! experimental samples and one sample that was never collected.

#![allow(dead_code)]

use cytoplan::remote::{binding, Binding, MemoryStore};
use cytoplan::{Settings, StorageUri};
use serde_json::{json, Value};

pub const SYSTEM: &str = "data-sd2e-community";
pub const MANIFEST_PATH: &str = "/uploads/tx/exp_1/manifest/manifest.json";
pub const CYTOMETER_URI: &str = "agave://data-sd2e-community/uploads/tx/exp_1/config/cytometer.json";
pub const PLAN_URI: &str = "agave://data-sd2e-community/uploads/tx/exp_1/plan/plan_42.json";
pub const MANIFEST_ABOUT: &str = "https://hub.sd2e.org/user/sd2e/manifest/exp_1/1";
pub const APP_ID: &str = "fcs-etl-0.3.3";

/// Graph-strategy plan IRI and the prefix stripped to form its id
pub const GRAPH_PLAN_URI: &str = "https://hub.sd2e.org/user/sd2e/experiment/plan_42";
pub const GRAPH_PLAN_PREFIX: &str = "https://hub.sd2e.org/user/sd2e/experiment/";
pub const CONFIG_NS: &str = "http://sd2e.org#";

pub fn manifest_uri() -> StorageUri {
    StorageUri::new(SYSTEM, MANIFEST_PATH)
}

pub fn cytometer_configuration() -> Value {
    json!({
        "tasbe_cytometer_configuration": {
            "channels": [
                {"name": "FITC-A", "excitation_wavelength": 488,
                 "emission_filter": {"type": "bandpass", "center": 530, "width": 30}},
                {"name": "PE-A", "excitation_wavelength": "561",
                 "emission_filter": {"type": "bandpass", "center": 582.0, "width": 15}}
            ]
        }
    })
}

/// Manifest with sample identifiers `ids` = [beads, blank, exp_a, exp_b, lost]
pub fn manifest(plan: &str, ids: [&str; 5]) -> Value {
    let [beads, blank, exp_a, exp_b, lost] = ids;
    json!({
        "plan": plan,
        "instrument_configuration": CYTOMETER_URI,
        "rdf:about": MANIFEST_ABOUT,
        "samples": [
            {"sample": beads, "collected": true,
             "files": [{"file": "/uploads/tx/exp_1/raw/beadcontrol_1.fcs"}]},
            {"sample": blank, "collected": true,
             "files": [{"file": "/uploads/tx/exp_1/raw/blank.fcs"}]},
            {"sample": exp_a, "collected": true,
             "files": [{"file": "/uploads/tx/exp_1/raw/a_1.fcs"}, {"file": "/uploads/tx/exp_1/raw/a_2.fcs"}]},
            {"sample": exp_b, "collected": true,
             "files": [{"file": "/uploads/tx/exp_1/raw/b.fcs"}]},
            {"sample": lost, "collected": false,
             "files": [{"file": "/uploads/tx/exp_1/raw/lost.fcs"}]}
        ]
    })
}

pub fn inline_manifest() -> Value {
    manifest(PLAN_URI, ["S-beads", "S-blank", "S-a", "S-b", "S-lost"])
}

pub fn graph_sample(name: &str) -> String {
    format!("https://hub.sd2e.org/user/sd2e/sample/{}", name)
}

pub fn graph_manifest() -> Value {
    let ids = ["beads", "blank", "pc_fitc", "exp_b", "lost"].map(graph_sample);
    manifest(GRAPH_PLAN_URI, ids.each_ref().map(String::as_str))
}

pub fn plan() -> Value {
    json!({
        "initialState": [
            {"Sample Id": "S-beads",
             "Conditions": [{"bead_model": "SpheroTech RCP-30-5A"}]},
            {"Sample Id": "S-blank",
             "Conditions": [{"Is_Blank": true}]},
            {"Sample Id": "S-a",
             "Conditions": [{"IPTG_measure": 0.5, "Larabinose_measure": 5, "aTc_measure": 2.5}],
             "Strains": [{"Strain Id": "https://hub.sd2e.org/user/sd2e/design#pAN1201"}]},
            {"Sample Id": "S-b",
             "Conditions": [{"IPTG_measure": 0, "Larabinose_measure": 5}],
             "Strains": [{"Strain Id": "a#pAN3928"}, {"Strain Id": "b#pAN4036"}]}
        ]
    })
}

/// Store holding the manifest, instrument configuration and plan
pub fn seeded_store(manifest: &Value) -> MemoryStore {
    let store = MemoryStore::new();
    store.put(&manifest_uri(), manifest.to_string());
    store.put(&CYTOMETER_URI.parse().unwrap(), cytometer_configuration().to_string());
    store.put(&PLAN_URI.parse().unwrap(), plan().to_string());
    store
}

pub fn settings() -> Settings {
    Settings::from_yaml_str(&format!(
        r#"
actor_name: cytoplan
destination:
  system_id: {SYSTEM}
  base_path: /temp/flow_etl/cytoplan
job_params:
  data_subdir: raw
  output_subdir: processed
job_definition:
  appId: {APP_ID}
  batchQueue: normal
  maxRunTime: "02:00:00"
"#
    ))
    .unwrap()
}

pub fn graph_settings() -> Settings {
    let mut settings = settings();
    settings.plan.strategy = cytoplan::PlanStrategy::Graph;
    settings.plan.id = cytoplan::config::PlanIdStrategy::StripPrefix {
        prefix: GRAPH_PLAN_PREFIX.to_string(),
    };
    settings
}

/// Rows of the positive-control query for one bandpass configuration
pub fn positive_control_rows(sample: &str, excitation: &str, center: &str, width: &str) -> Vec<Binding> {
    [
        ("excitation_wavelength", excitation),
        ("emission_filter_type", "bandpass"),
        ("emission_filter_center", center),
        ("emission_filter_width", width),
    ]
    .into_iter()
    .map(|(key, value)| {
        let key = format!("{}{}", CONFIG_NS, key);
        binding(&[("sample", sample), ("key", key.as_str()), ("value", value)])
    })
    .collect()
}
