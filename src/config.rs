//! Process settings
//!
//! Loaded once from YAML and handed by value to the pipeline; every
//! component receives what it needs through its constructor.

use crate::catalog::MatchMode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_URI_BASE: &str = "http://hub.sd2e.org/user/nicholasroehner/rule_30";
pub const DEFAULT_LOGS_ENDPOINT: &str = "https://logs-01.loggly.com/inputs";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Where generated documents are uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationSettings {
    pub system_id: String,
    /// Base directory; documents land in `{base_path}/{plan_id}`
    pub base_path: String,
}

impl Default for DestinationSettings {
    fn default() -> Self {
        Self {
            system_id: "data-sd2e-community".to_string(),
            base_path: "/temp/flow_etl/cytoplan".to_string(),
        }
    }
}

/// Paths relative to the manifest's grandparent directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobParams {
    /// Raw data directory handed to the job as `inputData`
    pub data_subdir: String,
    /// Directory under which job outputs are archived
    pub output_subdir: String,
}

impl Default for JobParams {
    fn default() -> Self {
        Self {
            data_subdir: String::new(),
            output_subdir: "processed".to_string(),
        }
    }
}

/// Which plan source is active for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStrategy {
    /// Plan document referenced by the manifest
    #[default]
    Inline,
    /// Graph queries against the knowledge store
    Graph,
}

impl std::str::FromStr for PlanStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inline" => Ok(Self::Inline),
            "graph" => Ok(Self::Graph),
            other => Err(format!("unknown plan strategy: {} (expected inline or graph)", other)),
        }
    }
}

/// How a plan's stable identifier is derived from its URI
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PlanIdStrategy {
    /// File name of the URI without extension
    #[default]
    Stem,
    /// Remainder of the URI after `prefix`
    StripPrefix { prefix: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanSettings {
    pub strategy: PlanStrategy,
    /// Base of synthesized sample URIs
    pub uri_base: String,
    /// Version suffix of synthesized sample URIs
    pub uri_version: String,
    pub id: PlanIdStrategy,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            strategy: PlanStrategy::default(),
            uri_base: DEFAULT_URI_BASE.to_string(),
            uri_version: "1".to_string(),
            id: PlanIdStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingSettings {
    pub mode: MatchMode,
}

/// Log-aggregation webhook attached to submitted jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Customer token; no notification is attached when unset
    pub logs_token: Option<String>,
    pub endpoint: String,
    pub event: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            logs_token: None,
            endpoint: DEFAULT_LOGS_ENDPOINT.to_string(),
            event: "*".to_string(),
        }
    }
}

/// Storage systems mounted locally (system id → root directory)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub roots: HashMap<String, PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Command line of the SPARQL client; the query is passed on stdin
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsSettings {
    /// Command line of the submission client; the job JSON is passed on stdin
    pub command: Vec<String>,
    /// Spool directory used when no command is configured
    pub spool_dir: Option<PathBuf>,
}

/// All process settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub actor_name: String,
    pub destination: DestinationSettings,
    pub job_params: JobParams,
    /// Job template; keys other than those set per run pass through
    pub job_definition: Map<String, Value>,
    /// Overrides `job_definition.appId`
    pub app_id: Option<String>,
    pub plan: PlanSettings,
    pub matching: MatchingSettings,
    pub notifications: NotificationSettings,
    pub storage: StorageSettings,
    pub graph: GraphSettings,
    pub jobs: JobsSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            actor_name: "cytoplan".to_string(),
            destination: DestinationSettings::default(),
            job_params: JobParams::default(),
            job_definition: Map::new(),
            app_id: None,
            plan: PlanSettings::default(),
            matching: MatchingSettings::default(),
            notifications: NotificationSettings::default(),
            storage: StorageSettings::default(),
            graph: GraphSettings::default(),
            jobs: JobsSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.destination.system_id.is_empty() {
            return Err(ConfigError::Invalid("destination.system_id is empty".to_string()));
        }
        if !self.destination.base_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "destination.base_path must be absolute: {}",
                self.destination.base_path
            )));
        }
        if let PlanIdStrategy::StripPrefix { prefix } = &self.plan.id {
            if prefix.is_empty() {
                return Err(ConfigError::Invalid("plan.id.prefix is empty".to_string()));
            }
        }
        Ok(())
    }

    /// The application to submit: `app_id` if set, else the template's
    /// `appId`.
    pub fn resolved_app_id(&self) -> Option<String> {
        self.app_id.clone().filter(|id| !id.is_empty()).or_else(|| {
            self.job_definition
                .get("appId")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        })
    }
}
