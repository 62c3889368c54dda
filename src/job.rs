//! Job specification assembly
//!
//! Builds the compute job request for the analysis application from the
//! uploaded document URIs, the manifest's location and the job template.

use crate::config::{PlanIdStrategy, Settings};
use crate::pipeline::RunContext;
use crate::remote::{join_path, parent_dir, path_file_stem, StorageUri};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Keys of the job template that are set per run
const RUN_KEYS: [&str; 6] = ["appId", "name", "inputs", "archiveSystem", "archivePath", "notifications"];

const REDACTED: &str = "<redacted>";

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("no application id configured (set app_id or job_definition.appId)")]
    MissingAppId,

    #[error("invalid notifications in job template: {0}")]
    InvalidTemplate(#[from] serde_json::Error),
}

/// A webhook called by the job service on job events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub url: String,
    pub event: String,
    #[serde(default)]
    pub persistent: bool,
}

/// A job submission request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    pub app_id: String,
    pub name: String,
    /// Input role → storage URI
    pub inputs: BTreeMap<String, String>,
    pub archive_system: String,
    pub archive_path: String,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    /// Remaining template keys (queue, run time, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobSpec {
    /// A copy safe to log: notification URLs carry credentials.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for n in &mut copy.notifications {
            n.url = REDACTED.to_string();
        }
        copy
    }
}

/// Derive a stable identifier for a plan from its URI.
pub fn plan_id(plan_uri: &str, strategy: &PlanIdStrategy) -> String {
    match strategy {
        PlanIdStrategy::Stem => path_file_stem(plan_uri).to_string(),
        PlanIdStrategy::StripPrefix { prefix } => match plan_uri.strip_prefix(prefix.as_str()) {
            Some(suffix) if !suffix.trim_matches('/').is_empty() => suffix.trim_matches('/').to_string(),
            _ => path_file_stem(plan_uri).to_string(),
        },
    }
}

/// Turns uploaded document URIs and run metadata into a `JobSpec`.
pub struct JobSpecAssembler<'a> {
    settings: &'a Settings,
}

impl<'a> JobSpecAssembler<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn plan_id(&self, plan_uri: &str) -> String {
        plan_id(plan_uri, &self.settings.plan.id)
    }

    /// Upload directory for a plan's documents
    pub fn destination_dir(&self, plan_id: &str) -> String {
        join_path(&self.settings.destination.base_path, plan_id)
    }

    /// Build the job request.
    ///
    /// `uploaded` maps input roles to the URIs of the freshly uploaded
    /// documents. `inputData` and `archivePath` are placed relative to the
    /// manifest's grandparent directory on the manifest's storage system.
    pub fn assemble(
        &self,
        manifest: &StorageUri,
        uploaded: &BTreeMap<String, String>,
        run: &RunContext,
    ) -> Result<JobSpec, AssemblyError> {
        let app_id = self.settings.resolved_app_id().ok_or(AssemblyError::MissingAppId)?;
        let grandparent = parent_dir(&manifest.parent_dir());

        let mut inputs = uploaded.clone();
        let input_data = join_path(&grandparent, &self.settings.job_params.data_subdir);
        inputs.insert(
            "inputData".to_string(),
            StorageUri::new(manifest.system(), input_data).to_string(),
        );

        let archive_path = [
            self.settings.job_params.output_subdir.as_str(),
            app_id.as_str(),
            run.run_name().as_str(),
        ]
        .iter()
        .fold(grandparent, |path, segment| join_path(&path, segment));

        let template = &self.settings.job_definition;
        let mut notifications: Vec<Notification> = match template.get("notifications") {
            Some(value) if !value.is_null() => serde_json::from_value(value.clone())?,
            _ => Vec::new(),
        };
        if let Some(notification) = self.log_notification(&app_id) {
            notifications.push(notification);
        }

        let extra = template
            .iter()
            .filter(|(k, _)| !RUN_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(JobSpec {
            app_id,
            name: run.run_name(),
            inputs,
            archive_system: manifest.system().to_string(),
            archive_path,
            notifications,
            extra,
        })
    }

    /// Log-aggregation webhook, when a token is configured.
    fn log_notification(&self, app_id: &str) -> Option<Notification> {
        let settings = &self.settings.notifications;
        let token = settings.logs_token.as_deref().filter(|t| !t.is_empty())?;
        Some(Notification {
            url: format!(
                "{}/{}/tag/{}/",
                settings.endpoint.trim_end_matches('/'),
                token,
                app_id
            ),
            event: settings.event.clone(),
            persistent: true,
        })
    }
}
