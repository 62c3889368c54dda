//! Job submission access

use super::command::{run_with_stdin, stderr_text};
use crate::job::JobSpec;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

/// Errors from job submission.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job service not available: {0}")]
    Unavailable(String),
    #[error("submission rejected: {0}")]
    Rejected(String),
    #[error("unexpected submission response: {0}")]
    BadResponse(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Submits job specifications to a compute service.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Submit a job, returning the service's job id.
    async fn submit(&self, spec: &JobSpec) -> Result<String, JobError>;
}

/// Extract a job id from a submission response: either a JSON object with
/// an `id` field (possibly nested under `result`) or a bare id.
fn parse_job_id(stdout: &[u8]) -> Result<String, JobError> {
    let text = String::from_utf8_lossy(stdout).trim().to_string();
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(&text) {
        let id = json
            .get("id")
            .or_else(|| json.get("result").and_then(|r| r.get("id")));
        return match id {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
            _ => Err(JobError::BadResponse(text)),
        };
    }
    if text.is_empty() || text.contains(char::is_whitespace) {
        return Err(JobError::BadResponse(text));
    }
    Ok(text)
}

/// Submits through an external command (e.g. `jobs-submit -F -`), passing
/// the job JSON on stdin.
#[derive(Debug, Clone)]
pub struct CommandJobSubmitter {
    argv: Vec<String>,
}

impl CommandJobSubmitter {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl JobSubmitter for CommandJobSubmitter {
    async fn submit(&self, spec: &JobSpec) -> Result<String, JobError> {
        let body = serde_json::to_vec(spec)?;
        let output = run_with_stdin(&self.argv, &body)
            .await
            .map_err(|e| JobError::Unavailable(format!("{:?}: {}", self.argv.first(), e)))?;
        if !output.status.success() {
            return Err(JobError::Rejected(stderr_text(&output)));
        }
        parse_job_id(&output.stdout)
    }
}

/// Writes each job specification into a spool directory for later pickup.
#[derive(Debug, Clone)]
pub struct SpoolJobSubmitter {
    dir: PathBuf,
}

impl SpoolJobSubmitter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl JobSubmitter for SpoolJobSubmitter {
    async fn submit(&self, spec: &JobSpec) -> Result<String, JobError> {
        let id = format!("spool-{}", Uuid::new_v4());
        tokio::fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec_pretty(spec)?;
        tokio::fs::write(self.dir.join(format!("{}.json", id)), body).await?;
        Ok(id)
    }
}

/// Mock submitter for testing — records submissions.
pub struct MockJobSubmitter {
    response: Result<String, String>,
    submitted: Mutex<Vec<JobSpec>>,
}

impl MockJobSubmitter {
    /// A submitter that accepts every job with `job_id`
    pub fn accepting(job_id: impl Into<String>) -> Self {
        Self {
            response: Ok(job_id.into()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// A submitter that rejects every job
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self {
            response: Err(message.into()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn submitted(&self) -> Vec<JobSpec> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl JobSubmitter for MockJobSubmitter {
    async fn submit(&self, spec: &JobSpec) -> Result<String, JobError> {
        if let Ok(mut submitted) = self.submitted.lock() {
            submitted.push(spec.clone());
        }
        self.response.clone().map_err(JobError::Rejected)
    }
}
