use super::context::RunContext;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A failure that ends the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{actor} {action} {target} (actor/exec {actor_id} {execution_id})")]
    Fatal {
        actor: String,
        action: String,
        target: String,
        actor_id: String,
        execution_id: String,
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    pub fn fatal(run: &RunContext, action: impl Into<String>, target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        PipelineError::Fatal {
            actor: run.actor_name.clone(),
            action: action.into(),
            target: target.into(),
            actor_id: run.actor_id.clone(),
            execution_id: run.execution_id.clone(),
            source: source.into(),
        }
    }

    /// What was being attempted
    pub fn action(&self) -> &str {
        match self {
            PipelineError::Fatal { action, .. } => action,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            PipelineError::Fatal { target, .. } => target,
        }
    }
}

/// Attach run context to a failing step.
pub(crate) trait OrFatal<T> {
    fn or_fatal(self, run: &RunContext, action: &str, target: &str) -> Result<T, PipelineError>;
}

impl<T, E> OrFatal<T> for Result<T, E>
where
    E: Into<BoxError>,
{
    fn or_fatal(self, run: &RunContext, action: &str, target: &str) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::fatal(run, action, target, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn fatal_message_and_source() {
        let run = RunContext::new("cytoplan", "A1", "E1");
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Err::<(), _>(io)
            .or_fatal(&run, "failed to download", "/uploads/manifest.json")
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "cytoplan failed to download /uploads/manifest.json (actor/exec A1 E1)"
        );
        assert_eq!(err.action(), "failed to download");
        assert_eq!(err.source().unwrap().to_string(), "gone");
    }
}
