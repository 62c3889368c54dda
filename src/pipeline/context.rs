//! Per-run identity

use uuid::Uuid;

/// Environment variables carrying the run identity when launched by the
/// actor runtime
pub const ACTOR_ID_VAR: &str = "_abaco_actor_id";
pub const EXECUTION_ID_VAR: &str = "_abaco_execution_id";

/// Who is running and which execution this is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub actor_name: String,
    pub actor_id: String,
    pub execution_id: String,
}

impl RunContext {
    pub fn new(actor_name: impl Into<String>, actor_id: impl Into<String>, execution_id: impl Into<String>) -> Self {
        Self {
            actor_name: actor_name.into(),
            actor_id: actor_id.into(),
            execution_id: execution_id.into(),
        }
    }

    /// Identity from explicit values, falling back to the runtime
    /// environment and then to fresh UUIDs.
    pub fn resolve(actor_name: impl Into<String>, actor_id: Option<String>, execution_id: Option<String>) -> Self {
        let pick = |explicit: Option<String>, var: &str| {
            explicit
                .or_else(|| std::env::var(var).ok())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string())
        };
        Self::new(
            actor_name,
            pick(actor_id, ACTOR_ID_VAR),
            pick(execution_id, EXECUTION_ID_VAR),
        )
    }

    /// `{actor_id}-{execution_id}`, unique per run
    pub fn run_name(&self) -> String {
        format!("{}-{}", self.actor_id, self.execution_id)
    }

    /// `{actor} {action} {target} (actor/exec {actor_id} {execution_id})`
    pub fn message(&self, action: &str, target: &str) -> String {
        format!(
            "{} {} {} (actor/exec {} {})",
            self.actor_name, action, target, self.actor_id, self.execution_id
        )
    }
}
