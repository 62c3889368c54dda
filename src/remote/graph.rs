//! Graph query access (SPARQL over a remote triple store)
//!
//! Two implementations:
//! - `CommandGraphClient`: runs a configured command with the query on stdin
//!   and reads SPARQL 1.1 JSON results from stdout (production)
//! - `MockGraphClient`: returns preconfigured bindings per query name (testing)

use super::command::{run_with_stdin, stderr_text};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// One solution of a SELECT query: variable name → value
pub type Binding = BTreeMap<String, String>;

/// A named SELECT query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparqlQuery {
    /// Short name used in logs and by mocks
    pub name: String,
    pub text: String,
}

impl SparqlQuery {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Errors from graph query operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("graph service not available: {0}")]
    Unavailable(String),
    #[error("query '{name}' failed: {message}")]
    QueryFailed { name: String, message: String },
    #[error("response parse error: {0}")]
    ParseError(String),
}

/// Client trait for running SELECT queries against the knowledge store.
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Run a query and return its bindings in result order.
    async fn select(&self, query: &SparqlQuery) -> Result<Vec<Binding>, GraphError>;
}

/// Parse query results.
///
/// Accepts the SPARQL 1.1 JSON results format
/// (`{"results": {"bindings": [{"var": {"type": ..., "value": ...}}]}}`) and,
/// for convenience, a bare array of flat `{"var": "value"}` objects.
pub fn parse_sparql_results(json: &Value) -> Result<Vec<Binding>, GraphError> {
    let rows = match json {
        Value::Array(rows) => rows,
        other => other
            .get("results")
            .and_then(|r| r.get("bindings"))
            .and_then(Value::as_array)
            .ok_or_else(|| GraphError::ParseError("missing results.bindings".to_string()))?,
    };

    rows.iter()
        .map(|row| {
            let object = row
                .as_object()
                .ok_or_else(|| GraphError::ParseError(format!("binding is not an object: {}", row)))?;
            let mut binding = Binding::new();
            for (var, cell) in object {
                let value = match cell {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Object(_) => match cell.get("value") {
                        Some(Value::String(s)) => s.clone(),
                        Some(v) => v.to_string(),
                        None => {
                            return Err(GraphError::ParseError(format!(
                                "binding for ?{} has no value",
                                var
                            )))
                        }
                    },
                    _ => continue,
                };
                binding.insert(var.clone(), value);
            }
            Ok(binding)
        })
        .collect()
}

/// Runs queries through an external command (e.g. a SPARQL CLI).
#[derive(Debug, Clone)]
pub struct CommandGraphClient {
    argv: Vec<String>,
}

impl CommandGraphClient {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl GraphClient for CommandGraphClient {
    async fn select(&self, query: &SparqlQuery) -> Result<Vec<Binding>, GraphError> {
        let output = run_with_stdin(&self.argv, query.text.as_bytes())
            .await
            .map_err(|e| GraphError::Unavailable(format!("{:?}: {}", self.argv.first(), e)))?;

        if !output.status.success() {
            return Err(GraphError::QueryFailed {
                name: query.name.clone(),
                message: stderr_text(&output),
            });
        }

        let json: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| GraphError::ParseError(e.to_string()))?;
        parse_sparql_results(&json)
    }
}

/// Mock client for testing — returns preconfigured bindings.
#[derive(Default)]
pub struct MockGraphClient {
    responses: HashMap<String, Result<Vec<Binding>, String>>,
    issued: Mutex<Vec<SparqlQuery>>,
}

impl MockGraphClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bindings for a query name.
    pub fn with_response(mut self, name: impl Into<String>, bindings: Vec<Binding>) -> Self {
        self.responses.insert(name.into(), Ok(bindings));
        self
    }

    /// Register a failure for a query name.
    pub fn with_failure(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.responses.insert(name.into(), Err(message.into()));
        self
    }

    /// Queries issued so far, in order
    pub fn issued(&self) -> Vec<SparqlQuery> {
        self.issued.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GraphClient for MockGraphClient {
    async fn select(&self, query: &SparqlQuery) -> Result<Vec<Binding>, GraphError> {
        if let Ok(mut issued) = self.issued.lock() {
            issued.push(query.clone());
        }
        match self.responses.get(&query.name) {
            Some(Ok(bindings)) => Ok(bindings.clone()),
            Some(Err(message)) => Err(GraphError::QueryFailed {
                name: query.name.clone(),
                message: message.clone(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

/// Helper to construct a binding for testing.
pub fn binding(pairs: &[(&str, &str)]) -> Binding {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
