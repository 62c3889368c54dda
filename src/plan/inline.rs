//! InlinePlanSource — control metadata from an embedded plan document
//!
//! The plan lists one experiment state per sample, each with a list of
//! condition sets. Bead and blank references are found by scanning states
//! in order; the first matching state wins.

use super::traits::PlanSource;
use super::types::{BeadReference, ChannelControl, ControlQuery, PlanResult, DEFAULT_BEAD_BATCH};
use crate::catalog::ChannelCatalog;
use crate::samples::UNDEFINED_SAMPLE;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Strain segment used when a sample carries more than one strain
pub const COMBINED_STRAINS: &str = "pAN3928_pAN4036";

const BEAD_MODEL: &str = "bead_model";
const BEAD_BATCH: &str = "bead_batch";
const IS_BLANK: &str = "Is_Blank";
const IPTG: &str = "IPTG_measure";
const ARABINOSE: &str = "Larabinose_measure";
const ATC: &str = "aTc_measure";

/// A strain present in a sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strain {
    #[serde(rename = "Strain Id", default, deserialize_with = "identifier")]
    pub strain_id: Option<String>,
}

/// The initial state of one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentState {
    #[serde(rename = "Sample Id", default, deserialize_with = "identifier")]
    pub sample_id: Option<String>,
    #[serde(rename = "Conditions", default)]
    pub conditions: Vec<Map<String, Value>>,
    #[serde(rename = "Strains")]
    pub strains: Option<Vec<Strain>>,
}

impl ExperimentState {
    /// The first condition set containing `key`
    fn condition_with(&self, key: &str) -> Option<&Map<String, Value>> {
        self.conditions.iter().find(|c| c.contains_key(key))
    }

    /// Value of `key`, later condition sets overriding earlier ones
    fn condition_value(&self, key: &str) -> Option<&Value> {
        self.conditions.iter().rev().find_map(|c| c.get(key))
    }

    fn is_blank(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.get(IS_BLANK) == Some(&Value::Bool(true)))
    }
}

/// The plan document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentPlan {
    #[serde(rename = "initialState", default)]
    pub initial_state: Vec<ExperimentState>,
}

/// Identifiers may be strings or numbers; anything else leaves the
/// identifier unset so only that state degrades.
fn identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Text of a condition value as it appears in a URI; null counts as absent.
fn condition_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Resolves controls from an `ExperimentPlan`.
#[derive(Debug, Clone)]
pub struct InlinePlanSource {
    plan: ExperimentPlan,
    uri_base: String,
    uri_version: String,
}

impl InlinePlanSource {
    pub fn new(plan: ExperimentPlan, uri_base: impl Into<String>, uri_version: impl Into<String>) -> Self {
        Self {
            plan,
            uri_base: uri_base.into(),
            uri_version: uri_version.into(),
        }
    }

    pub fn from_slice(bytes: &[u8], uri_base: impl Into<String>, uri_version: impl Into<String>) -> PlanResult<Self> {
        let plan: ExperimentPlan = serde_json::from_slice(bytes)?;
        Ok(Self::new(plan, uri_base, uri_version))
    }

    pub fn plan(&self) -> &ExperimentPlan {
        &self.plan
    }

    fn bead_reference(&self) -> BeadReference {
        self.plan
            .initial_state
            .iter()
            .find_map(|state| {
                let condition = state.condition_with(BEAD_MODEL)?;
                Some(BeadReference {
                    sample: state.sample_id.clone(),
                    model: condition.get(BEAD_MODEL).and_then(condition_text).unwrap_or_default(),
                    batch: condition
                        .get(BEAD_BATCH)
                        .and_then(condition_text)
                        .unwrap_or_else(|| DEFAULT_BEAD_BATCH.to_string()),
                })
            })
            .unwrap_or_default()
    }

    fn blank_candidates(&self) -> Vec<String> {
        self.plan
            .initial_state
            .iter()
            .find(|state| state.is_blank())
            .and_then(|state| state.sample_id.clone())
            .into_iter()
            .collect()
    }

    /// `{base}/{strains}_system_{ara}_{atc}_{iptg}/{version}`, or `None`
    /// when the sample or any of its metadata is missing.
    fn synthesize_uri(&self, sample_id: &str) -> Option<String> {
        let state = self
            .plan
            .initial_state
            .iter()
            .find(|s| s.sample_id.as_deref() == Some(sample_id))?;

        let iptg = state.condition_value(IPTG).and_then(condition_text)?;
        let ara = state.condition_value(ARABINOSE).and_then(condition_text)?;
        // Only aTc has its decimal point spelled out; the other measures are
        // embedded as-is.
        let atc = state.condition_value(ATC).and_then(condition_text)?.replace('.', "p");

        let strains = state
            .strains
            .as_ref()?
            .iter()
            .map(|s| {
                s.strain_id
                    .as_deref()
                    .map(|id| id.rsplit('#').next().unwrap_or(id).to_string())
            })
            .collect::<Option<Vec<String>>>()?;
        let strain = match strains.as_slice() {
            [single] => single.clone(),
            _ => COMBINED_STRAINS.to_string(),
        };

        Some(format!(
            "{}/{}_system_{}_{}_{}/{}",
            self.uri_base, strain, ara, atc, iptg, self.uri_version
        ))
    }
}

#[async_trait]
impl PlanSource for InlinePlanSource {
    fn strategy(&self) -> &'static str {
        "inline"
    }

    async fn resolve_controls(&self, catalog: &ChannelCatalog) -> PlanResult<ControlQuery> {
        Ok(ControlQuery {
            bead: self.bead_reference(),
            blank_candidates: self.blank_candidates(),
            // Positive controls are filled upstream; one empty slot per channel
            positive_controls: catalog.names().map(|name| ChannelControl::new(name, None)).collect(),
        })
    }

    fn sample_uri(&self, sample_id: &str) -> String {
        self.synthesize_uri(sample_id).unwrap_or_else(|| {
            tracing::debug!(sample = sample_id, "could not find all plan metadata for sample");
            UNDEFINED_SAMPLE.to_string()
        })
    }
}
