//! SELECT queries issued by the graph plan source
//!
//! Each query is addressed by the plan IRI and named so mocks and logs can
//! tell them apart.

use super::types::{PlanError, PlanResult};
use crate::remote::SparqlQuery;

pub const BEAD: &str = "bead";
pub const NEGATIVE_CONTROLS: &str = "negative_controls";
pub const POSITIVE_CONTROLS: &str = "positive_controls";

const PREFIXES: &str = "\
PREFIX sd2: <http://sd2e.org#>
PREFIX prov: <http://www.w3.org/ns/prov#>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
";

/// Check that `uri` can be embedded as `<uri>` in a query.
pub fn validate_plan_uri(uri: &str) -> PlanResult<&str> {
    let invalid = || PlanError::InvalidPlanUri(uri.to_string());

    let (scheme, rest) = uri.split_once(':').ok_or_else(invalid)?;
    let scheme_ok = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    let rest_ok = !rest.is_empty()
        && !rest
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\'));

    if scheme_ok && rest_ok {
        Ok(uri)
    } else {
        Err(invalid())
    }
}

/// Bead calibration sample of the plan with its model and batch.
///
/// Binds `?bead`, `?model` and `?batch`.
pub fn bead_query(plan_uri: &str) -> PlanResult<SparqlQuery> {
    let plan = validate_plan_uri(plan_uri)?;
    Ok(SparqlQuery::new(
        BEAD,
        format!(
            "{PREFIXES}SELECT DISTINCT ?bead ?model ?batch WHERE {{
    <{plan}> sd2:hasSample ?bead .
    ?bead sd2:controlType sd2:BeadControl .
    OPTIONAL {{ ?bead sd2:beadModel ?model . }}
    OPTIONAL {{ ?bead sd2:beadBatch ?batch . }}
}}
ORDER BY ?bead"
        ),
    ))
}

/// Negative control samples and every sample derived from them.
///
/// Binds `?sample`.
pub fn negative_controls_query(plan_uri: &str) -> PlanResult<SparqlQuery> {
    let plan = validate_plan_uri(plan_uri)?;
    Ok(SparqlQuery::new(
        NEGATIVE_CONTROLS,
        format!(
            "{PREFIXES}SELECT DISTINCT ?sample WHERE {{
    <{plan}> sd2:hasSample ?control .
    ?control sd2:controlType sd2:NegativeControl .
    ?sample prov:wasDerivedFrom* ?control .
}}
ORDER BY ?sample"
        ),
    ))
}

/// Positive control samples with their channel configuration properties.
///
/// Binds `?sample`, `?key` and `?value`; one row per property.
pub fn positive_controls_query(plan_uri: &str) -> PlanResult<SparqlQuery> {
    let plan = validate_plan_uri(plan_uri)?;
    Ok(SparqlQuery::new(
        POSITIVE_CONTROLS,
        format!(
            "{PREFIXES}SELECT ?sample ?key ?value WHERE {{
    <{plan}> sd2:hasSample ?sample .
    ?sample sd2:controlType sd2:PositiveControl .
    ?sample sd2:channelConfiguration ?config .
    ?config ?key ?value .
    FILTER(isLiteral(?value))
}}
ORDER BY ?sample ?key"
        ),
    ))
}
