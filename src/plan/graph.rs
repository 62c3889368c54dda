//! GraphPlanSource — control metadata from the knowledge store
//!
//! Three queries run in sequence against the plan IRI: bead sample,
//! negative control chain, positive controls with their channel
//! configuration. Every multi-valued answer is sorted before the first
//! element is taken so the outcome does not depend on store ordering.

use super::queries::{bead_query, negative_controls_query, positive_controls_query, validate_plan_uri};
use super::traits::PlanSource;
use super::types::{BeadReference, ChannelControl, ControlQuery, PlanError, PlanResult, DEFAULT_BEAD_BATCH};
use crate::catalog::{ChannelCatalog, ChannelSpec};
use crate::remote::GraphClient;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Local name of a property IRI: the text after the last `#` or `/`.
fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}

/// Resolves controls by querying a `GraphClient`.
pub struct GraphPlanSource {
    client: Arc<dyn GraphClient>,
    plan_uri: String,
}

impl GraphPlanSource {
    pub fn new(client: Arc<dyn GraphClient>, plan_uri: impl Into<String>) -> PlanResult<Self> {
        let plan_uri = plan_uri.into();
        validate_plan_uri(&plan_uri)?;
        Ok(Self { client, plan_uri })
    }

    pub fn plan_uri(&self) -> &str {
        &self.plan_uri
    }

    async fn bead_reference(&self) -> PlanResult<BeadReference> {
        let mut rows = self.client.select(&bead_query(&self.plan_uri)?).await?;
        rows.sort_by(|a, b| a.get("bead").cmp(&b.get("bead")));

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| PlanError::NoBeadSample(self.plan_uri.clone()))?;
        let sample = row
            .get("bead")
            .cloned()
            .ok_or(PlanError::MissingVariable { var: "bead" })?;

        Ok(BeadReference {
            sample: Some(sample),
            model: row.get("model").cloned().unwrap_or_default(),
            batch: row
                .get("batch")
                .cloned()
                .unwrap_or_else(|| DEFAULT_BEAD_BATCH.to_string()),
        })
    }

    async fn blank_candidates(&self) -> PlanResult<Vec<String>> {
        let rows = self.client.select(&negative_controls_query(&self.plan_uri)?).await?;
        let candidates: BTreeSet<String> = rows.into_iter().filter_map(|mut row| row.remove("sample")).collect();
        Ok(candidates.into_iter().collect())
    }

    /// Positive control sample → matched channel name, ordered by sample.
    async fn matched_controls(&self, catalog: &ChannelCatalog) -> PlanResult<BTreeMap<String, String>> {
        let rows = self.client.select(&positive_controls_query(&self.plan_uri)?).await?;

        let mut properties: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for row in rows {
            if let (Some(sample), Some(key), Some(value)) = (row.get("sample"), row.get("key"), row.get("value")) {
                properties
                    .entry(sample.clone())
                    .or_default()
                    .insert(local_name(key).to_string(), value.clone());
            }
        }

        let mut matched = BTreeMap::new();
        for (sample, props) in properties {
            let Some(spec) = ChannelSpec::from_properties(&props) else {
                tracing::debug!(sample = %sample, "positive control has no usable channel configuration");
                continue;
            };
            match catalog.match_channel(&spec)? {
                Some(channel) => {
                    matched.insert(sample, channel.to_string());
                }
                None => tracing::debug!(sample = %sample, "positive control matches no single channel"),
            }
        }
        Ok(matched)
    }
}

/// For each catalog channel, the first sample (in identifier order) whose
/// configuration matched it. Channels no sample matched are left out.
fn assign_channels(catalog: &ChannelCatalog, matched: &BTreeMap<String, String>) -> Vec<ChannelControl> {
    catalog
        .names()
        .filter_map(|name| {
            matched
                .iter()
                .find(|(_, channel)| channel.as_str() == name)
                .map(|(sample, _)| ChannelControl::new(name, Some(sample.clone())))
        })
        .collect()
}

#[async_trait]
impl PlanSource for GraphPlanSource {
    fn strategy(&self) -> &'static str {
        "graph"
    }

    async fn resolve_controls(&self, catalog: &ChannelCatalog) -> PlanResult<ControlQuery> {
        let bead = self.bead_reference().await?;
        let blank_candidates = self.blank_candidates().await?;
        let matched = self.matched_controls(catalog).await?;
        let positive_controls = assign_channels(catalog, &matched);

        let dropped: Vec<&str> = catalog
            .names()
            .filter(|name| !positive_controls.iter().any(|c| c.channel == *name))
            .collect();
        if !dropped.is_empty() {
            tracing::warn!(channels = ?dropped, "no positive control for channels; dropping them");
        }

        Ok(ControlQuery {
            bead,
            blank_candidates,
            positive_controls,
        })
    }

    fn sample_uri(&self, sample_id: &str) -> String {
        sample_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Channel, CatalogError, EmissionFilter, MatchMode};
    use crate::plan::queries::{BEAD, NEGATIVE_CONTROLS, POSITIVE_CONTROLS};
    use crate::remote::{binding, Binding, MockGraphClient};

    const PLAN: &str = "https://hub.sd2e.org/user/sd2e/experiment/plan_1/1";
    const CONFIG: &str = "http://sd2e.org#";

    fn catalog() -> ChannelCatalog {
        ChannelCatalog::new(vec![
            Channel::new("FITC-A", 488, EmissionFilter::Bandpass { center: 530, width: 30 }),
            Channel::new("PE-A", 561, EmissionFilter::Bandpass { center: 582, width: 15 }),
            Channel::new("APC-A", 640, EmissionFilter::Longpass { cutoff: 670 }),
        ])
        .unwrap()
    }

    fn bandpass_rows(sample: &str, excitation: &str, center: &str, width: &str) -> Vec<Binding> {
        [
            ("excitation_wavelength", excitation),
            ("emission_filter_type", "bandpass"),
            ("emission_filter_center", center),
            ("emission_filter_width", width),
        ]
        .into_iter()
        .map(|(k, v)| {
            let key = format!("{}{}", CONFIG, k);
            binding(&[("sample", sample), ("key", key.as_str()), ("value", v)])
        })
        .collect()
    }

    fn bead_rows() -> Vec<Binding> {
        vec![
            binding(&[("bead", "https://hub/beads_2"), ("model", "M2")]),
            binding(&[("bead", "https://hub/beads_1"), ("model", "SpheroTech RCP-30-5A"), ("batch", "Lot AA01")]),
        ]
    }

    fn source(client: MockGraphClient) -> GraphPlanSource {
        GraphPlanSource::new(Arc::new(client), PLAN).unwrap()
    }

    #[test]
    fn local_names() {
        assert_eq!(local_name("http://sd2e.org#emission_filter_type"), "emission_filter_type");
        assert_eq!(local_name("http://sd2e.org/ns/excitation_wavelength"), "excitation_wavelength");
        assert_eq!(local_name("plain"), "plain");
    }

    #[tokio::test]
    async fn empty_bead_results_abort() {
        let plan = source(MockGraphClient::new());
        let err = plan.resolve_controls(&catalog()).await.unwrap_err();
        assert!(matches!(err, PlanError::NoBeadSample(uri) if uri == PLAN));
    }

    #[tokio::test]
    async fn bead_is_first_by_identifier() {
        let plan = source(MockGraphClient::new().with_response(BEAD, bead_rows()));
        let query = plan.resolve_controls(&catalog()).await.unwrap();
        assert_eq!(query.bead.sample.as_deref(), Some("https://hub/beads_1"));
        assert_eq!(query.bead.model, "SpheroTech RCP-30-5A");
        assert_eq!(query.bead.batch, "Lot AA01");
    }

    #[tokio::test]
    async fn bead_batch_defaults() {
        let client = MockGraphClient::new().with_response(BEAD, vec![binding(&[("bead", "b"), ("model", "M")])]);
        let query = source(client).resolve_controls(&catalog()).await.unwrap();
        assert_eq!(query.bead.batch, DEFAULT_BEAD_BATCH);
    }

    #[tokio::test]
    async fn negative_controls_sorted_and_deduplicated() {
        let client = MockGraphClient::new()
            .with_response(BEAD, bead_rows())
            .with_response(
                NEGATIVE_CONTROLS,
                vec![
                    binding(&[("sample", "https://hub/neg_b")]),
                    binding(&[("sample", "https://hub/neg_a")]),
                    binding(&[("sample", "https://hub/neg_b")]),
                ],
            );
        let query = source(client).resolve_controls(&catalog()).await.unwrap();
        assert_eq!(query.blank_candidates, vec!["https://hub/neg_a", "https://hub/neg_b"]);
    }

    #[tokio::test]
    async fn positive_controls_matched_by_spectrum() {
        let mut rows = bandpass_rows("https://hub/pc_pe", "561", "582", "15");
        rows.extend(bandpass_rows("https://hub/pc_fitc_2", "488", "530", "30"));
        rows.extend(bandpass_rows("https://hub/pc_fitc_1", "488", "530", "30"));
        rows.extend(bandpass_rows("https://hub/pc_unknown", "405", "450", "50"));

        let client = MockGraphClient::new()
            .with_response(BEAD, bead_rows())
            .with_response(POSITIVE_CONTROLS, rows);
        let query = source(client).resolve_controls(&catalog()).await.unwrap();

        // APC-A has no positive control and is dropped
        assert_eq!(
            query.positive_controls,
            vec![
                ChannelControl::new("FITC-A", Some("https://hub/pc_fitc_1".into())),
                ChannelControl::new("PE-A", Some("https://hub/pc_pe".into())),
            ]
        );
    }

    #[tokio::test]
    async fn queries_issued_in_order() {
        let client = Arc::new(MockGraphClient::new().with_response(BEAD, bead_rows()));
        let plan = GraphPlanSource::new(client.clone(), PLAN).unwrap();
        plan.resolve_controls(&catalog()).await.unwrap();

        let names: Vec<String> = client.issued().into_iter().map(|q| q.name).collect();
        assert_eq!(names, vec![BEAD, NEGATIVE_CONTROLS, POSITIVE_CONTROLS]);
    }

    #[tokio::test]
    async fn widths_distinguish_channels() {
        let near_twins = |w1, w2| {
            ChannelCatalog::new(vec![
                Channel::new("A", 488, EmissionFilter::Bandpass { center: 530, width: w1 }),
                Channel::new("B", 488, EmissionFilter::Bandpass { center: 530, width: w2 }),
            ])
            .unwrap()
        };
        let mut rows = bandpass_rows("https://hub/pc_a", "488", "530", "200");
        rows.extend(bandpass_rows("https://hub/pc_b", "488", "530", "201"));
        let client = Arc::new(
            MockGraphClient::new()
                .with_response(BEAD, bead_rows())
                .with_response(POSITIVE_CONTROLS, rows),
        );
        let plan = GraphPlanSource::new(client, PLAN).unwrap();

        let distinct = plan.resolve_controls(&near_twins(200, 201)).await.unwrap();
        assert_eq!(
            distinct.positive_controls,
            vec![
                ChannelControl::new("A", Some("https://hub/pc_a".into())),
                ChannelControl::new("B", Some("https://hub/pc_b".into())),
            ]
        );

        let ambiguous = plan.resolve_controls(&near_twins(200, 200)).await.unwrap();
        assert!(ambiguous.positive_controls.is_empty());

        let strict = near_twins(200, 200).with_mode(MatchMode::Strict);
        let err = plan.resolve_controls(&strict).await.unwrap_err();
        assert!(matches!(err, PlanError::Catalog(CatalogError::AmbiguousMatch { count: 2, .. })));
    }

    #[tokio::test]
    async fn graph_failure_propagates() {
        let client = MockGraphClient::new()
            .with_response(BEAD, bead_rows())
            .with_failure(NEGATIVE_CONTROLS, "timeout");
        let err = source(client).resolve_controls(&catalog()).await.unwrap_err();
        assert!(matches!(err, PlanError::Graph(_)));
    }

    #[test]
    fn sample_uri_is_identifier() {
        let plan = source(MockGraphClient::new());
        assert_eq!(plan.sample_uri("https://hub/s1"), "https://hub/s1");
    }

    #[test]
    fn rejects_invalid_plan_uri() {
        let result = GraphPlanSource::new(Arc::new(MockGraphClient::new()), "not a uri");
        assert!(matches!(result, Err(PlanError::InvalidPlanUri(_))));
    }
}
