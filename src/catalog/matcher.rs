//! ChannelCatalog: channel lookup and spectral matching

use super::channel::{Channel, ChannelSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while loading or querying a channel catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("instrument configuration has no tasbe_cytometer_configuration.channels list")]
    MissingChannels,

    #[error("instrument configuration lists no channels")]
    Empty,

    #[error("invalid channel definition at index {index}: {source}")]
    InvalidChannel {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate channel name: {0}")]
    DuplicateChannel(String),

    #[error("channel spec {spec} matches {count} channels: {names:?}")]
    AmbiguousMatch {
        spec: String,
        count: usize,
        names: Vec<String>,
    },
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// How to treat a spec that matches more than one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Ambiguous matches resolve to no match
    #[default]
    Lenient,
    /// Ambiguous matches are an error
    Strict,
}

/// The ordered list of channels of one cytometer.
#[derive(Debug, Clone)]
pub struct ChannelCatalog {
    channels: Vec<Channel>,
    mode: MatchMode,
}

impl ChannelCatalog {
    /// Create a catalog from channel definitions.
    ///
    /// Channel names must be unique.
    pub fn new(channels: Vec<Channel>) -> CatalogResult<Self> {
        let mut seen = HashSet::new();
        for channel in &channels {
            if !seen.insert(channel.name.as_str()) {
                return Err(CatalogError::DuplicateChannel(channel.name.clone()));
            }
        }
        Ok(Self {
            channels,
            mode: MatchMode::default(),
        })
    }

    /// Extract the catalog from an instrument configuration document
    /// (`tasbe_cytometer_configuration.channels`).
    pub fn from_cytometer_configuration(config: &Value) -> CatalogResult<Self> {
        let raw = config
            .get("tasbe_cytometer_configuration")
            .and_then(|c| c.get("channels"))
            .and_then(Value::as_array)
            .ok_or(CatalogError::MissingChannels)?;

        if raw.is_empty() {
            return Err(CatalogError::Empty);
        }

        let channels = raw
            .iter()
            .enumerate()
            .map(|(index, value)| {
                serde_json::from_value(value.clone())
                    .map_err(|source| CatalogError::InvalidChannel { index, source })
            })
            .collect::<CatalogResult<Vec<Channel>>>()?;

        Self::new(channels)
    }

    /// Set the ambiguity handling mode
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Channels in catalog order
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Find the single channel with the spectral properties of `spec`.
    ///
    /// Zero matches yield `None`. Two or more matches yield `None` in
    /// lenient mode and `CatalogError::AmbiguousMatch` in strict mode.
    pub fn match_channel(&self, spec: &ChannelSpec) -> CatalogResult<Option<&str>> {
        let matches: Vec<&Channel> = self.channels.iter().filter(|c| c.matches(spec)).collect();

        match matches.as_slice() {
            [single] => Ok(Some(single.name.as_str())),
            [] => Ok(None),
            many => match self.mode {
                MatchMode::Lenient => Ok(None),
                MatchMode::Strict => Err(CatalogError::AmbiguousMatch {
                    spec: format!("{:?}", spec),
                    count: many.len(),
                    names: many.iter().map(|c| c.name.clone()).collect(),
                }),
            },
        }
    }

    /// A catalog restricted to the named channels, in original order.
    pub fn retain_named<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Self {
        let keep: HashSet<&str> = names.into_iter().collect();
        Self {
            channels: self
                .channels
                .iter()
                .filter(|c| keep.contains(c.name.as_str()))
                .cloned()
                .collect(),
            mode: self.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EmissionFilter;
    use serde_json::json;

    fn bandpass(name: &str, wl: i64, center: i64, width: i64) -> Channel {
        Channel::new(name, wl, EmissionFilter::Bandpass { center, width })
    }

    fn three_channel_catalog() -> ChannelCatalog {
        ChannelCatalog::new(vec![
            bandpass("FITC-A", 488, 530, 30),
            bandpass("PE-A", 561, 582, 15),
            Channel::new("PE-Texas Red-A", 561, EmissionFilter::Longpass { cutoff: 610 }),
        ])
        .unwrap()
    }

    #[test]
    fn test_match_each_channel() {
        let catalog = three_channel_catalog();
        for channel in catalog.channels() {
            assert_eq!(catalog.match_channel(&channel.spec()).unwrap(), Some(channel.name.as_str()));
        }
    }

    #[test]
    fn test_no_match() {
        let catalog = three_channel_catalog();
        assert_eq!(catalog.match_channel(&ChannelSpec::bandpass(405, 450, 50)).unwrap(), None);
        assert_eq!(catalog.match_channel(&ChannelSpec::longpass(561, 600)).unwrap(), None);
    }

    #[test]
    fn test_widths_disambiguate() {
        let catalog = ChannelCatalog::new(vec![
            bandpass("A", 488, 530, 200),
            bandpass("B", 488, 530, 201),
        ])
        .unwrap();

        assert_eq!(catalog.match_channel(&ChannelSpec::bandpass(488, 530, 200)).unwrap(), Some("A"));
        assert_eq!(catalog.match_channel(&ChannelSpec::bandpass(488, 530, 201)).unwrap(), Some("B"));
    }

    #[test]
    fn test_identical_channels_are_ambiguous() {
        let catalog = ChannelCatalog::new(vec![
            bandpass("A", 488, 530, 200),
            bandpass("B", 488, 530, 200),
        ])
        .unwrap();

        for channel in catalog.channels() {
            assert_eq!(catalog.match_channel(&channel.spec()).unwrap(), None);
        }
    }

    #[test]
    fn test_strict_mode_reports_ambiguity() {
        let catalog = ChannelCatalog::new(vec![
            bandpass("A", 488, 530, 200),
            bandpass("B", 488, 530, 200),
        ])
        .unwrap()
        .with_mode(MatchMode::Strict);

        let err = catalog.match_channel(&ChannelSpec::bandpass(488, 530, 200)).unwrap_err();
        match err {
            CatalogError::AmbiguousMatch { count, names, .. } => {
                assert_eq!(count, 2);
                assert_eq!(names, vec!["A".to_string(), "B".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Zero matches are still not an error
        assert_eq!(catalog.match_channel(&ChannelSpec::bandpass(405, 450, 50)).unwrap(), None);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = ChannelCatalog::new(vec![bandpass("A", 488, 530, 30), bandpass("A", 561, 582, 15)]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateChannel(name) if name == "A"));
    }

    #[test]
    fn test_from_cytometer_configuration() {
        let config = json!({
            "tasbe_cytometer_configuration": {
                "channels": [
                    {"name": "FITC-A", "excitation_wavelength": 488,
                     "emission_filter": {"type": "bandpass", "center": 530, "width": 30}},
                    {"name": "PE-Texas Red-A", "excitation_wavelength": 561,
                     "emission_filter": {"type": "longpass", "cutoff": 610}}
                ]
            }
        });

        let catalog = ChannelCatalog::from_cytometer_configuration(&config).unwrap();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["FITC-A", "PE-Texas Red-A"]);
    }

    #[test]
    fn test_from_cytometer_configuration_missing_channels() {
        let err = ChannelCatalog::from_cytometer_configuration(&json!({"tasbe_cytometer_configuration": {}})).unwrap_err();
        assert!(matches!(err, CatalogError::MissingChannels));

        let err = ChannelCatalog::from_cytometer_configuration(&json!({
            "tasbe_cytometer_configuration": {"channels": []}
        }))
        .unwrap_err();
        assert!(matches!(err, CatalogError::Empty));
    }

    #[test]
    fn test_from_cytometer_configuration_bad_channel() {
        let err = ChannelCatalog::from_cytometer_configuration(&json!({
            "tasbe_cytometer_configuration": {"channels": [{"name": "X"}]}
        }))
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidChannel { index: 0, .. }));
    }

    #[test]
    fn test_retain_named_keeps_order() {
        let catalog = three_channel_catalog().with_mode(MatchMode::Strict);
        let pruned = catalog.retain_named(["PE-Texas Red-A", "FITC-A"]);
        assert_eq!(pruned.names().collect::<Vec<_>>(), vec!["FITC-A", "PE-Texas Red-A"]);
        assert_eq!(pruned.mode(), MatchMode::Strict);
        assert!(!pruned.contains("PE-A"));
    }
}
