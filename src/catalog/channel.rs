//! Channel definitions and spectral specs

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Coerce a JSON value to an integer.
///
/// Accepts integers, floats (truncated toward zero) and numeric strings.
pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => parse_int(s),
        _ => None,
    }
}

fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
}

fn deserialize_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    coerce_int(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected an integer, got {}", value)))
}

/// Emission filter geometry.
///
/// Equality covers the filter type and all of its discriminants, which is
/// exactly the spectral matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmissionFilter {
    /// Band-pass filter centered at `center` nm with a `width` nm pass band
    Bandpass {
        #[serde(deserialize_with = "deserialize_int")]
        center: i64,
        #[serde(deserialize_with = "deserialize_int")]
        width: i64,
    },
    /// Long-pass filter passing wavelengths above `cutoff` nm
    Longpass {
        #[serde(deserialize_with = "deserialize_int")]
        cutoff: i64,
    },
}

impl EmissionFilter {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bandpass { .. } => "bandpass",
            Self::Longpass { .. } => "longpass",
        }
    }
}

/// A cytometer acquisition channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel name, unique within a catalog (e.g. "FITC-A")
    pub name: String,
    /// Excitation laser wavelength in nm
    #[serde(deserialize_with = "deserialize_int")]
    pub excitation_wavelength: i64,
    pub emission_filter: EmissionFilter,
}

impl Channel {
    pub fn new(name: impl Into<String>, excitation_wavelength: i64, emission_filter: EmissionFilter) -> Self {
        Self {
            name: name.into(),
            excitation_wavelength,
            emission_filter,
        }
    }

    /// The spectral spec this channel answers to.
    pub fn spec(&self) -> ChannelSpec {
        ChannelSpec {
            excitation_wavelength: self.excitation_wavelength,
            emission_filter: self.emission_filter,
        }
    }

    /// True if this channel has the same spectral properties as `spec`.
    pub fn matches(&self, spec: &ChannelSpec) -> bool {
        self.excitation_wavelength == spec.excitation_wavelength
            && self.emission_filter == spec.emission_filter
    }
}

/// Spectral properties of a channel configuration, without a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelSpec {
    pub excitation_wavelength: i64,
    pub emission_filter: EmissionFilter,
}

impl ChannelSpec {
    pub fn bandpass(excitation_wavelength: i64, center: i64, width: i64) -> Self {
        Self {
            excitation_wavelength,
            emission_filter: EmissionFilter::Bandpass { center, width },
        }
    }

    pub fn longpass(excitation_wavelength: i64, cutoff: i64) -> Self {
        Self {
            excitation_wavelength,
            emission_filter: EmissionFilter::Longpass { cutoff },
        }
    }

    /// Build a spec from a flat key/value configuration.
    ///
    /// Recognized keys are `excitation_wavelength`, `emission_filter_type`,
    /// `emission_filter_center`, `emission_filter_width` and
    /// `emission_filter_cutoff`. Returns `None` when the type is unknown or
    /// a required discriminant is missing or non-numeric.
    pub fn from_properties(properties: &BTreeMap<String, String>) -> Option<Self> {
        let int = |key: &str| properties.get(key).and_then(|v| parse_int(v));

        let excitation_wavelength = int("excitation_wavelength")?;
        let filter_type = properties.get("emission_filter_type")?.trim().to_lowercase();
        let emission_filter = match filter_type.as_str() {
            "bandpass" => EmissionFilter::Bandpass {
                center: int("emission_filter_center")?,
                width: int("emission_filter_width")?,
            },
            "longpass" => EmissionFilter::Longpass {
                cutoff: int("emission_filter_cutoff")?,
            },
            _ => return None,
        };

        Some(Self {
            excitation_wavelength,
            emission_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerce_int_accepts_numbers_and_strings() {
        assert_eq!(coerce_int(&json!(488)), Some(488));
        assert_eq!(coerce_int(&json!(488.9)), Some(488));
        assert_eq!(coerce_int(&json!("530")), Some(530));
        assert_eq!(coerce_int(&json!(" 30.0 ")), Some(30));
        assert_eq!(coerce_int(&json!("wide")), None);
        assert_eq!(coerce_int(&json!(null)), None);
    }

    #[test]
    fn channel_deserializes_with_string_numbers() {
        let channel: Channel = serde_json::from_value(json!({
            "name": "FITC-A",
            "excitation_wavelength": "488",
            "emission_filter": {"type": "bandpass", "center": 530, "width": "30"}
        }))
        .unwrap();

        assert_eq!(channel, Channel::new("FITC-A", 488, EmissionFilter::Bandpass { center: 530, width: 30 }));
    }

    #[test]
    fn channel_deserializes_longpass() {
        let channel: Channel = serde_json::from_value(json!({
            "name": "PE-Texas Red-A",
            "excitation_wavelength": 561,
            "emission_filter": {"type": "longpass", "cutoff": 610}
        }))
        .unwrap();

        assert_eq!(channel.emission_filter, EmissionFilter::Longpass { cutoff: 610 });
        assert_eq!(channel.emission_filter.type_name(), "longpass");
    }

    #[test]
    fn unknown_filter_type_is_rejected() {
        let result: Result<Channel, _> = serde_json::from_value(json!({
            "name": "X",
            "excitation_wavelength": 488,
            "emission_filter": {"type": "notch", "center": 530}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn spec_from_properties() {
        let props: BTreeMap<String, String> = [
            ("excitation_wavelength", "488"),
            ("emission_filter_type", "Bandpass"),
            ("emission_filter_center", "530"),
            ("emission_filter_width", "30.0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(ChannelSpec::from_properties(&props), Some(ChannelSpec::bandpass(488, 530, 30)));
    }

    #[test]
    fn spec_from_properties_missing_discriminant() {
        let props: BTreeMap<String, String> = [
            ("excitation_wavelength", "561"),
            ("emission_filter_type", "longpass"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(ChannelSpec::from_properties(&props), None);
    }

    #[test]
    fn channel_matches_own_spec() {
        let channel = Channel::new("FITC-A", 488, EmissionFilter::Bandpass { center: 530, width: 30 });
        assert!(channel.matches(&channel.spec()));
        assert!(!channel.matches(&ChannelSpec::bandpass(488, 530, 31)));
        assert!(!channel.matches(&ChannelSpec::longpass(488, 530)));
    }
}
