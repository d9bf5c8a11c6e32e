//! Feature Vector
//!
//! Soil, weather and market readings submitted for a crop recommendation.
//! Every field is optional; absent fields resolve to a fixed default so a
//! partially filled form still produces a prediction.

use crate::error::{AdvisorError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// One named input of the recommender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Nitrogen,
    Phosphorus,
    Potassium,
    Ph,
    Temperature,
    Humidity,
    Rainfall,
    MarketScore,
}

impl Feature {
    /// All features in wire order
    pub const ALL: [Feature; 8] = [
        Feature::Nitrogen,
        Feature::Phosphorus,
        Feature::Potassium,
        Feature::Ph,
        Feature::Temperature,
        Feature::Humidity,
        Feature::Rainfall,
        Feature::MarketScore,
    ];

    /// Key used in request payloads and artifact column lists
    pub fn key(self) -> &'static str {
        match self {
            Feature::Nitrogen => "N",
            Feature::Phosphorus => "P",
            Feature::Potassium => "K",
            Feature::Ph => "pH",
            Feature::Temperature => "temp",
            Feature::Humidity => "humidity",
            Feature::Rainfall => "rainfall",
            Feature::MarketScore => "market_score",
        }
    }

    /// Value substituted when the caller omits the field
    pub fn default_value(self) -> f64 {
        match self {
            Feature::Ph => 7.0,
            Feature::Temperature => 25.0,
            Feature::Humidity => 60.0,
            _ => 0.0,
        }
    }

    pub fn from_key(key: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// Named optional readings; `None` means "use the default"
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    #[serde(rename = "N")]
    pub nitrogen: Option<f64>,
    #[serde(rename = "P")]
    pub phosphorus: Option<f64>,
    #[serde(rename = "K")]
    pub potassium: Option<f64>,
    #[serde(rename = "pH")]
    pub ph: Option<f64>,
    #[serde(rename = "temp")]
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub rainfall: Option<f64>,
    pub market_score: Option<f64>,
}

impl FeatureVector {
    /// Raw value as supplied by the caller
    pub fn raw(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Nitrogen => self.nitrogen,
            Feature::Phosphorus => self.phosphorus,
            Feature::Potassium => self.potassium,
            Feature::Ph => self.ph,
            Feature::Temperature => self.temperature,
            Feature::Humidity => self.humidity,
            Feature::Rainfall => self.rainfall,
            Feature::MarketScore => self.market_score,
        }
    }

    /// Value with the default substituted for a missing field
    pub fn get(&self, feature: Feature) -> f64 {
        self.raw(feature).unwrap_or_else(|| feature.default_value())
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        let slot = match feature {
            Feature::Nitrogen => &mut self.nitrogen,
            Feature::Phosphorus => &mut self.phosphorus,
            Feature::Potassium => &mut self.potassium,
            Feature::Ph => &mut self.ph,
            Feature::Temperature => &mut self.temperature,
            Feature::Humidity => &mut self.humidity,
            Feature::Rainfall => &mut self.rainfall,
            Feature::MarketScore => &mut self.market_score,
        };
        *slot = Some(value);
    }

    /// Builder-style setter, mostly for tests and tools
    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.set(feature, value);
        self
    }

    /// Build from a loosely typed JSON object.
    ///
    /// Numbers are taken as-is and numeric strings are parsed (surrounding
    /// whitespace allowed). Anything else under a known key, including `null`,
    /// booleans and non-finite values, is rejected. Unknown keys are ignored.
    pub fn from_json_map(payload: &Map<String, Value>) -> Result<Self> {
        let mut features = FeatureVector::default();
        for feature in Feature::ALL {
            if let Some(value) = payload.get(feature.key()) {
                features.set(feature, coerce_number(feature.key(), value)?);
            }
        }
        Ok(features)
    }
}

fn coerce_number(field: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| AdvisorError::invalid_input(field, format!("{} is out of range", n)))?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            AdvisorError::invalid_input(field, format!("could not convert '{}' to a number", s))
        })?,
        other => {
            return Err(AdvisorError::invalid_input(
                field,
                format!("expected a number, got {}", json_type_name(other)),
            ))
        }
    };

    if !parsed.is_finite() {
        return Err(AdvisorError::invalid_input(field, "value must be finite"));
    }
    Ok(parsed)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_payload_uses_defaults() {
        let features = FeatureVector::from_json_map(&Map::new()).unwrap();

        assert_eq!(features, FeatureVector::default());
        assert_eq!(features.get(Feature::Nitrogen), 0.0);
        assert_eq!(features.get(Feature::Ph), 7.0);
        assert_eq!(features.get(Feature::Temperature), 25.0);
        assert_eq!(features.get(Feature::Humidity), 60.0);
        assert_eq!(features.get(Feature::Rainfall), 0.0);
        assert_eq!(features.get(Feature::MarketScore), 0.0);
    }

    #[test]
    fn test_full_payload() {
        let payload = as_map(json!({
            "N": 90, "P": 42, "K": 43, "pH": 6.5,
            "temp": 25, "humidity": 80, "rainfall": 200, "market_score": 0
        }));
        let features = FeatureVector::from_json_map(&payload).unwrap();

        assert_eq!(features.nitrogen, Some(90.0));
        assert_eq!(features.ph, Some(6.5));
        assert_eq!(features.rainfall, Some(200.0));
        assert_eq!(features.market_score, Some(0.0));
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let payload = as_map(json!({ "N": " 12.5 ", "pH": "6" }));
        let features = FeatureVector::from_json_map(&payload).unwrap();

        assert_eq!(features.nitrogen, Some(12.5));
        assert_eq!(features.ph, Some(6.0));
    }

    #[test]
    fn test_negative_values_pass_through() {
        let payload = as_map(json!({ "rainfall": -40 }));
        let features = FeatureVector::from_json_map(&payload).unwrap();
        assert_eq!(features.get(Feature::Rainfall), -40.0);
    }

    #[test]
    fn test_text_value_is_invalid_input() {
        let payload = as_map(json!({ "K": "lots" }));
        let err = FeatureVector::from_json_map(&payload).unwrap_err();

        match err {
            AdvisorError::InvalidInput { field, .. } => assert_eq!(field, "K"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_null_bool_and_nan_are_rejected() {
        for bad in [json!(null), json!(true), json!([1]), json!("NaN"), json!("inf")] {
            let payload = as_map(json!({ "humidity": bad }));
            assert!(matches!(
                FeatureVector::from_json_map(&payload),
                Err(AdvisorError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let payload = as_map(json!({ "soil_type": "loam", "N": 5 }));
        let features = FeatureVector::from_json_map(&payload).unwrap();
        assert_eq!(features.nitrogen, Some(5.0));
    }

    #[test]
    fn test_feature_key_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(Feature::from_key(feature.key()), Some(feature));
        }
        assert_eq!(Feature::from_key("ph"), None);
    }
}
