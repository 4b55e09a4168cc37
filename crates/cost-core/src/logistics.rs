//! Freight rate sub-object and its lenient decoding.

use crate::Money;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Main-leg freight mode used to price logistics per unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreightMode {
    #[default]
    Air,
    Sea,
}

/// Per-kg freight rates for the main leg into the target country.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticsRates {
    pub sea_freight_per_kg: Money,
    pub air_freight_per_kg: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sea_transit_days: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_transit_days: Option<u16>,
}

impl Default for LogisticsRates {
    fn default() -> Self {
        Self {
            sea_freight_per_kg: dec!(1.50),
            air_freight_per_kg: dec!(5.00),
            sea_transit_days: Some(35),
            air_transit_days: Some(7),
        }
    }
}

impl LogisticsRates {
    pub fn rate_for(&self, mode: FreightMode) -> Money {
        match mode {
            FreightMode::Air => self.air_freight_per_kg,
            FreightMode::Sea => self.sea_freight_per_kg,
        }
    }

    /// Decode a JSON-encoded logistics string, falling back to the default shape.
    pub fn from_json_or_default(text: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) => Self::from_value_or_default(value),
            Err(e) => {
                warn!(error = %e, "logistics sub-object failed to decode, using default rates");
                Self::default()
            }
        }
    }

    /// Only a JSON object is accepted; arrays and scalars map to the default.
    fn from_value_or_default(value: serde_json::Value) -> Self {
        if !value.is_object() {
            warn!(kind = json_kind(&value), "logistics sub-object is not an object, using default rates");
            return Self::default();
        }
        match serde_json::from_value::<LogisticsRates>(value) {
            Ok(rates) => rates,
            Err(e) => {
                warn!(error = %e, "logistics sub-object has unexpected shape, using default rates");
                Self::default()
            }
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Deserialize a logistics field that may be an object, a JSON string, or null.
///
/// Undecodable content yields the default shape instead of an error.
pub fn lenient<'de, D>(deserializer: D) -> Result<Option<LogisticsRates>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => Some(LogisticsRates::from_json_or_default(&text)),
        Some(value) => Some(LogisticsRates::from_value_or_default(value)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "lenient")]
        logistics: Option<LogisticsRates>,
    }

    #[test]
    fn decodes_string_encoded_object() {
        let h: Holder = serde_json::from_str(
            r#"{"logistics": "{\"sea_freight_per_kg\": 1.1, \"air_freight_per_kg\": 4.5}"}"#,
        )
        .unwrap();
        let l = h.logistics.unwrap();
        assert_eq!(l.air_freight_per_kg, dec!(4.5));
        assert_eq!(l.rate_for(FreightMode::Sea), dec!(1.1));
    }

    #[test]
    fn garbage_string_falls_back_to_default() {
        let h: Holder = serde_json::from_str(r#"{"logistics": "not json {"}"#).unwrap();
        assert_eq!(h.logistics, Some(LogisticsRates::default()));
    }

    #[test]
    fn wrong_shape_falls_back_to_default() {
        for raw in [r#"[1, 2, 3]"#, "4.5", "true"] {
            let h: Holder = serde_json::from_str(&format!(r#"{{"logistics": {raw}}}"#)).unwrap();
            assert_eq!(h.logistics, Some(LogisticsRates::default()), "input {raw}");
        }
    }

    #[test]
    fn string_encoded_array_falls_back_to_default() {
        let h: Holder = serde_json::from_str(r#"{"logistics": "[1, 2, 3]"}"#).unwrap();
        assert_eq!(h.logistics, Some(LogisticsRates::default()));
        assert_eq!(LogisticsRates::from_json_or_default("[1,2,3]"), LogisticsRates::default());
        assert_eq!(LogisticsRates::from_json_or_default("\"text\""), LogisticsRates::default());
    }

    #[test]
    fn null_or_absent_is_none() {
        let h: Holder = serde_json::from_str(r#"{"logistics": null}"#).unwrap();
        assert!(h.logistics.is_none());
        let h: Holder = serde_json::from_str("{}").unwrap();
        assert!(h.logistics.is_none());
    }
}
