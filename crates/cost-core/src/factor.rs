//! Per-country cost factor records.

use crate::logistics::{self, LogisticsRates};
use crate::{CountryCode, IndustryId, Money, Rate, SalesChannel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Provenance of a factor value. Used for display only, never for computation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTier {
    /// Published by a government body.
    Official,
    /// Industry association or large logistics provider.
    Authoritative,
    /// Modelled or extrapolated value.
    #[default]
    Estimated,
}

/// A named certificate required for market entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CertificationItem {
    pub name: String,
    pub cost: Money,
}

/// Cost factor values, every field optional.
///
/// The same shape serves as a resolved record's payload and as a partial
/// user override: a `Some` field in the override wins over the base.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorValues {
    // M1 market entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_registration: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_license: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_registration: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_consulting: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_license_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_license_cost: Option<Money>,

    // M2 technical compliance
    /// Itemized certificates; takes precedence over `certification_estimate` when non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certifications: Option<Vec<CertificationItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification_estimate: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trademark_cost: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_testing_cost: Option<Money>,

    // M3 supply chain setup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_warehouse_sqm: Option<rust_decimal::Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_deposit_per_sqm: Option<Money>,
    /// Direct deposit figure; wins over the sizing formula.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_deposit: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_purchase: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_setup: Option<Money>,

    // M4 goods and tax
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tariff_rate: Option<Rate>,
    /// Rate after trade agreements or surcharges; wins over `tariff_rate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_tariff_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_rate: Option<Rate>,
    /// Freight rates. May arrive as a JSON-encoded string from the data store.
    #[serde(
        default,
        deserialize_with = "logistics::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub logistics: Option<LogisticsRates>,

    // M5 delivery and returns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_mile_delivery: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_rate: Option<Rate>,
    /// Share of the outbound logistics cost incurred per returned order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_cost_rate: Option<Rate>,

    // M6 marketing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketing_rate: Option<Rate>,
    /// Customer acquisition cost; when present marketing is itemized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cac: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_spend_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_monthly: Option<Money>,

    // M7 payment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_gateway_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_fixed_fee: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_commission_rate: Option<Rate>,

    // M8 operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ga_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_service_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_monthly: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub software_monthly: Option<Money>,
}

/// A resolved per-(country, industry[, channel]) cost record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostFactor {
    pub country: CountryCode,
    pub industry: IndustryId,
    /// `None` applies to every channel in the country.
    #[serde(default)]
    pub channel: Option<SalesChannel>,
    /// Record-level data quality.
    #[serde(default)]
    pub tier: DataTier,
    /// Per-field data quality, keyed by field name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_tiers: BTreeMap<String, DataTier>,
    #[serde(flatten)]
    pub values: FactorValues,
}

impl CostFactor {
    /// An empty record for the given key; every value falls back to engine defaults.
    pub fn new(country: impl Into<CountryCode>, industry: impl Into<IndustryId>) -> Self {
        Self {
            country: country.into(),
            industry: industry.into(),
            channel: None,
            tier: DataTier::Estimated,
            field_tiers: BTreeMap::new(),
            values: FactorValues::default(),
        }
    }

    pub fn with_channel(mut self, channel: SalesChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_values(mut self, values: FactorValues) -> Self {
        self.values = values;
        self
    }

    /// Tier of a single field, falling back to the record tier.
    pub fn tier_of(&self, field: &str) -> DataTier {
        self.field_tiers.get(field).copied().unwrap_or(self.tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn flattened_record_deserializes() {
        let json = r#"{
            "country": "de",
            "industry": "pet",
            "channel": "amazon",
            "tier": "official",
            "field_tiers": { "vat_rate": "official", "cac": "estimated" },
            "tariff_rate": 0.04,
            "vat_rate": 0.19,
            "logistics": { "sea_freight_per_kg": 1.2, "air_freight_per_kg": 4.8 },
            "certifications": [ { "name": "CE", "cost": 1500 } ]
        }"#;
        let f: CostFactor = serde_json::from_str(json).unwrap();
        assert_eq!(f.country.as_str(), "DE");
        assert_eq!(f.channel, Some(SalesChannel::Amazon));
        assert_eq!(f.values.vat_rate, Some(dec!(0.19)));
        assert_eq!(f.values.logistics.as_ref().unwrap().air_freight_per_kg, dec!(4.8));
        assert_eq!(f.values.certifications.as_ref().unwrap()[0].cost, dec!(1500));
        assert_eq!(f.tier_of("cac"), DataTier::Estimated);
        assert_eq!(f.tier_of("tariff_rate"), DataTier::Official);
    }

    #[test]
    fn missing_tier_defaults_to_estimated() {
        let f: CostFactor = serde_json::from_str(r#"{"country":"US","industry":"pet"}"#).unwrap();
        assert_eq!(f.tier, DataTier::Estimated);
        assert_eq!(f.values, FactorValues::default());
    }
}
