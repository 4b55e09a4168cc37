//! Factor lookup over an injected table with a conservative fallback.

use cost_core::{CostFactor, CountryCode, DataTier, FactorValues, IndustryId, LogisticsRates, SalesChannel};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::borrow::Cow;
use tracing::{debug, warn};

/// How a factor record was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Record matches industry, country and channel.
    Exact,
    /// Record matches industry and country and applies to every channel.
    ChannelAgnostic,
    /// No record matched; conservative defaults were used.
    Default,
}

/// A resolved record and how it was obtained.
#[derive(Clone, Debug)]
pub struct Resolved<'a> {
    pub factor: Cow<'a, CostFactor>,
    pub resolution: Resolution,
}

impl Resolved<'_> {
    pub fn into_owned(self) -> CostFactor {
        self.factor.into_owned()
    }
}

/// Conservative values used when no record matches.
pub fn conservative_defaults() -> FactorValues {
    FactorValues {
        company_registration: Some(dec!(1500)),
        business_license: Some(dec!(500)),
        tax_registration: Some(dec!(500)),
        legal_consulting: Some(dec!(2000)),
        import_license_required: Some(false),
        certification_estimate: Some(dec!(3000)),
        trademark_cost: Some(dec!(1000)),
        compliance_testing_cost: Some(dec!(1500)),
        tariff_rate: Some(dec!(0.10)),
        vat_rate: Some(dec!(0.20)),
        logistics: Some(LogisticsRates::default()),
        last_mile_delivery: Some(dec!(5.00)),
        return_rate: Some(dec!(0.05)),
        return_cost_rate: Some(Decimal::ONE),
        marketing_rate: Some(dec!(0.15)),
        payment_gateway_rate: Some(dec!(0.029)),
        payment_fixed_fee: Some(dec!(0.30)),
        platform_commission_rate: Some(dec!(0.15)),
        ga_rate: Some(dec!(0.05)),
        ..FactorValues::default()
    }
}

/// Injected table of factor records.
#[derive(Clone, Debug)]
pub struct FactorTable {
    entries: Vec<CostFactor>,
    fallback: FactorValues,
}

impl Default for FactorTable {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FactorTable {
    pub fn new(entries: Vec<CostFactor>) -> Self {
        Self {
            entries,
            fallback: conservative_defaults(),
        }
    }

    /// Replace the values used for unmatched lookups.
    pub fn with_fallback(mut self, fallback: FactorValues) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn insert(&mut self, factor: CostFactor) {
        self.entries.push(factor);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CostFactor] {
        &self.entries
    }

    /// Distinct countries present in the table, sorted.
    pub fn countries(&self) -> Vec<CountryCode> {
        let mut out: Vec<CountryCode> = self.entries.iter().map(|f| f.country.clone()).collect();
        out.sort();
        out.dedup();
        out
    }

    /// Find a matching record without falling back.
    pub fn lookup(
        &self,
        industry: &IndustryId,
        country: &CountryCode,
        channel: SalesChannel,
    ) -> Option<(&CostFactor, Resolution)> {
        let mut agnostic = None;
        for f in &self.entries {
            if &f.industry != industry || &f.country != country {
                continue;
            }
            match f.channel {
                Some(c) if c == channel => return Some((f, Resolution::Exact)),
                None if agnostic.is_none() => agnostic = Some(f),
                _ => {}
            }
        }
        agnostic.map(|f| (f, Resolution::ChannelAgnostic))
    }

    /// Resolve a record; never fails.
    pub fn resolve(
        &self,
        industry: &IndustryId,
        country: &CountryCode,
        channel: SalesChannel,
    ) -> Resolved<'_> {
        if let Some((f, resolution)) = self.lookup(industry, country, channel) {
            debug!(%industry, %country, ?channel, ?resolution, "factor resolved");
            return Resolved {
                factor: Cow::Borrowed(f),
                resolution,
            };
        }
        warn!(%industry, %country, ?channel, "no factor record, using conservative defaults");
        Resolved {
            factor: Cow::Owned(self.default_record(industry, country, channel)),
            resolution: Resolution::Default,
        }
    }

    fn default_record(
        &self,
        industry: &IndustryId,
        country: &CountryCode,
        channel: SalesChannel,
    ) -> CostFactor {
        let mut values = self.fallback.clone();
        if channel.is_dtc() {
            values.platform_commission_rate = Some(Decimal::ZERO);
        }
        CostFactor {
            country: country.clone(),
            industry: industry.clone(),
            channel: Some(channel),
            tier: DataTier::Estimated,
            field_tiers: Default::default(),
            values,
        }
    }
}
