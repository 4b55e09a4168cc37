//! Tunable constants for the cost pipeline.
//!
//! Every section and field is optional in YAML; omitted values keep the
//! canonical defaults below.

use crate::EngineError;
use cost_core::{Money, Rate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Full engine configuration injected into every computation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub capex: CapexDefaults,
    pub opex: OpexDefaults,
    pub kpi: KpiAssumptions,
    pub thresholds: Thresholds,
}

impl EngineConfig {
    /// Parse a YAML document, keeping defaults for anything it omits.
    pub fn from_yaml_str(text: &str) -> Result<Self, EngineError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))
    }
}

/// Fallbacks and multipliers for one-time setup costs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapexDefaults {
    /// Used when the factor has no `equipment_purchase`.
    pub equipment_purchase: Money,
    /// Used when the factor has no `system_setup`.
    pub system_setup: Money,
    /// Months of rent held as warehouse deposit in the sizing formula.
    pub warehouse_deposit_months: Decimal,
    /// Used when the factor has neither a direct deposit nor sizing data.
    pub fallback_warehouse_deposit: Money,
    /// Months of sales stocked as initial inventory.
    pub inventory_buffer_months: Decimal,
}

impl Default for CapexDefaults {
    fn default() -> Self {
        Self {
            equipment_purchase: dec!(3000),
            system_setup: dec!(1500),
            warehouse_deposit_months: dec!(3),
            fallback_warehouse_deposit: Decimal::ZERO,
            inventory_buffer_months: dec!(2),
        }
    }
}

/// Fallbacks for per-unit operating costs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpexDefaults {
    /// Marketing share of price when the factor has neither `cac` nor `marketing_rate`.
    pub marketing_rate: Rate,
    /// Share of outbound delivery cost lost on each return.
    pub return_cost_rate: Rate,
}

impl Default for OpexDefaults {
    fn default() -> Self {
        Self {
            marketing_rate: dec!(0.15),
            return_cost_rate: Decimal::ONE,
        }
    }
}

/// Assumptions behind the investment KPIs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiAssumptions {
    /// Expected orders per customer over their lifetime; LTV = gross profit × this.
    pub repeat_orders: u32,
    /// Reported payback when monthly profit is not positive, and the upper cap otherwise.
    pub payback_sentinel_months: Decimal,
    /// Reported break-even volume when each unit loses money, and the upper cap otherwise.
    pub break_even_volume_sentinel: Decimal,
}

impl Default for KpiAssumptions {
    fn default() -> Self {
        Self {
            repeat_orders: 4,
            payback_sentinel_months: dec!(999),
            break_even_volume_sentinel: dec!(9999999),
        }
    }
}

/// Diagnostic thresholds. Margins, ROI and target margin are percentages;
/// shares and tax burden are fractions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub margin_warning_pct: Decimal,
    pub margin_caution_pct: Decimal,
    pub ltv_cac_critical: Decimal,
    pub ltv_cac_target: Decimal,
    pub payback_warning_months: Decimal,
    pub payback_caution_months: Decimal,
    pub roi_warning_pct: Decimal,
    /// Margin the suggested price aims for.
    pub target_margin_pct: Decimal,
    /// Per-customer CAC above which a DTC seller is pointed to marketplaces.
    pub dtc_cac_ceiling: Money,
    /// Tariff + VAT at or above which a market counts as high-cost.
    pub high_cost_tax_burden: Rate,
    /// Delivery cost share of price above which logistics should be optimized.
    pub shipping_share: Rate,
    /// Marketplace commission above which an owned channel is suggested.
    pub platform_commission: Rate,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            margin_warning_pct: dec!(15),
            margin_caution_pct: dec!(30),
            ltv_cac_critical: Decimal::ONE,
            ltv_cac_target: dec!(3),
            payback_warning_months: dec!(24),
            payback_caution_months: dec!(12),
            roi_warning_pct: dec!(50),
            target_margin_pct: dec!(40),
            dtc_cac_ceiling: dec!(30),
            high_cost_tax_burden: dec!(0.25),
            shipping_share: dec!(0.20),
            platform_commission: dec!(0.10),
        }
    }
}
