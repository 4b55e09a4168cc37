//! Threshold rules over the final metrics.
//!
//! Warnings and recommendations are two independent, ordered rule lists.
//! Each rule looks only at the derived unit economics and KPIs (plus, for
//! recommendations, a small context) and yields at most one message.

use crate::config::Thresholds;
use crate::economics::{Kpis, UnitEconomics};
use crate::opex::PriceSensitivity;
use crate::safe_div;
use cost_core::{Money, Rate, SalesChannel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Warning severity, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Caution,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Caution => "CAUTION",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        })
    }
}

/// The metric a warning classifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    GrossMargin,
    LtvCac,
    Payback,
    Roi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    NegativeMargin,
    LowMargin,
    ThinMargin,
    LtvCacCritical,
    LtvCacLow,
    PaybackTooLong,
    PaybackSlow,
    NegativeRoi,
    LowRoi,
}

impl WarningKind {
    pub fn metric(self) -> Metric {
        match self {
            WarningKind::NegativeMargin | WarningKind::LowMargin | WarningKind::ThinMargin => {
                Metric::GrossMargin
            }
            WarningKind::LtvCacCritical | WarningKind::LtvCacLow => Metric::LtvCac,
            WarningKind::PaybackTooLong | WarningKind::PaybackSlow => Metric::Payback,
            WarningKind::NegativeRoi | WarningKind::LowRoi => Metric::Roi,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub severity: Severity,
    pub kind: WarningKind,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    RaisePrice,
    CapCac,
    SwitchToMarketplace,
    ConsiderOtherMarkets,
    OptimizeLogistics,
    MoveToOwnedChannel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Facts about the market and cost structure that recommendation rules need.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticContext {
    pub channel: Option<SalesChannel>,
    /// Freight plus last-mile delivery per unit.
    pub shipping_cost: Money,
    pub platform_commission_rate: Rate,
    /// Tariff rate plus VAT rate of the target market.
    pub tax_burden: Rate,
    /// OPEX as a line in price.
    pub price_sensitivity: PriceSensitivity,
}

/// Rule output for one computation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub warnings: Vec<Warning>,
    pub recommendations: Vec<Recommendation>,
}

type WarningRule = fn(&UnitEconomics, &Kpis, &Thresholds) -> Option<Warning>;
type RecommendationRule =
    fn(&UnitEconomics, &Kpis, &DiagnosticContext, &Thresholds) -> Option<Recommendation>;

const WARNING_RULES: &[WarningRule] = &[gross_margin_rule, ltv_cac_rule, payback_rule, roi_rule];

const RECOMMENDATION_RULES: &[RecommendationRule] = &[
    target_price_rule,
    cac_ceiling_rule,
    dtc_cac_rule,
    high_cost_market_rule,
    logistics_share_rule,
    platform_commission_rule,
];

fn warning(severity: Severity, kind: WarningKind, message: String) -> Option<Warning> {
    Some(Warning {
        severity,
        kind,
        message,
    })
}

fn recommendation(kind: RecommendationKind, message: String) -> Option<Recommendation> {
    Some(Recommendation { kind, message })
}

fn pct(d: Decimal) -> String {
    format!("{:.1}", d)
}

fn money(d: Decimal) -> String {
    format!("{:.2}", d)
}

pub fn gross_margin_rule(ue: &UnitEconomics, _: &Kpis, t: &Thresholds) -> Option<Warning> {
    let m = ue.gross_margin;
    if m < Decimal::ZERO {
        warning(
            Severity::Critical,
            WarningKind::NegativeMargin,
            format!("Gross margin is negative ({}%): every unit sold loses money", pct(m)),
        )
    } else if m < t.margin_warning_pct {
        warning(
            Severity::Warning,
            WarningKind::LowMargin,
            format!("Gross margin {}% is below {}%", pct(m), t.margin_warning_pct),
        )
    } else if m < t.margin_caution_pct {
        warning(
            Severity::Caution,
            WarningKind::ThinMargin,
            format!("Gross margin {}% is below the {}% comfort level", pct(m), t.margin_caution_pct),
        )
    } else {
        None
    }
}

pub fn ltv_cac_rule(_: &UnitEconomics, k: &Kpis, t: &Thresholds) -> Option<Warning> {
    if k.cac <= Decimal::ZERO {
        return None;
    }
    let r = format!("{:.2}", k.ltv_cac_ratio);
    if k.ltv_cac_ratio < t.ltv_cac_critical {
        warning(
            Severity::Critical,
            WarningKind::LtvCacCritical,
            format!("LTV:CAC is {r}: customers cost more to acquire than they return"),
        )
    } else if k.ltv_cac_ratio < t.ltv_cac_target {
        warning(
            Severity::Warning,
            WarningKind::LtvCacLow,
            format!("LTV:CAC is {r}, below the healthy level of {}", t.ltv_cac_target),
        )
    } else {
        None
    }
}

pub fn payback_rule(_: &UnitEconomics, k: &Kpis, t: &Thresholds) -> Option<Warning> {
    let p = pct(k.payback_period_months);
    if k.payback_period_months > t.payback_warning_months {
        warning(
            Severity::Warning,
            WarningKind::PaybackTooLong,
            format!("Payback period of {p} months exceeds {} months", t.payback_warning_months),
        )
    } else if k.payback_period_months > t.payback_caution_months {
        warning(
            Severity::Caution,
            WarningKind::PaybackSlow,
            format!("Payback period of {p} months exceeds {} months", t.payback_caution_months),
        )
    } else {
        None
    }
}

pub fn roi_rule(_: &UnitEconomics, k: &Kpis, t: &Thresholds) -> Option<Warning> {
    if k.roi < Decimal::ZERO {
        warning(
            Severity::Critical,
            WarningKind::NegativeRoi,
            format!("Annual ROI is negative ({}%)", pct(k.roi)),
        )
    } else if k.roi < t.roi_warning_pct {
        warning(
            Severity::Warning,
            WarningKind::LowRoi,
            format!("Annual ROI {}% is below {}%", pct(k.roi), t.roi_warning_pct),
        )
    } else {
        None
    }
}

pub fn target_price_rule(
    ue: &UnitEconomics,
    _: &Kpis,
    ctx: &DiagnosticContext,
    t: &Thresholds,
) -> Option<Recommendation> {
    if ue.gross_margin >= t.margin_caution_pct {
        return None;
    }
    let target = t.target_margin_pct / Decimal::ONE_HUNDRED;
    let s = &ctx.price_sensitivity;
    let price = if s.fixed_per_unit.is_zero() && s.price_rate.is_zero() {
        // No decomposition supplied: treat the current cost as fixed.
        Some(safe_div(ue.cost, Decimal::ONE - target, Decimal::ZERO))
    } else {
        s.price_for_margin(target)
    };
    match price {
        Some(p) => recommendation(
            RecommendationKind::RaisePrice,
            format!(
                "Raise the selling price to about {} to reach a {}% gross margin",
                money(p),
                t.target_margin_pct
            ),
        ),
        None => recommendation(
            RecommendationKind::RaisePrice,
            format!(
                "Price-proportional fees leave no room for a {}% gross margin; reduce commission, marketing or overhead rates",
                t.target_margin_pct
            ),
        ),
    }
}

pub fn cac_ceiling_rule(
    _: &UnitEconomics,
    k: &Kpis,
    _: &DiagnosticContext,
    t: &Thresholds,
) -> Option<Recommendation> {
    if k.cac <= Decimal::ZERO || k.ltv_cac_ratio >= t.ltv_cac_target {
        return None;
    }
    let ceiling = safe_div(k.ltv, t.ltv_cac_target, Decimal::ZERO).max(Decimal::ZERO);
    recommendation(
        RecommendationKind::CapCac,
        format!(
            "Keep acquisition cost under {} per customer (currently {}) to reach LTV:CAC of {}",
            money(ceiling),
            money(k.cac),
            t.ltv_cac_target
        ),
    )
}

pub fn dtc_cac_rule(
    _: &UnitEconomics,
    k: &Kpis,
    ctx: &DiagnosticContext,
    t: &Thresholds,
) -> Option<Recommendation> {
    if ctx.channel != Some(SalesChannel::Dtc) || k.cac <= t.dtc_cac_ceiling {
        return None;
    }
    recommendation(
        RecommendationKind::SwitchToMarketplace,
        format!(
            "Direct-to-consumer CAC of {} exceeds {}; consider launching on a marketplace first to borrow its traffic",
            money(k.cac),
            t.dtc_cac_ceiling
        ),
    )
}

pub fn high_cost_market_rule(
    ue: &UnitEconomics,
    _: &Kpis,
    ctx: &DiagnosticContext,
    t: &Thresholds,
) -> Option<Recommendation> {
    if ue.gross_margin >= t.margin_warning_pct || ctx.tax_burden < t.high_cost_tax_burden {
        return None;
    }
    recommendation(
        RecommendationKind::ConsiderOtherMarkets,
        format!(
            "Import taxes of {}% squeeze margins in this market; compare markets with lower tariff and VAT",
            pct(ctx.tax_burden * Decimal::ONE_HUNDRED)
        ),
    )
}

pub fn logistics_share_rule(
    ue: &UnitEconomics,
    _: &Kpis,
    ctx: &DiagnosticContext,
    t: &Thresholds,
) -> Option<Recommendation> {
    if ue.revenue <= Decimal::ZERO {
        return None;
    }
    let share = ctx.shipping_cost / ue.revenue;
    if share <= t.shipping_share {
        return None;
    }
    recommendation(
        RecommendationKind::OptimizeLogistics,
        format!(
            "Shipping takes {}% of the price; consider sea freight, consolidated shipments or lighter packaging",
            pct(share * Decimal::ONE_HUNDRED)
        ),
    )
}

pub fn platform_commission_rule(
    _: &UnitEconomics,
    _: &Kpis,
    ctx: &DiagnosticContext,
    t: &Thresholds,
) -> Option<Recommendation> {
    if ctx.platform_commission_rate <= t.platform_commission {
        return None;
    }
    recommendation(
        RecommendationKind::MoveToOwnedChannel,
        format!(
            "Platform commission of {}% is high; build an owned storefront to move repeat buyers off the marketplace",
            pct(ctx.platform_commission_rate * Decimal::ONE_HUNDRED)
        ),
    )
}

/// Evaluate the warning rules in order.
pub fn warnings(ue: &UnitEconomics, k: &Kpis, t: &Thresholds) -> Vec<Warning> {
    WARNING_RULES.iter().filter_map(|rule| rule(ue, k, t)).collect()
}

/// Evaluate the recommendation rules in order.
pub fn recommendations(
    ue: &UnitEconomics,
    k: &Kpis,
    ctx: &DiagnosticContext,
    t: &Thresholds,
) -> Vec<Recommendation> {
    RECOMMENDATION_RULES
        .iter()
        .filter_map(|rule| rule(ue, k, ctx, t))
        .collect()
}

/// Classify final metrics into warnings and recommendations. Never fails.
pub fn diagnose(ue: &UnitEconomics, k: &Kpis, ctx: &DiagnosticContext, t: &Thresholds) -> Diagnostics {
    Diagnostics {
        warnings: warnings(ue, k, t),
        recommendations: recommendations(ue, k, ctx, t),
    }
}
