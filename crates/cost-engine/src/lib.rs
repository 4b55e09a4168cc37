#![deny(warnings)]

//! Landed-cost computation engine.
//!
//! A deterministic pipeline over plain values:
//! resolve factor → merge overrides → CAPEX + OPEX → unit economics →
//! KPIs → diagnostics. Nothing here performs I/O or holds state; callers
//! recompute whenever inputs change.
//!
//! - [`resolver`]: factor lookup with conservative fallback
//! - [`merge`]: shallow override merge into the effective factor
//! - [`capex`] / [`opex`]: itemized cost modules M1–M3 and M4–M8
//! - [`economics`]: unit economics and investment KPIs
//! - [`diagnostics`]: ordered threshold rules
//! - [`view`]: adapters projecting a result into external shapes

pub mod capex;
pub mod config;
pub mod diagnostics;
pub mod economics;
pub mod merge;
pub mod opex;
pub mod resolver;
pub mod view;

pub use capex::{compute_capex, CapexBreakdown};
pub use config::{CapexDefaults, EngineConfig, KpiAssumptions, OpexDefaults, Thresholds};
pub use diagnostics::{
    diagnose, DiagnosticContext, Diagnostics, Metric, Recommendation, RecommendationKind, Severity,
    Warning, WarningKind,
};
pub use economics::{kpis, unit_economics, Kpis, UnitEconomics};
pub use merge::merge;
pub use opex::{compute_opex, price_sensitivity, OpexBreakdown, OpexOptions, PriceSensitivity};
pub use resolver::{FactorTable, Resolution, Resolved};

use cost_core::{
    validate_factor, validate_project, CostFactor, CountryCode, DataTier, FactorValues, IndustryId, Money, Project,
    ProjectScope, SalesChannel, ValidationError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised for caller-contract violations. Missing data never errors.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// Cost computation invoked before the product step was completed.
    #[error("project {0} has no product scope")]
    MissingScope(String),
    #[error("invalid project: {0}")]
    InvalidProject(#[from] ValidationError),
    /// The factor after overrides holds values outside the accepted ranges.
    #[error("invalid factor for {country}: {source}")]
    InvalidFactor {
        country: String,
        source: ValidationError,
    },
    #[error("invalid engine config: {0}")]
    Config(String),
}

/// A cost module with named line items and a total.
pub trait CostModule {
    /// Module code, e.g. "M4".
    const CODE: &'static str;
    /// Snake-case module name.
    const NAME: &'static str;

    fn items(&self) -> Vec<(&'static str, Money)>;

    fn total(&self) -> Money;

    fn sum_items(&self) -> Money {
        self.items().iter().map(|(_, v)| *v).sum()
    }
}

/// `n / d`, or `fallback` when `d` is zero or the quotient overflows.
pub fn safe_div(n: Decimal, d: Decimal, fallback: Decimal) -> Decimal {
    if d.is_zero() {
        return fallback;
    }
    n.checked_div(d).unwrap_or(fallback)
}

pub(crate) fn require_scope(project: &Project) -> Result<&ProjectScope, EngineError> {
    project
        .scope
        .as_ref()
        .ok_or_else(|| EngineError::MissingScope(project.id.0.clone()))
}

/// Identity of the inputs a result was computed from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultMeta {
    pub country: CountryCode,
    pub industry: IndustryId,
    pub channel: SalesChannel,
    /// Record-level data quality of the base factor.
    pub tier: DataTier,
    pub freight_mode: cost_core::FreightMode,
    /// Factor fields the caller's overrides replaced.
    pub overridden_fields: Vec<String>,
}

/// The engine's output for one project in one market.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostResult {
    pub meta: ResultMeta,
    pub capex: CapexBreakdown,
    pub opex: OpexBreakdown,
    pub unit_economics: UnitEconomics,
    pub kpis: Kpis,
    pub warnings: Vec<Warning>,
    pub recommendations: Vec<Recommendation>,
}

impl CostResult {
    /// Warnings rendered as classified strings, in rule order.
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    pub fn recommendation_messages(&self) -> Vec<String> {
        self.recommendations.iter().map(ToString::to_string).collect()
    }

    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }
}

/// Run the full pipeline for a project against a resolved factor.
///
/// `overrides` are merged shallowly onto `factor` first. The project and the
/// merged factor are validated, which bounds every magnitude the arithmetic
/// below multiplies; the project must carry a scope.
pub fn compute_cost(
    project: &Project,
    factor: &CostFactor,
    overrides: Option<&FactorValues>,
    options: &OpexOptions,
    config: &EngineConfig,
) -> Result<CostResult, EngineError> {
    validate_project(project)?;
    let scope = require_scope(project)?;
    let effective = merge::merge(factor, overrides);
    validate_factor(&effective).map_err(|source| EngineError::InvalidFactor {
        country: effective.country.to_string(),
        source,
    })?;

    let capex = compute_capex(project, &effective, &config.capex)?;
    let opex = compute_opex(project, &effective, options, &config.opex)?;
    let ue = unit_economics(scope.product_info.target_price, &opex);
    let k = kpis(&ue, &capex, &opex, scope.assumptions.monthly_sales, &config.kpi);

    let v = &effective.values;
    let ctx = DiagnosticContext {
        channel: Some(project.sales_channel),
        shipping_cost: opex.shipping_cost(),
        platform_commission_rate: v.platform_commission_rate.unwrap_or_default(),
        tax_burden: v.effective_tariff_rate.or(v.tariff_rate).unwrap_or_default()
            + v.vat_rate.unwrap_or_default(),
        price_sensitivity: price_sensitivity(scope, v, options, &config.opex),
    };
    let d = diagnose(&ue, &k, &ctx, &config.thresholds);
    debug!(
        project = %project.id.0,
        country = %effective.country,
        gross_margin = %ue.gross_margin,
        roi = %k.roi,
        warnings = d.warnings.len(),
        "cost computed"
    );

    let overridden_fields = overrides
        .map(merge::overridden_fields)
        .unwrap_or_default()
        .into_iter()
        .map(String::from)
        .collect();
    Ok(CostResult {
        meta: ResultMeta {
            country: effective.country.clone(),
            industry: effective.industry.clone(),
            channel: project.sales_channel,
            tier: factor.tier,
            freight_mode: options.freight_mode,
            overridden_fields,
        },
        capex,
        opex,
        unit_economics: ue,
        kpis: k,
        warnings: d.warnings,
        recommendations: d.recommendations,
    })
}

/// Resolve the project's factor from a table, then run the pipeline.
pub fn estimate(
    project: &Project,
    table: &FactorTable,
    overrides: Option<&FactorValues>,
    options: &OpexOptions,
    config: &EngineConfig,
) -> Result<(CostResult, Resolution), EngineError> {
    let resolved = table.resolve(&project.industry, &project.target_country, project.sales_channel);
    let result = compute_cost(project, &resolved.factor, overrides, options, config)?;
    Ok((result, resolved.resolution))
}
