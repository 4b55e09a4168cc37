#![deny(warnings)]

//! What-if evaluation on top of the cost engine.
//!
//! A scenario rewrites a copy of the project (price, volume, return rate),
//! turns mode selections into factor overrides and reruns the whole
//! pipeline. The base project and factor are never touched, so scenarios
//! are independent of each other and of evaluation order.

pub mod modes;

pub use modes::{FulfillmentMode, GatewayFee, LogisticsMode, ModeTables, PaymentGateway};

use cost_core::{CostFactor, CountryCode, FactorValues, Money, Project, Rate};
use cost_engine::opex::{Delivery, GoodsAndTax, Marketing, Operations, Payment};
use cost_engine::{compute_cost, merge, CostModule, CostResult, EngineConfig, EngineError, FactorTable, OpexOptions};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Caller-chosen substitutions for one scenario. Unset fields keep the base.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    pub price: Option<Money>,
    pub monthly_sales: Option<u64>,
    pub return_rate: Option<Rate>,
    pub cac: Option<Money>,
    pub logistics: Option<LogisticsMode>,
    pub fulfillment: Option<FulfillmentMode>,
    pub payment: Option<PaymentGateway>,
    /// Applied after the mode-derived values and wins over them.
    pub factor_overrides: Option<FactorValues>,
}

/// Everything a scenario run needs besides the project and factor.
#[derive(Clone, Debug, Default)]
pub struct ScenarioEnv {
    pub tables: ModeTables,
    pub config: EngineConfig,
}

/// A labeled scenario outcome; `id` is the scenario name or country code.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioResult {
    pub id: String,
    pub params: ScenarioParams,
    pub result: CostResult,
}

fn apply_params(base: &Project, params: &ScenarioParams) -> Project {
    let mut project = base.clone();
    if let Some(scope) = project.scope.as_mut() {
        if let Some(price) = params.price {
            scope.product_info.target_price = price;
        }
        if let Some(n) = params.monthly_sales {
            scope.assumptions.monthly_sales = n;
        }
        if params.return_rate.is_some() {
            scope.assumptions.return_rate = params.return_rate;
        }
    }
    project
}

fn scenario_overrides(factor: &CostFactor, params: &ScenarioParams, tables: &ModeTables) -> FactorValues {
    let mut v = tables.overrides(
        params.logistics,
        params.fulfillment,
        params.payment,
        factor.values.logistics.as_ref(),
    );
    if params.cac.is_some() {
        v.cac = params.cac;
    }
    if let Some(extra) = &params.factor_overrides {
        merge::layer(&mut v, extra);
    }
    v
}

/// Re-evaluate the full pipeline with `params` applied to a copy of `base`.
pub fn run_scenario(
    base: &Project,
    factor: &CostFactor,
    params: &ScenarioParams,
    env: &ScenarioEnv,
) -> Result<CostResult, EngineError> {
    let project = apply_params(base, params);
    let overrides = scenario_overrides(factor, params, &env.tables);
    let options = OpexOptions {
        freight_mode: params.logistics.map(LogisticsMode::freight_mode).unwrap_or_default(),
    };
    compute_cost(&project, factor, Some(&overrides), &options, &env.config)
}

/// Evaluate several named scenarios against one factor.
pub fn run_scenarios(
    base: &Project,
    factor: &CostFactor,
    named: &[(String, ScenarioParams)],
    env: &ScenarioEnv,
) -> Result<Vec<ScenarioResult>, EngineError> {
    named
        .iter()
        .map(|(id, params)| {
            run_scenario(base, factor, params, env).map(|result| ScenarioResult {
                id: id.clone(),
                params: params.clone(),
                result,
            })
        })
        .collect()
}

/// Evaluate the same scenario in each country.
///
/// Countries without a matching factor record, and countries whose
/// evaluation fails, are skipped with a warning.
pub fn run_multi_country(
    base: &Project,
    countries: &[CountryCode],
    table: &FactorTable,
    params: &ScenarioParams,
    env: &ScenarioEnv,
) -> Vec<ScenarioResult> {
    let mut out = Vec::with_capacity(countries.len());
    for country in countries {
        let Some((factor, resolution)) = table.lookup(&base.industry, country, base.sales_channel) else {
            warn!(%country, industry = %base.industry, "no factor record for country, skipping");
            continue;
        };
        let mut project = base.clone();
        project.target_country = country.clone();
        match run_scenario(&project, factor, params, env) {
            Ok(result) => {
                debug!(%country, ?resolution, roi = %result.kpis.roi, "country evaluated");
                out.push(ScenarioResult {
                    id: country.to_string(),
                    params: params.clone(),
                    result,
                });
            }
            Err(e) => warn!(%country, error = %e, "country evaluation failed, skipping"),
        }
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBy {
    /// Highest ROI first.
    Roi,
    /// Highest gross margin first.
    GrossMargin,
    /// Shortest payback first.
    Payback,
}

/// Order results best-first by `by`; ties fall back to `id`.
pub fn rank(mut results: Vec<ScenarioResult>, by: RankBy) -> Vec<ScenarioResult> {
    results.sort_by(|a, b| {
        let (x, y) = (&a.result, &b.result);
        let primary = match by {
            RankBy::Roi => y.kpis.roi.cmp(&x.kpis.roi),
            RankBy::GrossMargin => y.unit_economics.gross_margin.cmp(&x.unit_economics.gross_margin),
            RankBy::Payback => x.kpis.payback_period_months.cmp(&y.kpis.payback_period_months),
        };
        match primary {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        }
    });
    results
}

/// Differences `scenario - base` between two computed results.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub revenue: Money,
    pub cost: Money,
    pub gross_profit: Money,
    /// Percentage points.
    pub gross_margin: Decimal,
    /// Percentage points.
    pub roi: Decimal,
    pub payback_months: Decimal,
    pub capex: Money,
    /// Per-unit OPEX change keyed by module code.
    pub opex_modules: BTreeMap<String, Money>,
}

impl Impact {
    /// Neither margin nor ROI got worse.
    pub fn is_improvement(&self) -> bool {
        self.gross_margin >= Decimal::ZERO && self.roi >= Decimal::ZERO
    }
}

fn module_delta<M: CostModule>(out: &mut BTreeMap<String, Money>, base: &M, scenario: &M) {
    out.insert(M::CODE.to_string(), scenario.total() - base.total());
}

/// Pure subtraction over two results; nothing is recomputed.
pub fn compute_impact(base: &CostResult, scenario: &CostResult) -> Impact {
    let (b, s) = (&base.opex, &scenario.opex);
    let mut opex_modules = BTreeMap::new();
    module_delta::<GoodsAndTax>(&mut opex_modules, &b.m4_goods_tax, &s.m4_goods_tax);
    module_delta::<Delivery>(&mut opex_modules, &b.m5_delivery, &s.m5_delivery);
    module_delta::<Marketing>(&mut opex_modules, &b.m6_marketing, &s.m6_marketing);
    module_delta::<Payment>(&mut opex_modules, &b.m7_payment, &s.m7_payment);
    module_delta::<Operations>(&mut opex_modules, &b.m8_operations, &s.m8_operations);
    let (bu, su) = (&base.unit_economics, &scenario.unit_economics);
    Impact {
        revenue: su.revenue - bu.revenue,
        cost: su.cost - bu.cost,
        gross_profit: su.gross_profit - bu.gross_profit,
        gross_margin: su.gross_margin - bu.gross_margin,
        roi: scenario.kpis.roi - base.kpis.roi,
        payback_months: scenario.kpis.payback_period_months - base.kpis.payback_period_months,
        capex: scenario.capex.total - base.capex.total,
        opex_modules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cost_core::{Assumptions, LogisticsRates, ProductInfo, SalesChannel};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn project() -> Project {
        Project::new("p1", "Cat bed", "pet", "US", SalesChannel::Amazon).with_scope(
            ProductInfo {
                sku: "PET-001".into(),
                name: "Cat bed".into(),
                category: "pet".into(),
                weight_kg: dec!(2.0),
                cogs: dec!(10.00),
                target_price: dec!(25.00),
            },
            Assumptions {
                monthly_sales: 1000,
                return_rate: None,
            },
        )
    }

    fn factor(country: &str) -> CostFactor {
        let mut f = CostFactor::new(country, "pet").with_channel(SalesChannel::Amazon);
        f.values.tariff_rate = Some(dec!(0.05));
        f.values.vat_rate = Some(dec!(0.06));
        f.values.logistics = Some(LogisticsRates {
            sea_freight_per_kg: dec!(1.20),
            air_freight_per_kg: dec!(4.5),
            sea_transit_days: None,
            air_transit_days: None,
        });
        f.values.last_mile_delivery = Some(dec!(5));
        f.values.marketing_rate = Some(dec!(0.10));
        f.values.platform_commission_rate = Some(dec!(0.15));
        f
    }

    #[test]
    fn empty_params_reproduce_base_computation() {
        let env = ScenarioEnv::default();
        let base = compute_cost(&project(), &factor("US"), None, &OpexOptions::default(), &env.config).unwrap();
        let s = run_scenario(&project(), &factor("US"), &ScenarioParams::default(), &env).unwrap();
        assert_eq!(s.opex, base.opex);
        assert_eq!(s.kpis, base.kpis);
        assert!(compute_impact(&base, &s).opex_modules.values().all(|d| d.is_zero()));
    }

    #[test]
    fn price_and_volume_substitution() {
        let env = ScenarioEnv::default();
        let p = project();
        let params = ScenarioParams {
            price: Some(dec!(30)),
            monthly_sales: Some(2000),
            ..ScenarioParams::default()
        };
        let s = run_scenario(&p, &factor("US"), &params, &env).unwrap();
        assert_eq!(s.unit_economics.revenue, dec!(30));
        assert_eq!(s.capex.m3_supply_chain.initial_inventory, dec!(40000));
        // base untouched
        assert_eq!(p.scope.as_ref().unwrap().product_info.target_price, dec!(25.00));
    }

    #[test]
    fn sea_mode_lowers_freight() {
        let env = ScenarioEnv::default();
        let params = ScenarioParams {
            logistics: Some(LogisticsMode::Sea),
            ..ScenarioParams::default()
        };
        let s = run_scenario(&project(), &factor("US"), &params, &env).unwrap();
        assert_eq!(s.opex.m4_goods_tax.logistics, dec!(2.40));
        assert_eq!(s.meta.freight_mode, cost_core::FreightMode::Sea);
    }

    #[test]
    fn free_form_overrides_win_over_modes() {
        let env = ScenarioEnv::default();
        let params = ScenarioParams {
            fulfillment: Some(FulfillmentMode::Platform),
            factor_overrides: Some(FactorValues {
                last_mile_delivery: Some(dec!(1.25)),
                ..FactorValues::default()
            }),
            ..ScenarioParams::default()
        };
        let s = run_scenario(&project(), &factor("US"), &params, &env).unwrap();
        assert_eq!(s.opex.m5_delivery.last_mile, dec!(1.25));
    }

    #[test]
    fn cac_switches_marketing_to_itemized() {
        let env = ScenarioEnv::default();
        let params = ScenarioParams {
            cac: Some(dec!(4)),
            ..ScenarioParams::default()
        };
        let s = run_scenario(&project(), &factor("US"), &params, &env).unwrap();
        assert_eq!(s.kpis.cac, dec!(4));
        assert!(s.meta.overridden_fields.contains(&"cac".to_string()));
    }

    #[test]
    fn multi_country_skips_missing_records() {
        let env = ScenarioEnv::default();
        let table = FactorTable::new(vec![factor("US"), factor("DE")]);
        let countries: Vec<CountryCode> = ["US", "FR", "de"].into_iter().map(CountryCode::new).collect();
        let results = run_multi_country(&project(), &countries, &table, &ScenarioParams::default(), &env);
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["US", "DE"]);
        assert_eq!(results[1].result.meta.country.as_str(), "DE");
    }

    #[test]
    fn multi_country_matches_individual_runs() {
        let env = ScenarioEnv::default();
        let table = factor_data::embedded_table().unwrap();
        let base = project();
        let countries: Vec<CountryCode> = ["US", "DE", "XX", "JP", "GB", "ID"]
            .into_iter()
            .map(CountryCode::new)
            .collect();
        for params in [
            ScenarioParams::default(),
            ScenarioParams {
                price: Some(dec!(31.50)),
                logistics: Some(LogisticsMode::Sea),
                payment: Some(PaymentGateway::Stripe),
                ..ScenarioParams::default()
            },
        ] {
            let batch = run_multi_country(&base, &countries, &table, &params, &env);
            // XX has no record and ID only sells through shopee.
            let ids: Vec<&str> = batch.iter().map(|r| r.id.as_str()).collect();
            assert_eq!(ids, vec!["US", "DE", "JP", "GB"]);
            for r in &batch {
                let country = CountryCode::new(&r.id);
                let (f, _) = table.lookup(&base.industry, &country, base.sales_channel).unwrap();
                let mut single = base.clone();
                single.target_country = country;
                let alone = run_scenario(&single, f, &params, &env).unwrap();
                assert_eq!(r.result, alone, "country {}", r.id);
            }
        }
        assert_eq!(base, project());
    }

    #[test]
    fn multi_country_skips_failing_country() {
        let env = ScenarioEnv::default();
        let table = FactorTable::new(vec![factor("US")]);
        let draft = Project::new("p2", "Draft", "pet", "US", SalesChannel::Amazon);
        let results = run_multi_country(&draft, &[CountryCode::new("US")], &table, &ScenarioParams::default(), &env);
        assert!(results.is_empty());
    }

    #[test]
    fn ranking_orders_and_breaks_ties_by_id() {
        let env = ScenarioEnv::default();
        let named = vec![
            ("cheap".to_string(), ScenarioParams { price: Some(dec!(22)), ..ScenarioParams::default() }),
            ("premium".to_string(), ScenarioParams { price: Some(dec!(40)), ..ScenarioParams::default() }),
            ("base".to_string(), ScenarioParams::default()),
            ("also_base".to_string(), ScenarioParams::default()),
        ];
        let results = run_scenarios(&project(), &factor("US"), &named, &env).unwrap();
        let by_roi: Vec<String> = rank(results.clone(), RankBy::Roi).into_iter().map(|r| r.id).collect();
        assert_eq!(by_roi, vec!["premium", "also_base", "base", "cheap"]);
        let by_payback: Vec<String> = rank(results.clone(), RankBy::Payback).into_iter().map(|r| r.id).collect();
        assert_eq!(by_payback[0], "premium");
        let by_margin: Vec<String> = rank(results, RankBy::GrossMargin).into_iter().map(|r| r.id).collect();
        assert_eq!(by_margin.last().map(String::as_str), Some("cheap"));
    }

    #[test]
    fn impact_is_plain_subtraction() {
        let env = ScenarioEnv::default();
        let base = run_scenario(&project(), &factor("US"), &ScenarioParams::default(), &env).unwrap();
        let cheaper = ScenarioParams {
            logistics: Some(LogisticsMode::Sea),
            ..ScenarioParams::default()
        };
        let s = run_scenario(&project(), &factor("US"), &cheaper, &env).unwrap();
        let i = compute_impact(&base, &s);
        assert_eq!(i.revenue, Decimal::ZERO);
        assert_eq!(i.cost, s.unit_economics.cost - base.unit_economics.cost);
        assert!(i.opex_modules["M4"] < Decimal::ZERO);
        assert_eq!(i.opex_modules.len(), 5);
        assert!(i.is_improvement());

        let worse = compute_impact(&s, &base);
        assert!(!worse.is_improvement());
    }

    #[test]
    fn params_deserialize_from_json() {
        let p: ScenarioParams = serde_json::from_str(
            r#"{"price": "29.99", "logistics": "express", "payment": "paypal", "fulfillment": "third_party_warehouse"}"#,
        )
        .unwrap();
        assert_eq!(p.price, Some(dec!(29.99)));
        assert_eq!(p.logistics, Some(LogisticsMode::Express));
        assert_eq!(p.payment, Some(PaymentGateway::PayPal));
        assert_eq!(p.fulfillment, Some(FulfillmentMode::ThirdPartyWarehouse));
        assert_eq!(p.monthly_sales, None);
    }

    proptest! {
        #[test]
        fn scenarios_do_not_influence_each_other(
            price_a in 1i64..10_000,
            price_b in 1i64..10_000,
            sales in 0u64..5_000,
            sea in any::<bool>(),
        ) {
            let env = ScenarioEnv::default();
            let base = project();
            let f = factor("US");
            let a = ScenarioParams {
                price: Some(Decimal::new(price_a, 2)),
                monthly_sales: Some(sales),
                logistics: Some(if sea { LogisticsMode::Sea } else { LogisticsMode::Express }),
                ..ScenarioParams::default()
            };
            let b = ScenarioParams {
                price: Some(Decimal::new(price_b, 2)),
                ..ScenarioParams::default()
            };
            let alone = run_scenario(&base, &f, &b, &env).unwrap();
            let _ = run_scenario(&base, &f, &a, &env).unwrap();
            let after = run_scenario(&base, &f, &b, &env).unwrap();
            prop_assert_eq!(alone, after);
            prop_assert_eq!(base, project());
            prop_assert_eq!(f, factor("US"));
        }
    }
}
