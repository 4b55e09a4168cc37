//! External projections of a [`CostResult`].
//!
//! The result itself has one canonical shape. These adapters render it for
//! callers that expect snake_case itemized JSON, the older camelCase shape
//! with flattened module totals, or a single module.

use crate::capex::{Compliance, MarketEntry, SupplyChainSetup};
use crate::opex::{Delivery, GoodsAndTax, Marketing, Operations, Payment};
use crate::{CostModule, CostResult};
use cost_core::Money;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Map, Value};

fn money(d: Decimal) -> Value {
    json!(d.round_dp(2).to_f64().unwrap_or_default())
}

fn rate(d: Decimal) -> Value {
    json!(d.round_dp(4).to_f64().unwrap_or_default())
}

fn items_object<M: CostModule>(module: &M, key: fn(&'static str) -> String) -> Value {
    let mut out = Map::new();
    for (name, amount) in module.items() {
        out.insert(key(name), money(amount));
    }
    out.insert("total".into(), money(module.total()));
    Value::Object(out)
}

fn snake(name: &'static str) -> String {
    name.to_string()
}

fn camel(name: &'static str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Snake-case itemized view. Money is rounded to cents, rates to 4 dp.
pub fn current(r: &CostResult) -> Value {
    let ue = &r.unit_economics;
    let k = &r.kpis;
    let o = &r.opex;
    let mut m4 = items_object(&o.m4_goods_tax, snake);
    m4["freight_mode"] = json!(o.m4_goods_tax.freight_mode);
    let mut m6 = items_object(&o.m6_marketing, snake);
    m6["basis"] = json!(o.m6_marketing.basis);
    let mut m8 = items_object(&o.m8_operations, snake);
    m8["basis"] = json!(o.m8_operations.basis);
    json!({
        "meta": r.meta,
        "capex": {
            "m1_market_entry": items_object(&r.capex.m1_market_entry, snake),
            "m2_compliance": items_object(&r.capex.m2_compliance, snake),
            "m3_supply_chain": items_object(&r.capex.m3_supply_chain, snake),
            "total": money(r.capex.total),
        },
        "opex": {
            "m4_goods_tax": m4,
            "m5_delivery": items_object(&o.m5_delivery, snake),
            "m6_marketing": m6,
            "m7_payment": items_object(&o.m7_payment, snake),
            "m8_operations": m8,
            "total": money(o.total),
        },
        "unit_economics": {
            "revenue": money(ue.revenue),
            "cost": money(ue.cost),
            "gross_profit": money(ue.gross_profit),
            "gross_margin": rate(ue.gross_margin),
            "variable_cost": money(ue.variable_cost),
            "contribution_margin": rate(ue.contribution_margin),
        },
        "kpis": {
            "roi": rate(k.roi),
            "payback_period_months": rate(k.payback_period_months),
            "break_even_price": money(k.break_even_price),
            "break_even_volume": rate(k.break_even_volume),
            "ltv": money(k.ltv),
            "ltv_cac_ratio": rate(k.ltv_cac_ratio),
            "cac": money(k.cac),
            "monthly_profit": money(k.monthly_profit),
            "annual_profit": money(k.annual_profit),
        },
        "warnings": r.warnings,
        "recommendations": r.recommendations,
    })
}

/// CamelCase view for older consumers: CAPEX stays itemized, OPEX modules
/// are bare per-unit numbers, diagnostics are plain strings.
pub fn legacy(r: &CostResult) -> Value {
    let ue = &r.unit_economics;
    let k = &r.kpis;
    let o = &r.opex;
    json!({
        "capex": {
            "m1_marketEntry": items_object(&r.capex.m1_market_entry, camel),
            "m2_compliance": items_object(&r.capex.m2_compliance, camel),
            "m3_supplyChain": items_object(&r.capex.m3_supply_chain, camel),
            "total": money(r.capex.total),
        },
        "opex": {
            "m4_goodsTax": money(o.m4_goods_tax.total),
            "m5_delivery": money(o.m5_delivery.total),
            "m6_marketing": money(o.m6_marketing.total),
            "m7_payment": money(o.m7_payment.total),
            "m8_operations": money(o.m8_operations.total),
            "total": money(o.total),
        },
        "unitEconomics": {
            "revenue": money(ue.revenue),
            "cost": money(ue.cost),
            "grossProfit": money(ue.gross_profit),
            "grossMargin": rate(ue.gross_margin),
        },
        "kpis": {
            "roi": rate(k.roi),
            "paybackPeriod": rate(k.payback_period_months),
            "breakEvenPrice": money(k.break_even_price),
            "breakEvenVolume": rate(k.break_even_volume),
            "ltv": money(k.ltv),
            "ltvCacRatio": rate(k.ltv_cac_ratio),
        },
        "warnings": r.warning_messages(),
        "recommendations": r.recommendation_messages(),
    })
}

/// One module's itemized costs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModuleSlice {
    pub code: &'static str,
    pub name: &'static str,
    pub items: Vec<(&'static str, Money)>,
    pub total: Money,
}

fn slice<M: CostModule>(m: &M) -> ModuleSlice {
    ModuleSlice {
        code: M::CODE,
        name: M::NAME,
        items: m.items(),
        total: m.total(),
    }
}

/// Select a module by code (`M1`..`M8`, case-insensitive).
pub fn module_slice(r: &CostResult, code: &str) -> Option<ModuleSlice> {
    let code = code.trim().to_ascii_uppercase();
    let c = &r.capex;
    let o = &r.opex;
    let s = match code.as_str() {
        MarketEntry::CODE => slice(&c.m1_market_entry),
        Compliance::CODE => slice(&c.m2_compliance),
        SupplyChainSetup::CODE => slice(&c.m3_supply_chain),
        GoodsAndTax::CODE => slice(&o.m4_goods_tax),
        Delivery::CODE => slice(&o.m5_delivery),
        Marketing::CODE => slice(&o.m6_marketing),
        Payment::CODE => slice(&o.m7_payment),
        Operations::CODE => slice(&o.m8_operations),
        _ => return None,
    };
    Some(s)
}
