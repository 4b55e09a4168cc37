//! Per-unit recurring costs, modules M4 through M8.
//!
//! Every amount here is per unit sold. The M4 chain is order-sensitive:
//! tariff is levied on cost plus freight (CIF), VAT on cost plus freight
//! plus tariff (DDP).

use crate::config::OpexDefaults;
use crate::{require_scope, safe_div, CostModule, EngineError};
use cost_core::{FactorValues, FreightMode, LogisticsRates, Money, Project, ProjectScope, Rate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Caller-selected calculation switches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpexOptions {
    pub freight_mode: FreightMode,
}

/// Whether a module was priced from a single rate or from itemized inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostBasis {
    #[default]
    Rate,
    Itemized,
}

/// M4: goods, freight and import taxes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GoodsAndTax {
    pub cogs: Money,
    pub logistics: Money,
    pub tariff: Money,
    pub vat: Money,
    pub freight_mode: FreightMode,
    pub total: Money,
}

/// M5: last-mile delivery and expected return handling.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub last_mile: Money,
    /// Expected value per order, not a charge on each order.
    pub return_cost: Money,
    pub total: Money,
}

/// M6: customer acquisition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Marketing {
    pub basis: CostBasis,
    /// Per-customer acquisition cost; zero on the rate basis.
    pub cac: Money,
    /// Price-proportional spend: the whole marketing budget on the rate basis.
    pub ad_spend: Money,
    /// Monthly SEO budget spread over monthly units; `None` when it cannot be allocated.
    pub seo: Option<Money>,
    pub total: Money,
}

impl Marketing {
    /// Cost of acquiring one customer, as used by LTV:CAC.
    pub fn acquisition_cost(&self) -> Money {
        match self.basis {
            CostBasis::Itemized => self.cac,
            CostBasis::Rate => self.total,
        }
    }
}

/// M7: payment processing and marketplace commission.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub gateway_fee: Money,
    pub platform_commission: Money,
    pub total: Money,
}

/// M8: general and administrative overhead.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Operations {
    pub basis: CostBasis,
    /// Rate-basis G&A; zero on the itemized basis.
    pub ga: Money,
    pub customer_service: Money,
    /// Monthly staff cost per unit; `None` when monthly sales is zero or no cost is set.
    pub staff_allocation: Option<Money>,
    /// Monthly software cost per unit; `None` when monthly sales is zero or no cost is set.
    pub software: Option<Money>,
    pub total: Money,
}

/// All recurring per-unit costs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OpexBreakdown {
    pub m4_goods_tax: GoodsAndTax,
    pub m5_delivery: Delivery,
    pub m6_marketing: Marketing,
    pub m7_payment: Payment,
    pub m8_operations: Operations,
    pub total: Money,
}

impl OpexBreakdown {
    /// Cost that scales with each order: M4 through M7, excluding overhead.
    pub fn variable_cost(&self) -> Money {
        self.m4_goods_tax.total + self.m5_delivery.total + self.m6_marketing.total + self.m7_payment.total
    }

    /// Freight plus last-mile delivery per unit.
    pub fn shipping_cost(&self) -> Money {
        self.m4_goods_tax.logistics + self.m5_delivery.last_mile
    }
}

impl CostModule for GoodsAndTax {
    const CODE: &'static str = "M4";
    const NAME: &'static str = "goods_tax";

    fn items(&self) -> Vec<(&'static str, Money)> {
        vec![
            ("cogs", self.cogs),
            ("logistics", self.logistics),
            ("tariff", self.tariff),
            ("vat", self.vat),
        ]
    }

    fn total(&self) -> Money {
        self.total
    }
}

impl CostModule for Delivery {
    const CODE: &'static str = "M5";
    const NAME: &'static str = "delivery";

    fn items(&self) -> Vec<(&'static str, Money)> {
        vec![("last_mile", self.last_mile), ("return_cost", self.return_cost)]
    }

    fn total(&self) -> Money {
        self.total
    }
}

impl CostModule for Marketing {
    const CODE: &'static str = "M6";
    const NAME: &'static str = "marketing";

    fn items(&self) -> Vec<(&'static str, Money)> {
        vec![
            ("cac", self.cac),
            ("ad_spend", self.ad_spend),
            ("seo", self.seo.unwrap_or_default()),
        ]
    }

    fn total(&self) -> Money {
        self.total
    }
}

impl CostModule for Payment {
    const CODE: &'static str = "M7";
    const NAME: &'static str = "payment";

    fn items(&self) -> Vec<(&'static str, Money)> {
        vec![
            ("gateway_fee", self.gateway_fee),
            ("platform_commission", self.platform_commission),
        ]
    }

    fn total(&self) -> Money {
        self.total
    }
}

impl CostModule for Operations {
    const CODE: &'static str = "M8";
    const NAME: &'static str = "operations";

    fn items(&self) -> Vec<(&'static str, Money)> {
        vec![
            ("ga", self.ga),
            ("customer_service", self.customer_service),
            ("staff_allocation", self.staff_allocation.unwrap_or_default()),
            ("software", self.software.unwrap_or_default()),
        ]
    }

    fn total(&self) -> Money {
        self.total
    }
}

/// Spread a monthly cost over monthly units; skipped when nothing sells.
fn per_unit(monthly_cost: Option<Money>, monthly_sales: u64) -> Option<Money> {
    if monthly_sales == 0 {
        return None;
    }
    monthly_cost.map(|c| c / Decimal::from(monthly_sales))
}

fn goods_and_tax(scope: &ProjectScope, v: &FactorValues, mode: FreightMode) -> GoodsAndTax {
    let product = &scope.product_info;
    let freight_rate = v
        .logistics
        .as_ref()
        .map(|l| l.rate_for(mode))
        .unwrap_or_else(|| LogisticsRates::default().rate_for(mode));
    let tariff_rate = v.effective_tariff_rate.or(v.tariff_rate).unwrap_or_default();
    let vat_rate = v.vat_rate.unwrap_or_default();

    let cogs = product.cogs;
    let logistics = product.weight_kg * freight_rate;
    let cif = cogs + logistics;
    let tariff = cif * tariff_rate;
    let vat = (cif + tariff) * vat_rate;
    GoodsAndTax {
        cogs,
        logistics,
        tariff,
        vat,
        freight_mode: mode,
        total: cogs + logistics + tariff + vat,
    }
}

fn delivery(scope: &ProjectScope, v: &FactorValues, logistics: Money, defaults: &OpexDefaults) -> Delivery {
    let last_mile = v.last_mile_delivery.unwrap_or_default();
    let return_rate = scope
        .assumptions
        .return_rate
        .or(v.return_rate)
        .unwrap_or_default();
    let return_cost_rate = v.return_cost_rate.unwrap_or(defaults.return_cost_rate);
    let return_cost = (logistics + last_mile) * return_rate * return_cost_rate;
    Delivery {
        last_mile,
        return_cost,
        total: last_mile + return_cost,
    }
}

fn marketing(price: Money, monthly_sales: u64, v: &FactorValues, defaults: &OpexDefaults) -> Marketing {
    match v.cac {
        Some(cac) => {
            let ad_spend = price * v.ad_spend_rate.unwrap_or_default();
            let seo = per_unit(v.seo_monthly, monthly_sales);
            Marketing {
                basis: CostBasis::Itemized,
                cac,
                ad_spend,
                seo,
                total: cac + ad_spend + seo.unwrap_or_default(),
            }
        }
        None => {
            let rate = v.marketing_rate.unwrap_or(defaults.marketing_rate);
            let ad_spend = price * rate;
            Marketing {
                basis: CostBasis::Rate,
                cac: Decimal::ZERO,
                ad_spend,
                seo: None,
                total: ad_spend,
            }
        }
    }
}

fn payment(price: Money, v: &FactorValues) -> Payment {
    let gateway_fee =
        price * v.payment_gateway_rate.unwrap_or_default() + v.payment_fixed_fee.unwrap_or_default();
    let platform_commission = price * v.platform_commission_rate.unwrap_or_default();
    Payment {
        gateway_fee,
        platform_commission,
        total: gateway_fee + platform_commission,
    }
}

fn operations(price: Money, monthly_sales: u64, v: &FactorValues) -> Operations {
    if let Some(rate) = v.ga_rate {
        let ga = price * rate;
        return Operations {
            basis: CostBasis::Rate,
            ga,
            total: ga,
            ..Operations::default()
        };
    }
    let customer_service = price * v.customer_service_rate.unwrap_or_default();
    let staff_allocation = per_unit(v.staff_monthly, monthly_sales);
    let software = per_unit(v.software_monthly, monthly_sales);
    Operations {
        basis: CostBasis::Itemized,
        ga: Decimal::ZERO,
        customer_service,
        staff_allocation,
        software,
        total: customer_service + staff_allocation.unwrap_or_default() + software.unwrap_or_default(),
    }
}

/// OPEX for a scope at an explicit selling price.
pub(crate) fn opex_at_price(
    scope: &ProjectScope,
    v: &FactorValues,
    price: Money,
    options: &OpexOptions,
    defaults: &OpexDefaults,
) -> OpexBreakdown {
    let monthly_sales = scope.assumptions.monthly_sales;
    let m4 = goods_and_tax(scope, v, options.freight_mode);
    let m5 = delivery(scope, v, m4.logistics, defaults);
    let m6 = marketing(price, monthly_sales, v, defaults);
    let m7 = payment(price, v);
    let m8 = operations(price, monthly_sales, v);
    let total = m4.total + m5.total + m6.total + m7.total + m8.total;
    OpexBreakdown {
        m4_goods_tax: m4,
        m5_delivery: m5,
        m6_marketing: m6,
        m7_payment: m7,
        m8_operations: m8,
        total,
    }
}

/// Compute per-unit operating costs at the project's target price.
pub fn compute_opex(
    project: &Project,
    factor: &cost_core::CostFactor,
    options: &OpexOptions,
    defaults: &OpexDefaults,
) -> Result<OpexBreakdown, EngineError> {
    let scope = require_scope(project)?;
    let opex = opex_at_price(scope, &factor.values, scope.product_info.target_price, options, defaults);
    debug!(
        m4 = %opex.m4_goods_tax.total,
        m5 = %opex.m5_delivery.total,
        m6 = %opex.m6_marketing.total,
        m7 = %opex.m7_payment.total,
        m8 = %opex.m8_operations.total,
        total = %opex.total,
        "opex computed"
    );
    Ok(opex)
}

/// Per-unit cost as a line in price: `cost(p) = fixed_per_unit + price_rate × p`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSensitivity {
    pub fixed_per_unit: Money,
    pub price_rate: Rate,
}

impl PriceSensitivity {
    /// Price at which the gross margin equals `margin` (a fraction), if reachable.
    pub fn price_for_margin(&self, margin: Rate) -> Option<Money> {
        let headroom = Decimal::ONE - margin - self.price_rate;
        if headroom <= Decimal::ZERO {
            return None;
        }
        Some(safe_div(self.fixed_per_unit, headroom, Decimal::ZERO))
    }
}

/// Decompose OPEX into its price-independent and price-proportional parts.
pub fn price_sensitivity(
    scope: &ProjectScope,
    v: &FactorValues,
    options: &OpexOptions,
    defaults: &OpexDefaults,
) -> PriceSensitivity {
    let at_zero = opex_at_price(scope, v, Decimal::ZERO, options, defaults).total;
    let at_one = opex_at_price(scope, v, Decimal::ONE, options, defaults).total;
    PriceSensitivity {
        fixed_per_unit: at_zero,
        price_rate: at_one - at_zero,
    }
}
