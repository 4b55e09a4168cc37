//! Unit economics and investment KPIs derived from CAPEX and OPEX.

use crate::capex::CapexBreakdown;
use crate::config::KpiAssumptions;
use crate::opex::OpexBreakdown;
use crate::safe_div;
use cost_core::Money;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Per-unit revenue and margin figures. Margins are percentages.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitEconomics {
    pub revenue: Money,
    pub cost: Money,
    pub gross_profit: Money,
    pub gross_margin: Decimal,
    /// M4 through M7 per unit.
    pub variable_cost: Money,
    pub contribution_margin: Decimal,
}

/// Investment KPIs. `roi` is a percentage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub roi: Decimal,
    pub payback_period_months: Decimal,
    pub break_even_price: Money,
    /// Units needed to recover CAPEX from per-unit contribution.
    pub break_even_volume: Decimal,
    pub ltv: Money,
    pub ltv_cac_ratio: Decimal,
    /// Acquisition cost the ratio was computed with.
    pub cac: Money,
    pub monthly_profit: Money,
    pub annual_profit: Money,
}

fn percent_of(part: Money, whole: Money) -> Decimal {
    safe_div(part * Decimal::ONE_HUNDRED, whole, Decimal::ZERO)
}

/// Derive revenue, cost and margins for one unit at `price`.
pub fn unit_economics(price: Money, opex: &OpexBreakdown) -> UnitEconomics {
    let revenue = price;
    let cost = opex.total;
    let gross_profit = revenue - cost;
    let variable_cost = opex.variable_cost();
    UnitEconomics {
        revenue,
        cost,
        gross_profit,
        gross_margin: percent_of(gross_profit, revenue),
        variable_cost,
        contribution_margin: percent_of(revenue - variable_cost, revenue),
    }
}

/// Derive ROI, payback, break-even and lifetime value figures.
///
/// Degenerate denominators map to zero (ROI, LTV:CAC) or to the configured
/// sentinels (payback, break-even volume); results never exceed the sentinels.
pub fn kpis(
    ue: &UnitEconomics,
    capex: &CapexBreakdown,
    opex: &OpexBreakdown,
    monthly_sales: u64,
    assumptions: &KpiAssumptions,
) -> Kpis {
    let monthly = Decimal::from(monthly_sales);
    let monthly_profit = ue.gross_profit * monthly;
    let annual_profit = monthly_profit * MONTHS_PER_YEAR;
    let roi = percent_of(annual_profit, capex.total);

    let payback_cap = assumptions.payback_sentinel_months;
    let payback_period_months = if monthly_profit <= Decimal::ZERO {
        payback_cap
    } else {
        safe_div(capex.total, monthly_profit, payback_cap).min(payback_cap)
    };

    let volume_cap = assumptions.break_even_volume_sentinel;
    let unit_contribution = ue.revenue - ue.variable_cost;
    let break_even_volume = if unit_contribution <= Decimal::ZERO {
        volume_cap
    } else {
        safe_div(capex.total, unit_contribution, volume_cap)
            .ceil()
            .min(volume_cap)
    };

    let ltv = ue.gross_profit * Decimal::from(assumptions.repeat_orders);
    let cac = opex.m6_marketing.acquisition_cost();
    let ltv_cac_ratio = safe_div(ltv, cac, Decimal::ZERO);

    Kpis {
        roi,
        payback_period_months,
        break_even_price: opex.total,
        break_even_volume,
        ltv,
        ltv_cac_ratio,
        cac,
        monthly_profit,
        annual_profit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opex::{CostBasis, Marketing};

    fn opex(total: Money, overhead: Money, marketing: Money) -> OpexBreakdown {
        let mut o = OpexBreakdown::default();
        o.m4_goods_tax.total = total - overhead - marketing;
        o.m6_marketing = Marketing {
            basis: CostBasis::Rate,
            ad_spend: marketing,
            total: marketing,
            ..Marketing::default()
        };
        o.m8_operations.total = overhead;
        o.total = total;
        o
    }

    fn capex(total: Money) -> CapexBreakdown {
        CapexBreakdown {
            total,
            ..CapexBreakdown::default()
        }
    }

    #[test]
    fn margins_and_exact_gross_profit() {
        let o = opex(dec!(18.75), dec!(1.25), dec!(2.5));
        let ue = unit_economics(dec!(25), &o);
        assert_eq!(ue.gross_profit, ue.revenue - ue.cost);
        assert_eq!(ue.gross_margin, dec!(25));
        assert_eq!(ue.variable_cost, dec!(17.5));
        assert_eq!(ue.contribution_margin, dec!(30));
    }

    #[test]
    fn zero_revenue_margin_is_zero() {
        let ue = unit_economics(Decimal::ZERO, &opex(dec!(5), dec!(0), dec!(0)));
        assert_eq!(ue.gross_margin, Decimal::ZERO);
        assert_eq!(ue.contribution_margin, Decimal::ZERO);
    }

    #[test]
    fn kpis_nominal() {
        let o = opex(dec!(20), dec!(1), dec!(2));
        let ue = unit_economics(dec!(25), &o);
        let k = kpis(&ue, &capex(dec!(30000)), &o, 1000, &KpiAssumptions::default());
        assert_eq!(k.monthly_profit, dec!(5000));
        assert_eq!(k.annual_profit, dec!(60000));
        assert_eq!(k.roi, dec!(200));
        assert_eq!(k.payback_period_months, dec!(6));
        assert_eq!(k.break_even_price, dec!(20));
        // 30000 / (25 - 19) = 5000
        assert_eq!(k.break_even_volume, dec!(5000));
        assert_eq!(k.ltv, dec!(20));
        assert_eq!(k.ltv_cac_ratio, dec!(10));
    }

    #[test]
    fn break_even_volume_rounds_up() {
        let o = opex(dec!(20), dec!(1), dec!(2));
        let ue = unit_economics(dec!(25), &o);
        let k = kpis(&ue, &capex(dec!(30001)), &o, 1000, &KpiAssumptions::default());
        assert_eq!(k.break_even_volume, dec!(5001));
    }

    #[test]
    fn zero_capex_gives_zero_roi_and_payback() {
        let o = opex(dec!(20), dec!(1), dec!(2));
        let ue = unit_economics(dec!(25), &o);
        let k = kpis(&ue, &capex(Decimal::ZERO), &o, 1000, &KpiAssumptions::default());
        assert_eq!(k.roi, Decimal::ZERO);
        assert_eq!(k.payback_period_months, Decimal::ZERO);
        assert_eq!(k.break_even_volume, Decimal::ZERO);
    }

    #[test]
    fn losses_hit_sentinels() {
        let a = KpiAssumptions::default();
        let o = opex(dec!(30), dec!(1), dec!(2));
        let ue = unit_economics(dec!(25), &o);
        let k = kpis(&ue, &capex(dec!(1000)), &o, 1000, &a);
        assert_eq!(k.payback_period_months, a.payback_sentinel_months);
        assert!(k.roi < Decimal::ZERO);
        assert_eq!(k.break_even_volume, a.break_even_volume_sentinel);

        let k = kpis(&ue, &capex(dec!(1000)), &o, 0, &a);
        assert_eq!(k.payback_period_months, a.payback_sentinel_months);
    }

    #[test]
    fn slow_payback_is_capped() {
        let o = opex(dec!(24.99), dec!(1), dec!(2));
        let ue = unit_economics(dec!(25), &o);
        let k = kpis(&ue, &capex(dec!(10000000)), &o, 1, &KpiAssumptions::default());
        assert_eq!(k.payback_period_months, dec!(999));
    }

    #[test]
    fn no_acquisition_cost_gives_zero_ratio() {
        let o = opex(dec!(20), dec!(1), Decimal::ZERO);
        let ue = unit_economics(dec!(25), &o);
        let k = kpis(&ue, &capex(dec!(100)), &o, 10, &KpiAssumptions::default());
        assert_eq!(k.cac, Decimal::ZERO);
        assert_eq!(k.ltv_cac_ratio, Decimal::ZERO);
    }
}
