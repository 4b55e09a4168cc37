//! One-time setup costs: market entry (M1), compliance (M2), supply chain (M3).

use crate::config::CapexDefaults;
use crate::{require_scope, CostModule, EngineError};
use cost_core::{CertificationItem, CostFactor, Money, Project};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// M1: company formation and licensing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub company_registration: Money,
    pub business_license: Money,
    pub tax_registration: Money,
    pub legal_consulting: Money,
    /// Zero unless the market requires an import license.
    pub import_license: Money,
    pub total: Money,
}

/// M2: product certification and IP protection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Compliance {
    pub certification: Money,
    /// Certificates the figure above was summed from; empty for an estimate.
    pub certifications: Vec<CertificationItem>,
    pub trademark: Money,
    pub compliance_testing: Money,
    pub total: Money,
}

/// M3: warehouse, equipment, opening stock and systems.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplyChainSetup {
    pub warehouse_deposit: Money,
    pub equipment_purchase: Money,
    pub initial_inventory: Money,
    pub system_setup: Money,
    pub total: Money,
}

/// All one-time costs with per-module totals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CapexBreakdown {
    pub m1_market_entry: MarketEntry,
    pub m2_compliance: Compliance,
    pub m3_supply_chain: SupplyChainSetup,
    pub total: Money,
}

impl CostModule for MarketEntry {
    const CODE: &'static str = "M1";
    const NAME: &'static str = "market_entry";

    fn items(&self) -> Vec<(&'static str, Money)> {
        vec![
            ("company_registration", self.company_registration),
            ("business_license", self.business_license),
            ("tax_registration", self.tax_registration),
            ("legal_consulting", self.legal_consulting),
            ("import_license", self.import_license),
        ]
    }

    fn total(&self) -> Money {
        self.total
    }
}

impl CostModule for Compliance {
    const CODE: &'static str = "M2";
    const NAME: &'static str = "compliance";

    fn items(&self) -> Vec<(&'static str, Money)> {
        vec![
            ("certification", self.certification),
            ("trademark", self.trademark),
            ("compliance_testing", self.compliance_testing),
        ]
    }

    fn total(&self) -> Money {
        self.total
    }
}

impl CostModule for SupplyChainSetup {
    const CODE: &'static str = "M3";
    const NAME: &'static str = "supply_chain";

    fn items(&self) -> Vec<(&'static str, Money)> {
        vec![
            ("warehouse_deposit", self.warehouse_deposit),
            ("equipment_purchase", self.equipment_purchase),
            ("initial_inventory", self.initial_inventory),
            ("system_setup", self.system_setup),
        ]
    }

    fn total(&self) -> Money {
        self.total
    }
}

fn market_entry(factor: &CostFactor) -> MarketEntry {
    let v = &factor.values;
    let import_license = if v.import_license_required.unwrap_or(false) {
        v.import_license_cost.unwrap_or_default()
    } else {
        Decimal::ZERO
    };
    let mut m = MarketEntry {
        company_registration: v.company_registration.unwrap_or_default(),
        business_license: v.business_license.unwrap_or_default(),
        tax_registration: v.tax_registration.unwrap_or_default(),
        legal_consulting: v.legal_consulting.unwrap_or_default(),
        import_license,
        total: Decimal::ZERO,
    };
    m.total = m.sum_items();
    m
}

fn compliance(factor: &CostFactor) -> Compliance {
    let v = &factor.values;
    let certifications = v
        .certifications
        .as_ref()
        .filter(|c| !c.is_empty())
        .cloned()
        .unwrap_or_default();
    let certification = if certifications.is_empty() {
        v.certification_estimate.unwrap_or_default()
    } else {
        certifications.iter().map(|c| c.cost).sum()
    };
    let mut m = Compliance {
        certification,
        certifications,
        trademark: v.trademark_cost.unwrap_or_default(),
        compliance_testing: v.compliance_testing_cost.unwrap_or_default(),
        total: Decimal::ZERO,
    };
    m.total = m.sum_items();
    m
}

fn warehouse_deposit(factor: &CostFactor, defaults: &CapexDefaults) -> Money {
    let v = &factor.values;
    if let Some(direct) = v.warehouse_deposit {
        return direct;
    }
    match (v.min_warehouse_sqm, v.warehouse_deposit_per_sqm) {
        (Some(sqm), Some(per_sqm)) => sqm * per_sqm * defaults.warehouse_deposit_months,
        _ => defaults.fallback_warehouse_deposit,
    }
}

/// Compute one-time setup costs for a project in the factor's market.
pub fn compute_capex(
    project: &Project,
    factor: &CostFactor,
    defaults: &CapexDefaults,
) -> Result<CapexBreakdown, EngineError> {
    let scope = require_scope(project)?;
    let v = &factor.values;
    let monthly = Decimal::from(scope.assumptions.monthly_sales);

    let mut m3 = SupplyChainSetup {
        warehouse_deposit: warehouse_deposit(factor, defaults),
        equipment_purchase: v.equipment_purchase.unwrap_or(defaults.equipment_purchase),
        initial_inventory: scope.product_info.cogs * monthly * defaults.inventory_buffer_months,
        system_setup: v.system_setup.unwrap_or(defaults.system_setup),
        total: Decimal::ZERO,
    };
    m3.total = m3.sum_items();

    let m1 = market_entry(factor);
    let m2 = compliance(factor);
    let total = m1.total + m2.total + m3.total;
    debug!(m1 = %m1.total, m2 = %m2.total, m3 = %m3.total, %total, "capex computed");
    Ok(CapexBreakdown {
        m1_market_entry: m1,
        m2_compliance: m2,
        m3_supply_chain: m3,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cost_core::{Assumptions, ProductInfo, SalesChannel};
    use rust_decimal_macros::dec;

    fn project(cogs: Money, monthly_sales: u64) -> Project {
        Project::new("p1", "Cat bed", "pet", "US", SalesChannel::Amazon).with_scope(
            ProductInfo {
                sku: "SKU".into(),
                name: "Cat bed".into(),
                category: "pet".into(),
                weight_kg: dec!(2),
                cogs,
                target_price: dec!(25),
            },
            Assumptions {
                monthly_sales,
                return_rate: None,
            },
        )
    }

    #[test]
    fn m1_sums_fees_and_conditional_import_license() {
        let mut f = CostFactor::new("US", "pet");
        f.values.company_registration = Some(dec!(500));
        f.values.business_license = Some(dec!(200));
        f.values.tax_registration = Some(dec!(100));
        f.values.legal_consulting = Some(dec!(1000));
        f.values.import_license_cost = Some(dec!(750));
        assert_eq!(market_entry(&f).total, dec!(1800));
        f.values.import_license_required = Some(true);
        let m = market_entry(&f);
        assert_eq!(m.import_license, dec!(750));
        assert_eq!(m.total, dec!(2550));
    }

    #[test]
    fn absent_m1_fields_are_zero() {
        assert_eq!(market_entry(&CostFactor::new("US", "pet")).total, Decimal::ZERO);
    }

    #[test]
    fn certification_list_wins_over_estimate() {
        let mut f = CostFactor::new("DE", "pet");
        f.values.certification_estimate = Some(dec!(9999));
        f.values.certifications = Some(vec![
            CertificationItem { name: "CE".into(), cost: dec!(1500) },
            CertificationItem { name: "REACH".into(), cost: dec!(800) },
        ]);
        f.values.trademark_cost = Some(dec!(900));
        let m = compliance(&f);
        assert_eq!(m.certification, dec!(2300));
        assert_eq!(m.total, dec!(3200));

        f.values.certifications = Some(vec![]);
        assert_eq!(compliance(&f).certification, dec!(9999));
    }

    #[test]
    fn warehouse_deposit_precedence() {
        let d = CapexDefaults::default();
        let mut f = CostFactor::new("US", "pet");
        assert_eq!(warehouse_deposit(&f, &d), d.fallback_warehouse_deposit);
        f.values.min_warehouse_sqm = Some(dec!(50));
        f.values.warehouse_deposit_per_sqm = Some(dec!(12));
        assert_eq!(warehouse_deposit(&f, &d), dec!(1800));
        f.values.warehouse_deposit = Some(dec!(400));
        assert_eq!(warehouse_deposit(&f, &d), dec!(400));
    }

    #[test]
    fn m3_inventory_buffer_and_defaults() {
        let c = compute_capex(&project(dec!(10), 1000), &CostFactor::new("US", "pet"), &CapexDefaults::default())
            .unwrap();
        let m3 = &c.m3_supply_chain;
        assert_eq!(m3.initial_inventory, dec!(20000));
        assert_eq!(m3.equipment_purchase, dec!(3000));
        assert_eq!(m3.system_setup, dec!(1500));
        assert_eq!(c.total, c.m1_market_entry.total + c.m2_compliance.total + m3.total);
    }

    #[test]
    fn missing_scope_is_caller_error() {
        let p = Project::new("p1", "Draft", "pet", "US", SalesChannel::Amazon);
        let err = compute_capex(&p, &CostFactor::new("US", "pet"), &CapexDefaults::default()).unwrap_err();
        assert_eq!(err, EngineError::MissingScope("p1".into()));
    }
}
