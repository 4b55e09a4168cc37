#![deny(warnings)]

//! Core domain models and invariants for landed-cost estimation.
//!
//! This crate defines the serializable value types shared by the engine,
//! the scenario layer and the factor dataset, together with validation
//! helpers that guarantee basic invariants before any arithmetic runs.

pub mod factor;
pub mod logistics;

pub use factor::{CertificationItem, CostFactor, DataTier, FactorValues};
pub use logistics::{FreightMode, LogisticsRates};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Monetary amount in the project's pricing currency.
pub type Money = Decimal;
/// Fraction in decimal form, e.g. `0.05` for 5%.
pub type Rate = Decimal;

/// Project identifier assigned by the wizard.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub String);

/// ISO country code, normalized to upper case, e.g. "US", "DE".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CountryCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for CountryCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<CountryCode> for String {
    fn from(c: CountryCode) -> Self {
        c.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Industry identifier, normalized to lower case, e.g. "pet", "electronics".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct IndustryId(String);

impl IndustryId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for IndustryId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for IndustryId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<IndustryId> for String {
    fn from(i: IndustryId) -> Self {
        i.0
    }
}

impl fmt::Display for IndustryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sales channel the product is sold through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesChannel {
    Amazon,
    Shopee,
    Lazada,
    TiktokShop,
    Walmart,
    Ebay,
    /// Direct-to-consumer storefront owned by the seller.
    Dtc,
    /// Any other marketplace.
    #[serde(other)]
    Other,
}

impl SalesChannel {
    /// Owned storefront, no marketplace commission.
    pub fn is_dtc(self) -> bool {
        matches!(self, SalesChannel::Dtc)
    }

    pub fn is_marketplace(self) -> bool {
        !self.is_dtc()
    }
}

/// Product definition entered in the wizard's product step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductInfo {
    /// Stock keeping unit.
    #[serde(default)]
    pub sku: String,
    /// Display name.
    pub name: String,
    /// Free-form product category.
    #[serde(default)]
    pub category: String,
    /// Shipping weight per unit in kg (>= 0).
    pub weight_kg: Decimal,
    /// Landed purchase cost per unit before freight (>= 0).
    pub cogs: Money,
    /// Intended selling price per unit (>= 0).
    pub target_price: Money,
}

/// Volume and behaviour assumptions for the project.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Assumptions {
    /// Expected units sold per month.
    pub monthly_sales: u64,
    /// Share of orders returned, in [0, 1]. Falls back to the factor's value when absent.
    #[serde(default)]
    pub return_rate: Option<Rate>,
}

/// The product and assumptions a project is evaluated with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectScope {
    pub product_info: ProductInfo,
    #[serde(default)]
    pub assumptions: Assumptions,
}

/// A user-defined evaluation scenario.
///
/// `scope` stays empty until the wizard's product step is complete; the
/// engine rejects projects without it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub industry: IndustryId,
    pub target_country: CountryCode,
    pub sales_channel: SalesChannel,
    #[serde(default)]
    pub scope: Option<ProjectScope>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        industry: impl Into<IndustryId>,
        target_country: impl Into<CountryCode>,
        sales_channel: SalesChannel,
    ) -> Self {
        Self {
            id: ProjectId(id.into()),
            name: name.into(),
            industry: industry.into(),
            target_country: target_country.into(),
            sales_channel,
            scope: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_scope(mut self, product_info: ProductInfo, assumptions: Assumptions) -> Self {
        self.scope = Some(ProjectScope {
            product_info,
            assumptions,
        });
        self
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Money value below zero.
    #[error("negative monetary value for {0}")]
    NegativeMoney(&'static str),
    /// Rate below zero, or above 1 for a share-of-total field.
    #[error("rate out of range for {0}")]
    RateOutOfRange(&'static str),
    /// Identifier or name is blank.
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// Magnitude above the supported ceiling.
    #[error("{0} exceeds the supported maximum")]
    TooLarge(&'static str),
}

/// Largest accepted single money amount (per unit or per fee).
pub const MAX_MONEY: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);
/// Largest accepted product weight in kilograms.
pub const MAX_WEIGHT_KG: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);
/// Largest accepted monthly unit volume.
pub const MAX_MONTHLY_SALES: u64 = 1_000_000_000;
/// Largest accepted tariff or VAT rate (1000%).
pub const MAX_TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

fn non_negative(v: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if v.is_sign_negative() && !v.is_zero() {
        return Err(ValidationError::NegativeMoney(field));
    }
    Ok(())
}

fn bounded(v: Decimal, max: Decimal, field: &'static str) -> Result<(), ValidationError> {
    non_negative(v, field)?;
    if v > max {
        return Err(ValidationError::TooLarge(field));
    }
    Ok(())
}

fn money(v: Decimal, field: &'static str) -> Result<(), ValidationError> {
    bounded(v, MAX_MONEY, field)
}

fn share(v: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if v < Decimal::ZERO || v > Decimal::ONE {
        return Err(ValidationError::RateOutOfRange(field));
    }
    Ok(())
}

/// Validate a product definition.
pub fn validate_product(p: &ProductInfo) -> Result<(), ValidationError> {
    if p.name.trim().is_empty() {
        return Err(ValidationError::Empty("product name"));
    }
    bounded(p.weight_kg, MAX_WEIGHT_KG, "weight_kg")?;
    money(p.cogs, "cogs")?;
    money(p.target_price, "target_price")?;
    Ok(())
}

/// Validate a project's identity and, when present, its scope.
pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.target_country.as_str().is_empty() {
        return Err(ValidationError::Empty("target_country"));
    }
    if project.industry.as_str().is_empty() {
        return Err(ValidationError::Empty("industry"));
    }
    if let Some(scope) = &project.scope {
        validate_product(&scope.product_info)?;
        if scope.assumptions.monthly_sales > MAX_MONTHLY_SALES {
            return Err(ValidationError::TooLarge("monthly_sales"));
        }
        if let Some(r) = scope.assumptions.return_rate {
            share(r, "return_rate")?;
        }
    }
    Ok(())
}

/// Validate the numeric content of a cost factor record.
///
/// Tariff and VAT may exceed 100%; share-of-price rates may not.
pub fn validate_factor(factor: &CostFactor) -> Result<(), ValidationError> {
    if factor.country.as_str().is_empty() {
        return Err(ValidationError::Empty("country"));
    }
    let v = &factor.values;
    let amounts = [
        (v.company_registration, "company_registration"),
        (v.business_license, "business_license"),
        (v.tax_registration, "tax_registration"),
        (v.legal_consulting, "legal_consulting"),
        (v.import_license_cost, "import_license_cost"),
        (v.certification_estimate, "certification_estimate"),
        (v.trademark_cost, "trademark_cost"),
        (v.compliance_testing_cost, "compliance_testing_cost"),
        (v.min_warehouse_sqm, "min_warehouse_sqm"),
        (v.warehouse_deposit_per_sqm, "warehouse_deposit_per_sqm"),
        (v.warehouse_deposit, "warehouse_deposit"),
        (v.equipment_purchase, "equipment_purchase"),
        (v.system_setup, "system_setup"),
        (v.last_mile_delivery, "last_mile_delivery"),
        (v.cac, "cac"),
        (v.seo_monthly, "seo_monthly"),
        (v.payment_fixed_fee, "payment_fixed_fee"),
        (v.staff_monthly, "staff_monthly"),
        (v.software_monthly, "software_monthly"),
    ];
    for (value, field) in amounts {
        if let Some(x) = value {
            money(x, field)?;
        }
    }
    for (value, field) in [
        (v.tariff_rate, "tariff_rate"),
        (v.effective_tariff_rate, "effective_tariff_rate"),
        (v.vat_rate, "vat_rate"),
    ] {
        if let Some(x) = value {
            if x.is_sign_negative() && !x.is_zero() {
                return Err(ValidationError::RateOutOfRange(field));
            }
            if x > MAX_TAX_RATE {
                return Err(ValidationError::TooLarge(field));
            }
        }
    }
    let shares = [
        (v.return_rate, "return_rate"),
        (v.return_cost_rate, "return_cost_rate"),
        (v.marketing_rate, "marketing_rate"),
        (v.ad_spend_rate, "ad_spend_rate"),
        (v.payment_gateway_rate, "payment_gateway_rate"),
        (v.platform_commission_rate, "platform_commission_rate"),
        (v.ga_rate, "ga_rate"),
        (v.customer_service_rate, "customer_service_rate"),
    ];
    for (value, field) in shares {
        if let Some(x) = value {
            share(x, field)?;
        }
    }
    if let Some(certs) = &v.certifications {
        for c in certs {
            money(c.cost, "certifications")?;
        }
    }
    if let Some(l) = &v.logistics {
        money(l.air_freight_per_kg, "air_freight_per_kg")?;
        money(l.sea_freight_per_kg, "sea_freight_per_kg")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn product() -> ProductInfo {
        ProductInfo {
            sku: "PET-001".into(),
            name: "Cat bed".into(),
            category: "pet".into(),
            weight_kg: dec!(2.0),
            cogs: dec!(10.00),
            target_price: dec!(25.00),
        }
    }

    #[test]
    fn ids_are_normalized() {
        assert_eq!(CountryCode::new(" us "), CountryCode::new("US"));
        assert_eq!(IndustryId::new("Pet"), IndustryId::new("pet"));
        let c: CountryCode = serde_json::from_str("\"de\"").unwrap();
        assert_eq!(c.as_str(), "DE");
    }

    #[test]
    fn unknown_channel_deserializes_as_other() {
        let c: SalesChannel = serde_json::from_str("\"mercado_libre\"").unwrap();
        assert_eq!(c, SalesChannel::Other);
        assert!(c.is_marketplace());
        assert!(SalesChannel::Dtc.is_dtc());
    }

    #[test]
    fn project_json_roundtrip() {
        let p = Project::new("p1", "Cat bed US", "pet", "us", SalesChannel::Amazon).with_scope(
            product(),
            Assumptions {
                monthly_sales: 1000,
                return_rate: Some(dec!(0.05)),
            },
        );
        validate_project(&p).unwrap();
        let s = serde_json::to_string_pretty(&p).unwrap();
        let back: Project = serde_json::from_str(&s).unwrap();
        assert_eq!(back.target_country.as_str(), "US");
        let scope = back.scope.unwrap();
        assert_eq!(scope.product_info.cogs, dec!(10.00));
        assert_eq!(scope.assumptions.monthly_sales, 1000);
    }

    #[test]
    fn project_without_scope_is_valid_identity() {
        let p = Project::new("p1", "Draft", "pet", "US", SalesChannel::Dtc);
        assert!(validate_project(&p).is_ok());
    }

    #[test]
    fn negative_price_rejected() {
        let mut p = product();
        p.target_price = dec!(-1);
        assert_eq!(
            validate_product(&p),
            Err(ValidationError::NegativeMoney("target_price"))
        );
    }

    #[test]
    fn factor_share_out_of_range_rejected() {
        let mut f = CostFactor::new("US", "pet");
        f.values.platform_commission_rate = Some(dec!(1.5));
        assert_eq!(
            validate_factor(&f),
            Err(ValidationError::RateOutOfRange("platform_commission_rate"))
        );
        // Tariffs above 100% exist in practice.
        f.values.platform_commission_rate = None;
        f.values.tariff_rate = Some(dec!(1.45));
        assert!(validate_factor(&f).is_ok());
    }

    #[test]
    fn oversized_magnitudes_rejected() {
        let mut p = product();
        p.cogs = dec!(1000000000000);
        assert_eq!(validate_product(&p), Err(ValidationError::TooLarge("cogs")));
        p.cogs = MAX_MONEY;
        p.weight_kg = dec!(10001);
        assert_eq!(validate_product(&p), Err(ValidationError::TooLarge("weight_kg")));

        let p = Project::new("p", "n", "pet", "US", SalesChannel::Amazon).with_scope(
            product(),
            Assumptions {
                monthly_sales: MAX_MONTHLY_SALES + 1,
                return_rate: None,
            },
        );
        assert_eq!(validate_project(&p), Err(ValidationError::TooLarge("monthly_sales")));

        let mut f = CostFactor::new("US", "pet");
        f.values.vat_rate = Some(dec!(10.5));
        assert_eq!(validate_factor(&f), Err(ValidationError::TooLarge("vat_rate")));
        f.values.vat_rate = None;
        f.values.staff_monthly = Some(dec!(2000000000));
        assert_eq!(validate_factor(&f), Err(ValidationError::TooLarge("staff_monthly")));
    }

    proptest! {
        #[test]
        fn non_negative_products_validate(w in 0i64..100_000, c in 0i64..1_000_000, p in 0i64..1_000_000) {
            let info = ProductInfo {
                weight_kg: Decimal::new(w, 3),
                cogs: Decimal::new(c, 2),
                target_price: Decimal::new(p, 2),
                ..product()
            };
            prop_assert!(validate_product(&info).is_ok());
        }

        #[test]
        fn return_rate_outside_unit_interval_rejected(r in 101i64..10_000) {
            let p = Project::new("p", "n", "pet", "US", SalesChannel::Amazon).with_scope(
                product(),
                Assumptions { monthly_sales: 1, return_rate: Some(Decimal::new(r, 2)) },
            );
            prop_assert_eq!(validate_project(&p), Err(ValidationError::RateOutOfRange("return_rate")));
        }
    }
}
