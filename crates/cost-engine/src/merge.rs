//! Shallow override merge producing the effective factor.

use cost_core::{CostFactor, FactorValues};
use std::borrow::Cow;

/// Apply every `Some` field of `$over` onto `$base`, recording its name.
///
/// The field list destructures `FactorValues` without `..`, so a field
/// missing from it is a compile error.
macro_rules! overlay {
    ($base:expr, $over:expr, $changed:expr; $($field:ident),+ $(,)?) => {
        let FactorValues { $($field),+ } = $over;
        $(
            if let Some(v) = $field {
                $base.$field = Some(v.clone());
                $changed.push(stringify!($field));
            }
        )+
    };
}

fn apply(base: &mut FactorValues, over: &FactorValues) -> Vec<&'static str> {
    let mut changed = Vec::new();
    overlay!(base, over, changed;
        company_registration,
        business_license,
        tax_registration,
        legal_consulting,
        import_license_required,
        import_license_cost,
        certifications,
        certification_estimate,
        trademark_cost,
        compliance_testing_cost,
        min_warehouse_sqm,
        warehouse_deposit_per_sqm,
        warehouse_deposit,
        equipment_purchase,
        system_setup,
        tariff_rate,
        effective_tariff_rate,
        vat_rate,
        logistics,
        last_mile_delivery,
        return_rate,
        return_cost_rate,
        marketing_rate,
        cac,
        ad_spend_rate,
        seo_monthly,
        payment_gateway_rate,
        payment_fixed_fee,
        platform_commission_rate,
        ga_rate,
        customer_service_rate,
        staff_monthly,
        software_monthly,
    );
    changed
}

/// Merge user overrides onto a resolved record.
///
/// Without overrides the base is returned borrowed. Nested values such as
/// `logistics` and `certifications` are replaced whole, never deep-merged.
pub fn merge<'a>(base: &'a CostFactor, overrides: Option<&FactorValues>) -> Cow<'a, CostFactor> {
    match overrides {
        None => Cow::Borrowed(base),
        Some(over) => {
            let mut effective = base.clone();
            apply(&mut effective.values, over);
            Cow::Owned(effective)
        }
    }
}

/// Names of the fields an override record sets, in declaration order.
pub fn overridden_fields(overrides: &FactorValues) -> Vec<&'static str> {
    apply(&mut FactorValues::default(), overrides)
}

/// Overlay `over` onto `base` in place; later layers win.
pub fn layer(base: &mut FactorValues, over: &FactorValues) {
    apply(base, over);
}
