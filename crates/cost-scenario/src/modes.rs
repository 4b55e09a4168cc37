//! Representative rates for the operating modes a scenario can select.

use cost_core::{FactorValues, FreightMode, LogisticsRates, Money, Rate};
use cost_engine::EngineError;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogisticsMode {
    Sea,
    Air,
    /// Courier air service, priced above standard air freight.
    Express,
}

impl LogisticsMode {
    pub fn freight_mode(self) -> FreightMode {
        match self {
            LogisticsMode::Sea => FreightMode::Sea,
            LogisticsMode::Air | LogisticsMode::Express => FreightMode::Air,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentMode {
    SelfShip,
    ThirdPartyWarehouse,
    /// Marketplace-operated fulfillment.
    Platform,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentGateway {
    Stripe,
    #[serde(rename = "paypal")]
    PayPal,
    LocalWallet,
    PlatformPay,
}

/// Percentage plus fixed fee per transaction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GatewayFee {
    pub rate: Rate,
    pub fixed: Money,
}

/// Last-mile cost per unit for each fulfillment mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FulfillmentRates {
    pub self_ship: Money,
    pub third_party_warehouse: Money,
    pub platform: Money,
}

impl Default for FulfillmentRates {
    fn default() -> Self {
        Self {
            self_ship: dec!(6.00),
            third_party_warehouse: dec!(4.50),
            platform: dec!(3.50),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayRates {
    pub stripe: GatewayFee,
    pub paypal: GatewayFee,
    pub local_wallet: GatewayFee,
    pub platform_pay: GatewayFee,
}

impl Default for GatewayRates {
    fn default() -> Self {
        Self {
            stripe: GatewayFee { rate: dec!(0.029), fixed: dec!(0.30) },
            paypal: GatewayFee { rate: dec!(0.0349), fixed: dec!(0.49) },
            local_wallet: GatewayFee { rate: dec!(0.020), fixed: dec!(0.10) },
            // Settled inside the marketplace commission.
            platform_pay: GatewayFee { rate: dec!(0), fixed: dec!(0) },
        }
    }
}

/// Lookup tables behind the scenario mode switches.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeTables {
    /// Air freight per kg when express courier service is selected.
    pub express_air_per_kg: Money,
    /// Air transit time quoted for express service.
    pub express_air_transit_days: u16,
    pub fulfillment: FulfillmentRates,
    pub gateways: GatewayRates,
}

impl Default for ModeTables {
    fn default() -> Self {
        Self {
            express_air_per_kg: dec!(8.00),
            express_air_transit_days: 3,
            fulfillment: FulfillmentRates::default(),
            gateways: GatewayRates::default(),
        }
    }
}

impl ModeTables {
    /// Parse YAML overrides; omitted entries keep the defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, EngineError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn last_mile(&self, mode: FulfillmentMode) -> Money {
        match mode {
            FulfillmentMode::SelfShip => self.fulfillment.self_ship,
            FulfillmentMode::ThirdPartyWarehouse => self.fulfillment.third_party_warehouse,
            FulfillmentMode::Platform => self.fulfillment.platform,
        }
    }

    pub fn gateway(&self, gateway: PaymentGateway) -> GatewayFee {
        match gateway {
            PaymentGateway::Stripe => self.gateways.stripe,
            PaymentGateway::PayPal => self.gateways.paypal,
            PaymentGateway::LocalWallet => self.gateways.local_wallet,
            PaymentGateway::PlatformPay => self.gateways.platform_pay,
        }
    }

    /// Factor overrides implied by the selected modes.
    ///
    /// `base_logistics` is the market's freight table; express service
    /// replaces only its air rate.
    pub fn overrides(
        &self,
        logistics: Option<LogisticsMode>,
        fulfillment: Option<FulfillmentMode>,
        gateway: Option<PaymentGateway>,
        base_logistics: Option<&LogisticsRates>,
    ) -> FactorValues {
        let mut v = FactorValues::default();
        if logistics == Some(LogisticsMode::Express) {
            let mut rates = base_logistics.cloned().unwrap_or_default();
            rates.air_freight_per_kg = self.express_air_per_kg;
            rates.air_transit_days = Some(self.express_air_transit_days);
            v.logistics = Some(rates);
        }
        if let Some(mode) = fulfillment {
            v.last_mile_delivery = Some(self.last_mile(mode));
        }
        if let Some(g) = gateway {
            let fee = self.gateway(g);
            v.payment_gateway_rate = Some(fee.rate);
            v.payment_fixed_fee = Some(fee.fixed);
        }
        v
    }
}
