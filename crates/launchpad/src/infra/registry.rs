//! Platform registry capability: curve resolution, tax rates, treasury.

use {
    crate::domain::{eth::Address, fees::TaxRates},
    curves::PricingFunction,
    dashmap::DashMap,
    std::sync::Arc,
};

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
pub trait Registry: Send + Sync {
    /// Looks up the pricing function registered under a curve type name.
    fn resolve_curve(&self, name: &str) -> Option<Arc<dyn PricingFunction>>;

    fn tax_rates(&self) -> TaxRates;

    /// The only address allowed to claim accumulated platform fees.
    fn treasury(&self) -> Address;
}

/// In-memory registry keyed by curve type name.
pub struct CurveRegistry {
    curves: DashMap<String, Arc<dyn PricingFunction>>,
    rates: TaxRates,
    treasury: Address,
}

impl CurveRegistry {
    pub fn new(rates: TaxRates, treasury: Address) -> Self {
        Self {
            curves: Default::default(),
            rates,
            treasury,
        }
    }

    /// Registers (or replaces) a pricing function under `name`.
    pub fn register(&self, name: impl Into<String>, curve: Arc<dyn PricingFunction>) {
        self.curves.insert(name.into(), curve);
    }
}

impl Registry for CurveRegistry {
    fn resolve_curve(&self, name: &str) -> Option<Arc<dyn PricingFunction>> {
        self.curves.get(name).map(|curve| curve.value().clone())
    }

    fn tax_rates(&self) -> TaxRates {
        self.rates
    }

    fn treasury(&self) -> Address {
        self.treasury
    }
}
