//! Per-pool sale state.

use {
    crate::domain::{
        error::Error,
        eth::{Address, TokenAddress, U256},
    },
    curves::{Parameters, PricingFunction},
    std::sync::Arc,
};

/// Ending a pool clears its accounting fields, so the tag is what makes an
/// ended pool distinguishable from a freshly created all-zero one.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lifecycle {
    Active,
    Ended,
}

/// One token sale. Identified by its index in the ledger's append-only pool
/// list; indices are never reused.
#[derive(Clone)]
pub struct Pool {
    /// The payment asset buyers spend.
    pub raising_token: TokenAddress,
    /// The asset being sold.
    pub token: TokenAddress,
    pub curve: Arc<dyn PricingFunction>,
    /// Opaque curve configuration, never inspected by the engine.
    pub parameters: Parameters,
    pub owner: Address,
    /// Immutable cap on cumulative tokens sellable.
    pub token_to_sell: U256,
    /// Cumulative tokens sold; never exceeds `token_to_sell`.
    pub token_sold: U256,
    /// Net payment held for the owner, released in full at end.
    pub raising_amount: U256,
    /// Unix timestamp after which trading stops. Zero means the sale has no
    /// fixed end and closes itself on near-exhaustion.
    pub end_time: u64,
    /// Scaling factor normalizing raising token amounts to 18 decimals.
    pub gap: U256,
    pub lifecycle: Lifecycle,
}

impl Pool {
    pub fn remaining_supply(&self) -> U256 {
        self.token_to_sell - self.token_sold
    }

    pub fn is_past_end(&self, now: u64) -> bool {
        self.end_time != 0 && now > self.end_time
    }

    /// Cumulative sales at or beyond this level leave only an unsellable
    /// dust remainder (0.0001% of the cap), closing an open-ended pool.
    pub fn dust_threshold(&self) -> U256 {
        self.token_to_sell - self.token_to_sell / U256::from(1_000_000)
    }

    /// Scales a raising token amount up to the pricing function's
    /// 18-decimal unit.
    pub fn normalize(&self, amount: U256) -> Result<U256, Error> {
        amount.checked_mul(self.gap).ok_or(Error::Overflow)
    }

    /// Scales a normalized payment back down to raising token units.
    pub fn denormalize(&self, amount: U256) -> U256 {
        amount / self.gap
    }
}

/// `10^(18 - decimals)`, the factor between a token's native precision and
/// the pricing functions' fixed 18-decimal unit.
pub fn gap_from_decimals(decimals: u8) -> Result<U256, Error> {
    let exp = 18u8
        .checked_sub(decimals)
        .ok_or(Error::UnsupportedDecimals(decimals))?;
    Ok(U256::exp10(exp.into()))
}
