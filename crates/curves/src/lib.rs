//! Pluggable pricing functions for bonding-curve token sales.
//!
//! A pricing function maps a cumulative quantity of tokens already sold (the
//! "baseline supply") to a price, and quotes trades as integrals over that
//! price. The pool accounting engine never implements curve math itself; it
//! talks to implementations of [`PricingFunction`] resolved by type name
//! through its registry, passing an opaque parameter blob that only the
//! implementation interprets.
//!
//! All payment quantities crossing this boundary are normalized to 18
//! decimals (see [`fixed_point`]); the caller is responsible for scaling
//! amounts in and out of the raising token's native precision.

pub mod error;
pub mod exponential;
pub mod fixed_point;
pub mod linear;

pub use {error::Error, exponential::Exponential, linear::Linear};

use ethereum_types::U256;

/// Opaque curve configuration, interpreted only by the pricing
/// implementation it is addressed to.
pub type Parameters = serde_json::Value;

/// Result of pricing a purchase.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BuyQuote {
    /// Tokens receivable for the offered payment.
    pub tokens_out: U256,
    /// The portion of the offered payment the curve actually consumes; never
    /// exceeds the offered payment.
    pub payment_used: U256,
}

/// Result of pricing a redemption.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SellQuote {
    /// Tokens consumed by the redemption.
    pub tokens_in: U256,
    /// Normalized payment returned for them.
    pub payment_out: U256,
}

/// A bonding curve pricing implementation.
///
/// Both quote directions price against a baseline supply: buys integrate the
/// price upwards from `supply_sold`, sells integrate downwards to it. Rounding
/// is always towards the pool, so a buy immediately followed by the inverse
/// sell can never return more payment than went in.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
pub trait PricingFunction: Send + Sync {
    /// Quotes how many tokens `payment_in` (normalized to 18 decimals) buys
    /// starting from `supply_sold` tokens already sold.
    fn quote_buy(
        &self,
        payment_in: U256,
        supply_sold: U256,
        parameters: &Parameters,
    ) -> Result<BuyQuote, Error>;

    /// Quotes the normalized payment returned for redeeming `tokens_in`
    /// against a cumulative supply of `supply_sold`.
    fn quote_sell(
        &self,
        tokens_in: U256,
        supply_sold: U256,
        parameters: &Parameters,
    ) -> Result<SellQuote, Error>;
}
