//! Platform fee math and the treasury's fee ledger.
//!
//! Rates are basis points out of 10_000 and fees always round down. The
//! gross-up inversion used when quoting "how much must I pay to net this
//! amount" is allowed to overshoot the forward fee by a single unit; see
//! the tests for the exact bound.

use {
    crate::domain::{error::Error, eth::TokenAddress},
    ethereum_types::U256,
    serde::Deserialize,
    std::collections::HashMap,
};

const BPS_BASE: u32 = 10_000;

/// Platform tax rates reported by the registry.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaxRates {
    pub buy_bps: u16,
    pub sell_bps: u16,
}

/// `floor(gross * rate / 10_000)`.
pub fn fee_amount(gross: U256, rate_bps: u16) -> Result<U256, Error> {
    let scaled = gross
        .checked_mul(U256::from(rate_bps))
        .ok_or(Error::Overflow)?;
    Ok(scaled / U256::from(BPS_BASE))
}

/// Inverts the fee: the smallest-floored gross amount whose net portion is
/// `net`, i.e. `floor(net * 10_000 / (10_000 - rate))`.
pub fn gross_up(net: U256, rate_bps: u16) -> Result<U256, Error> {
    let rate = u32::from(rate_bps);
    if rate >= BPS_BASE {
        return Err(Error::Overflow);
    }
    let scaled = net
        .checked_mul(U256::from(BPS_BASE))
        .ok_or(Error::Overflow)?;
    Ok(scaled / U256::from(BPS_BASE - rate))
}

/// Fees owed to the platform treasury, keyed by the raising token they were
/// collected in. Only ever grows, or drains to zero in one claim.
#[derive(Debug, Default)]
pub struct FeeLedger {
    owed: HashMap<TokenAddress, U256>,
}

impl FeeLedger {
    pub fn owed(&self, token: TokenAddress) -> U256 {
        self.owed.get(&token).copied().unwrap_or_default()
    }

    pub fn accrue(&mut self, token: TokenAddress, amount: U256) -> Result<(), Error> {
        let owed = self.owed.entry(token).or_default();
        *owed = owed.checked_add(amount).ok_or(Error::Overflow)?;
        Ok(())
    }

    /// Removes and returns the full amount owed for `token`.
    pub fn drain(&mut self, token: TokenAddress) -> U256 {
        self.owed.remove(&token).unwrap_or_default()
    }
}
