//! Stepped exponential price ladder.
//!
//! The price is constant within each quantity `step` and multiplies by
//! `growth` when crossing into the next step, so the marginal price after
//! `n` full steps is `initial_price * growth^n`. Quotes walk the ladder
//! segment by segment, which keeps the buy and sell directions exactly
//! consistent with each other; the number of steps a single pool can span is
//! bounded to keep every quote cheap.

use {
    crate::{BuyQuote, Error, Parameters, PricingFunction, SellQuote, fixed_point::Bfp},
    ethereum_types::U256,
    serde::Deserialize,
};

/// Upper bound on the price step index a quote may reach.
const MAX_PRICE_STEPS: u64 = 100_000;

#[derive(Clone, Copy, Debug, Default)]
pub struct Exponential;

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Params {
    initial_price: Bfp,
    /// Price multiplier applied per step; at least 1.
    growth: Bfp,
    /// Token quantity per price step.
    step: Bfp,
}

impl Params {
    fn of(parameters: &Parameters) -> Result<Self, Error> {
        let params: Self = serde_json::from_value(parameters.clone())
            .map_err(|err| Error::InvalidParameters(err.to_string()))?;
        if params.initial_price.is_zero() {
            return Err(Error::InvalidParameters(
                "initial price must be positive".to_string(),
            ));
        }
        if params.growth < Bfp::one() {
            return Err(Error::InvalidParameters(
                "growth must be at least 1".to_string(),
            ));
        }
        if params.step.is_zero() {
            return Err(Error::InvalidParameters(
                "step quantity must be positive".to_string(),
            ));
        }
        Ok(params)
    }

    /// Index of the step containing quantity `position`.
    fn step_index(&self, position: Bfp) -> Result<u64, Error> {
        let index = position.as_uint256() / self.step.as_uint256();
        if index > U256::from(MAX_PRICE_STEPS) {
            return Err(Error::StepLimitExceeded);
        }
        Ok(index.as_u64())
    }

    /// Marginal price within step `index`.
    fn price_at(&self, index: u64) -> Result<Bfp, Error> {
        let mut price = self.initial_price;
        for _ in 0..index {
            price = price.mul_down(self.growth)?;
        }
        Ok(price)
    }

    /// Upper quantity boundary of step `index`.
    fn boundary(&self, index: u64) -> Result<Bfp, Error> {
        let scale = U256::from(index).checked_add(U256::one()).ok_or(Error::Overflow)?;
        self.step
            .as_uint256()
            .checked_mul(scale)
            .map(Bfp::from_wei)
            .ok_or(Error::Overflow)
    }
}

/// Integral of the ladder price over `[from, from + amount]`.
fn cost(params: &Params, from: Bfp, amount: Bfp) -> Result<Bfp, Error> {
    let end = from.add(amount)?;
    let mut index = params.step_index(from)?;
    let mut price = params.price_at(index)?;
    let mut position = from;
    let mut total = Bfp::zero();
    while position < end {
        let upto = params.boundary(index)?.min(end);
        total = total.add(price.mul_down(upto.sub(position)?)?)?;
        position = upto;
        if position < end {
            index += 1;
            if index > MAX_PRICE_STEPS {
                return Err(Error::StepLimitExceeded);
            }
            price = price.mul_down(params.growth)?;
        }
    }
    Ok(total)
}

impl PricingFunction for Exponential {
    fn quote_buy(
        &self,
        payment_in: U256,
        supply_sold: U256,
        parameters: &Parameters,
    ) -> Result<BuyQuote, Error> {
        let params = Params::of(parameters)?;
        let mut remaining = Bfp::from_wei(payment_in);
        let mut position = Bfp::from_wei(supply_sold);
        let mut index = params.step_index(position)?;
        let mut price = params.price_at(index)?;
        let mut bought = Bfp::zero();
        let mut used = Bfp::zero();
        loop {
            let capacity = params.boundary(index)?.sub(position)?;
            let affordable = remaining.div_down(price)?;
            if affordable.is_zero() {
                break;
            }
            if affordable < capacity {
                let spent = price.mul_down(affordable)?;
                bought = bought.add(affordable)?;
                used = used.add(spent)?;
                break;
            }
            let spent = price.mul_down(capacity)?;
            bought = bought.add(capacity)?;
            used = used.add(spent)?;
            remaining = remaining.sub(spent)?;
            position = position.add(capacity)?;
            index += 1;
            if index > MAX_PRICE_STEPS {
                return Err(Error::StepLimitExceeded);
            }
            price = price.mul_down(params.growth)?;
        }
        Ok(BuyQuote {
            tokens_out: bought.as_uint256(),
            payment_used: used.as_uint256(),
        })
    }

    fn quote_sell(
        &self,
        tokens_in: U256,
        supply_sold: U256,
        parameters: &Parameters,
    ) -> Result<SellQuote, Error> {
        let params = Params::of(parameters)?;
        let tokens = Bfp::from_wei(tokens_in);
        let sold = Bfp::from_wei(supply_sold);
        if tokens > sold {
            return Err(Error::AmountExceedsSupply);
        }
        let payment = cost(&params, sold.sub(tokens)?, tokens)?;
        Ok(SellQuote {
            tokens_in,
            payment_out: payment.as_uint256(),
        })
    }
}
