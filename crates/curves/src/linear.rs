//! Affine price curve: `price(q) = initial_price + slope * q`.
//!
//! Trade quotes are exact integrals over that price. The buy direction
//! inverts the integral with the quadratic formula, using an integer square
//! root that rounds down so quoted token amounts never cost more than the
//! payment offered.

use {
    crate::{BuyQuote, Error, Parameters, PricingFunction, SellQuote, fixed_point::Bfp},
    ethereum_types::U256,
    serde::Deserialize,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct Linear;

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct Params {
    initial_price: Bfp,
    slope: Bfp,
}

impl Params {
    fn of(parameters: &Parameters) -> Result<Self, Error> {
        let params: Self = serde_json::from_value(parameters.clone())
            .map_err(|err| Error::InvalidParameters(err.to_string()))?;
        if params.initial_price.is_zero() && params.slope.is_zero() {
            return Err(Error::InvalidParameters(
                "price must not be identically zero".to_string(),
            ));
        }
        Ok(params)
    }
}

/// Integral of the price over `[from, from + amount]`:
/// `initial_price * amount + slope * (from * amount + amount^2 / 2)`.
fn cost(params: &Params, from: Bfp, amount: Bfp) -> Result<Bfp, Error> {
    let flat = params.initial_price.mul_down(amount)?;
    let ramp = params.slope.mul_down(
        from.mul_down(amount)?
            .add(amount.mul_down(amount)?.half())?,
    )?;
    flat.add(ramp)
}

impl PricingFunction for Linear {
    fn quote_buy(
        &self,
        payment_in: U256,
        supply_sold: U256,
        parameters: &Parameters,
    ) -> Result<BuyQuote, Error> {
        let params = Params::of(parameters)?;
        let payment = Bfp::from_wei(payment_in);
        let sold = Bfp::from_wei(supply_sold);
        let tokens = if params.slope.is_zero() {
            payment.div_down(params.initial_price)?
        } else {
            // Solving `base * t + slope * t^2 / 2 = payment` for t, where
            // `base` is the marginal price at the baseline supply.
            let base = params.initial_price.add(params.slope.mul_down(sold)?)?;
            let twice_area = params.slope.mul_down(payment)?;
            let radicand = base
                .mul_down(base)?
                .add(twice_area.add(twice_area)?)?;
            // The floored sqrt can land a hair below `base` when the
            // payment term rounds away entirely; that is a zero quote, not
            // an underflow.
            let root = radicand.sqrt()?;
            if root <= base {
                Bfp::zero()
            } else {
                root.sub(base)?.div_down(params.slope)?
            }
        };
        let used = cost(&params, sold, tokens)?;
        debug_assert!(used <= payment);
        Ok(BuyQuote {
            tokens_out: tokens.as_uint256(),
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

#[cfg(test)]
mod tests {
    use {super::*, crate::bfp, serde_json::json};

    fn params(initial_price: &str, slope: &str) -> Parameters {
        json!({ "initialPrice": initial_price, "slope": slope })
    }

    fn wei(amount: &str) -> U256 {
        bfp!(amount).as_uint256()
    }

    #[test]
    fn rejects_bad_parameters() {
        let curve = Linear;
        assert!(matches!(
            curve.quote_buy(wei("1.0"), U256::zero(), &params("0.0", "0.0")),
            Err(Error::InvalidParameters(_)),
        ));
        assert!(matches!(
            curve.quote_buy(wei("1.0"), U256::zero(), &json!({ "slope": "1.0" })),
            Err(Error::InvalidParameters(_)),
        ));
    }

    #[test]
    fn flat_price_is_proportional() {
        let curve = Linear;
        let quote = curve
            .quote_buy(wei("5.0"), U256::zero(), &params("1.0", "0.0"))
            .unwrap();
        assert_eq!(quote.tokens_out, wei("5.0"));
        assert_eq!(quote.payment_used, wei("5.0"));

        let quote = curve
            .quote_buy(wei("5.0"), U256::zero(), &params("2.0", "0.0"))
            .unwrap();
        assert_eq!(quote.tokens_out, wei("2.5"));
        assert_eq!(quote.payment_used, wei("5.0"));
    }

    #[test]
    fn sloped_buy_inverts_the_integral() {
        let curve = Linear;
        // price(q) = q, so buying from zero costs t^2 / 2.
        let quote = curve
            .quote_buy(wei("2.0"), U256::zero(), &params("0.0", "1.0"))
            .unwrap();
        assert_eq!(quote.tokens_out, wei("2.0"));
        assert_eq!(quote.payment_used, wei("2.0"));

        // From a baseline of 2 sold, 6.0 of payment buys exactly 2 more:
        // integral of q over [2, 4] is 6.
        let quote = curve
            .quote_buy(wei("6.0"), wei("2.0"), &params("0.0", "1.0"))
            .unwrap();
        assert_eq!(quote.tokens_out, wei("2.0"));
        assert_eq!(quote.payment_used, wei("6.0"));
    }

    #[test]
    fn sell_mirrors_buy() {
        let curve = Linear;
        let parameters = params("1.0", "0.5");
        let bought = curve
            .quote_buy(wei("10.0"), U256::zero(), &parameters)
            .unwrap();
        let sold = curve
            .quote_sell(bought.tokens_out, bought.tokens_out, &parameters)
            .unwrap();
        // Rounding always favors the pool.
        assert!(sold.payment_out <= bought.payment_used);
        // ... but only by integral truncation, not materially.
        assert!(sold.payment_out >= bought.payment_used - U256::from(10));
    }

    #[test]
    fn sell_beyond_baseline_is_rejected() {
        let curve = Linear;
        assert_eq!(
            curve.quote_sell(wei("2.0"), wei("1.0"), &params("1.0", "0.0")),
            Err(Error::AmountExceedsSupply),
        );
    }

    #[test]
    fn dust_payment_quotes_zero_tokens() {
        let curve = Linear;
        let quote = curve
            .quote_buy(U256::one(), wei("1.0"), &params("1.0", "1.0"))
            .unwrap();
        assert_eq!(quote.tokens_out, U256::zero());
        assert_eq!(quote.payment_used, U256::zero());
    }

    #[test]
    fn buy_never_overspends() {
        let curve = Linear;
        let parameters = params("0.1", "3.7");
        for payment in [1_u64, 17, 1_000, 123_456_789] {
            let payment = U256::from(payment) * U256::exp10(15);
            let quote = curve
                .quote_buy(payment, wei("9.0"), &parameters)
                .unwrap();
            assert!(quote.payment_used <= payment);
        }
    }
}
