//! The pool ledger, the authoritative state of every sale.
//!
//! Mutating operations follow a strict pull, validate, commit order: value
//! is pulled first so the amount that actually arrived (not the amount
//! requested) is the ground truth for all subsequent math, validation runs
//! against that amount, and the outgoing leg is delivered before any ledger
//! field changes. A failure at any point after the pull refunds the pulled
//! value, so every call either fully commits or leaves no trace. Callers
//! are expected to serialize mutating calls; the `&mut self` receivers
//! enforce that within one engine instance.

use {
    crate::{
        domain::{
            error::Error,
            eth::{Address, TokenAddress, U256},
            events::{Event, Events},
            fees::{self, FeeLedger},
            pool::{self, Lifecycle, Pool},
        },
        infra::{
            registry::Registry, time::Clock, tokens::TokenInfoFetching, transfer::TransferAdapter,
        },
    },
    curves::Parameters,
    std::sync::Arc,
    tokio::sync::broadcast,
};

/// Everything needed to open a new sale.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// The payment asset buyers spend.
    pub raising_token: TokenAddress,
    /// The asset being sold.
    pub token: TokenAddress,
    /// Curve type name, resolved through the registry.
    pub curve: String,
    /// Cap on cumulative tokens sellable; also the deposit requested from
    /// the creator.
    pub sell_amount: U256,
    /// Unix timestamp after which trading stops, or 0 for a sale that only
    /// ends on near-exhaustion.
    pub end_time: u64,
    /// Opaque curve configuration.
    pub parameters: Parameters,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BuyEstimate {
    pub tokens_out: U256,
    pub fee: U256,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BuyNeedEstimate {
    /// Gross payment that nets out to the quoted purchase after the buy tax.
    pub payment_needed: U256,
    pub fee: U256,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SellEstimate {
    pub payment_out: U256,
    pub fee: U256,
}

/// The committed result of a buy or sell.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TradeOutcome {
    /// Tokens delivered to (buy) or taken from (sell) the caller.
    pub tokens: U256,
    /// Payment taken from (buy) or delivered to (sell) the caller.
    pub payment: U256,
    pub fee: U256,
}

struct PreparedBuy {
    fee: U256,
    tokens_out: U256,
    new_token_sold: U256,
    new_raising_amount: U256,
}

struct PreparedSell {
    fee: U256,
    payment_out: U256,
    new_token_sold: U256,
    new_raising_amount: U256,
}

pub struct Launchpad {
    registry: Arc<dyn Registry>,
    tokens: Arc<dyn TokenInfoFetching>,
    transfers: Arc<dyn TransferAdapter>,
    clock: Arc<dyn Clock>,
    pools: Vec<Pool>,
    fees: FeeLedger,
    events: Events,
}

impl Launchpad {
    pub fn new(
        registry: Arc<dyn Registry>,
        tokens: Arc<dyn TokenInfoFetching>,
        transfers: Arc<dyn TransferAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            tokens,
            transfers,
            clock,
            pools: Vec::new(),
            fees: FeeLedger::default(),
            events: Events::default(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn pool(&self, index: u64) -> Result<&Pool, Error> {
        self.pools
            .get(index as usize)
            .ok_or(Error::PoolNotFound(index))
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn platform_fee_owed(&self, token: TokenAddress) -> U256 {
        self.fees.owed(token)
    }

    /// Opens a new sale funded by a deposit of `sell_amount` of the sold
    /// token from the caller. The cap stays at the requested amount even if
    /// a fee-on-transfer token under-funds the deposit; correcting for that
    /// is the creator's responsibility.
    pub async fn create_pool(
        &mut self,
        caller: Address,
        config: PoolConfig,
        attached: U256,
    ) -> Result<u64, Error> {
        let curve = self
            .registry
            .resolve_curve(&config.curve)
            .ok_or_else(|| Error::UnknownCurve(config.curve.clone()))?;
        let decimals = if config.raising_token.is_native() {
            18
        } else {
            self.tokens
                .decimals(config.raising_token)
                .await
                .map_err(Error::TokenInfo)?
        };
        let gap = pool::gap_from_decimals(decimals)?;

        let received = self
            .transfers
            .pull(config.token, caller, config.sell_amount, attached)
            .await?;
        if received < config.sell_amount {
            tracing::warn!(
                requested = ?config.sell_amount,
                ?received,
                "pool deposit arrived short, sale cap unchanged"
            );
        }

        let index = self.pools.len() as u64;
        self.pools.push(Pool {
            raising_token: config.raising_token,
            token: config.token,
            curve,
            parameters: config.parameters,
            owner: caller,
            token_to_sell: config.sell_amount,
            token_sold: U256::zero(),
            raising_amount: U256::zero(),
            end_time: config.end_time,
            gap,
            lifecycle: Lifecycle::Active,
        });
        tracing::info!(pool = index, curve = %config.curve, "pool created");
        self.events.publish(Event::PoolCreated {
            index,
            raising_token: config.raising_token,
            token: config.token,
        });
        Ok(index)
    }

    /// Spends up to `amount_pay` of the raising token on pool tokens.
    /// `attached` is the native value sent along with the call.
    pub async fn buy(
        &mut self,
        caller: Address,
        index: u64,
        amount_pay: U256,
        attached: U256,
    ) -> Result<TradeOutcome, Error> {
        let now = self.clock.now();
        let (raising_token, token) = {
            let pool = self.active_pool(index)?;
            if pool.is_past_end(now) {
                return Err(Error::SaleClosed);
            }
            (pool.raising_token, pool.token)
        };
        let rates = self.registry.tax_rates();

        let actual = self
            .transfers
            .pull(raising_token, caller, amount_pay, attached)
            .await?;
        let prepared = match self.prepare_buy(index, actual, rates.buy_bps) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.refund(raising_token, caller, actual).await;
                return Err(err);
            }
        };
        if let Err(err) = self
            .transfers
            .push(token, caller, prepared.tokens_out)
            .await
        {
            self.refund(raising_token, caller, actual).await;
            return Err(err.into());
        }

        self.fees.accrue(raising_token, prepared.fee)?;
        let pool = &mut self.pools[index as usize];
        pool.token_sold = prepared.new_token_sold;
        pool.raising_amount = prepared.new_raising_amount;
        if pool.end_time == 0 && pool.token_sold >= pool.dust_threshold() {
            pool.end_time = now.saturating_sub(1);
            tracing::info!(pool = index, "supply nearly exhausted, sale closed");
        }
        tracing::debug!(
            pool = index,
            payment = ?actual,
            tokens = ?prepared.tokens_out,
            fee = ?prepared.fee,
            "tokens bought"
        );
        self.events.publish(Event::TokensBought {
            index,
            buyer: caller,
            payment_in: actual,
            tokens_out: prepared.tokens_out,
            fee: prepared.fee,
        });
        Ok(TradeOutcome {
            tokens: prepared.tokens_out,
            payment: actual,
            fee: prepared.fee,
        })
    }

    /// Buys a target number of tokens by first quoting the gross payment
    /// they need and then spending exactly that.
    pub async fn buy_exact(
        &mut self,
        caller: Address,
        index: u64,
        tokens_wanted: U256,
        attached: U256,
    ) -> Result<TradeOutcome, Error> {
        let need = self.estimate_buy_need(index, tokens_wanted)?;
        self.buy(caller, index, need.payment_needed, attached).await
    }

    /// Redeems pool tokens back into the raising token. `attached` is the
    /// native value sent along, for pools that sell the native currency.
    pub async fn sell(
        &mut self,
        caller: Address,
        index: u64,
        token_amount: U256,
        attached: U256,
    ) -> Result<TradeOutcome, Error> {
        let now = self.clock.now();
        let (raising_token, token) = {
            let pool = self.active_pool(index)?;
            if pool.is_past_end(now) {
                return Err(Error::SaleClosed);
            }
            (pool.raising_token, pool.token)
        };
        let rates = self.registry.tax_rates();

        let actual = self
            .transfers
            .pull(token, caller, token_amount, attached)
            .await?;
        let prepared = match self.prepare_sell(index, actual, rates.sell_bps) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.refund(token, caller, actual).await;
                return Err(err);
            }
        };
        if let Err(err) = self
            .transfers
            .push(raising_token, caller, prepared.payment_out)
            .await
        {
            self.refund(token, caller, actual).await;
            return Err(err.into());
        }

        self.fees.accrue(raising_token, prepared.fee)?;
        let pool = &mut self.pools[index as usize];
        pool.token_sold = prepared.new_token_sold;
        pool.raising_amount = prepared.new_raising_amount;
        tracing::debug!(
            pool = index,
            tokens = ?actual,
            payment = ?prepared.payment_out,
            fee = ?prepared.fee,
            "tokens sold"
        );
        self.events.publish(Event::TokensSold {
            index,
            seller: caller,
            tokens_in: actual,
            payment_out: prepared.payment_out,
            fee: prepared.fee,
        });
        Ok(TradeOutcome {
            tokens: actual,
            payment: prepared.payment_out,
            fee: prepared.fee,
        })
    }

    /// Pays the pool's entire raised amount out to the owner and clears the
    /// pool's state. Terminal; the index rejects all further operations.
    pub async fn end_pool(&mut self, caller: Address, index: u64) -> Result<U256, Error> {
        let now = self.clock.now();
        let (owner, raising_token, raised, end_time) = {
            let pool = self.active_pool(index)?;
            (
                pool.owner,
                pool.raising_token,
                pool.raising_amount,
                pool.end_time,
            )
        };
        if caller != owner {
            return Err(Error::Unauthorized);
        }
        if end_time == 0 || now <= end_time {
            return Err(Error::SaleStillOpen);
        }

        self.transfers.push(raising_token, owner, raised).await?;
        let pool = &mut self.pools[index as usize];
        pool.owner = Address::default();
        pool.token_to_sell = U256::zero();
        pool.token_sold = U256::zero();
        pool.raising_amount = U256::zero();
        pool.end_time = 0;
        pool.lifecycle = Lifecycle::Ended;
        tracing::info!(pool = index, ?raised, "pool ended");
        self.events.publish(Event::PoolEnded { index, raised });
        Ok(raised)
    }

    pub fn change_owner(
        &mut self,
        caller: Address,
        index: u64,
        new_owner: Address,
    ) -> Result<(), Error> {
        if new_owner.is_zero() {
            return Err(Error::InvalidOwner);
        }
        let pool = self.active_pool_mut(index)?;
        if pool.owner != caller {
            return Err(Error::Unauthorized);
        }
        pool.owner = new_owner;
        Ok(())
    }

    /// Projects a buy of `gross_pay` raising token units without mutating.
    pub fn estimate_buy(&self, index: u64, gross_pay: U256) -> Result<BuyEstimate, Error> {
        let pool = self.active_pool(index)?;
        let rates = self.registry.tax_rates();
        let fee = fees::fee_amount(gross_pay, rates.buy_bps)?;
        let net = gross_pay.checked_sub(fee).ok_or(Error::Overflow)?;
        let quote = pool
            .curve
            .quote_buy(pool.normalize(net)?, pool.token_sold, &pool.parameters)?;
        Ok(BuyEstimate {
            tokens_out: quote.tokens_out,
            fee,
        })
    }

    /// Projects the gross payment needed to buy `tokens_wanted`, clamped to
    /// the remaining supply. Quotes the curve in the sell direction against
    /// the post-purchase baseline and grosses the result up by the buy tax.
    pub fn estimate_buy_need(
        &self,
        index: u64,
        tokens_wanted: U256,
    ) -> Result<BuyNeedEstimate, Error> {
        let pool = self.active_pool(index)?;
        let rates = self.registry.tax_rates();
        let tokens = tokens_wanted.min(pool.remaining_supply());
        let baseline = pool.token_sold + tokens;
        let quote = pool.curve.quote_sell(tokens, baseline, &pool.parameters)?;
        let net = pool.denormalize(quote.payment_out);
        let payment_needed = fees::gross_up(net, rates.buy_bps)?;
        let fee = fees::fee_amount(payment_needed, rates.buy_bps)?;
        Ok(BuyNeedEstimate { payment_needed, fee })
    }

    /// Projects a redemption of `token_amount` pool tokens without mutating.
    pub fn estimate_sell(&self, index: u64, token_amount: U256) -> Result<SellEstimate, Error> {
        let pool = self.active_pool(index)?;
        let rates = self.registry.tax_rates();
        let quote = pool
            .curve
            .quote_sell(token_amount, pool.token_sold, &pool.parameters)?;
        let gross = pool.denormalize(quote.payment_out);
        let fee = fees::fee_amount(gross, rates.sell_bps)?;
        let payment_out = gross.checked_sub(fee).ok_or(Error::Overflow)?;
        Ok(SellEstimate { payment_out, fee })
    }

    /// Pays all accumulated fees for `token` out to the treasury, in full.
    /// Only the treasury may call; a second claim with no intervening trade
    /// yields zero.
    pub async fn claim_platform_fee(
        &mut self,
        caller: Address,
        token: TokenAddress,
    ) -> Result<U256, Error> {
        if caller != self.registry.treasury() {
            return Err(Error::Unauthorized);
        }
        let amount = self.fees.drain(token);
        if amount.is_zero() {
            return Ok(amount);
        }
        if let Err(err) = self.transfers.push(token, caller, amount).await {
            self.fees.accrue(token, amount)?;
            return Err(err.into());
        }
        tracing::info!(?token, ?amount, "platform fee claimed");
        self.events.publish(Event::PlatformFeeClaimed { token, amount });
        Ok(amount)
    }

    fn active_pool(&self, index: u64) -> Result<&Pool, Error> {
        let pool = self.pool(index)?;
        match pool.lifecycle {
            Lifecycle::Active => Ok(pool),
            Lifecycle::Ended => Err(Error::PoolEnded),
        }
    }

    fn active_pool_mut(&mut self, index: u64) -> Result<&mut Pool, Error> {
        let pool = self
            .pools
            .get_mut(index as usize)
            .ok_or(Error::PoolNotFound(index))?;
        match pool.lifecycle {
            Lifecycle::Active => Ok(pool),
            Lifecycle::Ended => Err(Error::PoolEnded),
        }
    }

    /// All fallible buy math, run between the pull and any state change so
    /// that a failure can still unwind cleanly.
    fn prepare_buy(&self, index: u64, actual_pay: U256, buy_bps: u16) -> Result<PreparedBuy, Error> {
        let pool = &self.pools[index as usize];
        let fee = fees::fee_amount(actual_pay, buy_bps)?;
        let net = actual_pay.checked_sub(fee).ok_or(Error::Overflow)?;
        let quote = pool
            .curve
            .quote_buy(pool.normalize(net)?, pool.token_sold, &pool.parameters)?;
        let new_token_sold = pool
            .token_sold
            .checked_add(quote.tokens_out)
            .ok_or(Error::Overflow)?;
        if new_token_sold > pool.token_to_sell {
            return Err(Error::SupplyExhausted);
        }
        let new_raising_amount = pool
            .raising_amount
            .checked_add(net)
            .ok_or(Error::Overflow)?;
        Ok(PreparedBuy {
            fee,
            tokens_out: quote.tokens_out,
            new_token_sold,
            new_raising_amount,
        })
    }

    fn prepare_sell(
        &self,
        index: u64,
        actual_tokens: U256,
        sell_bps: u16,
    ) -> Result<PreparedSell, Error> {
        let pool = &self.pools[index as usize];
        if actual_tokens > pool.token_sold {
            tracing::error!(
                pool = index,
                tokens = ?actual_tokens,
                sold = ?pool.token_sold,
                "redemption exceeds cumulative sales"
            );
            return Err(Error::AccountingInvariant);
        }
        let quote = pool
            .curve
            .quote_sell(actual_tokens, pool.token_sold, &pool.parameters)?;
        let gross = pool.denormalize(quote.payment_out);
        // A payout above the held raised amount means the curve quote
        // disagrees with historical accounting. Fatal, not user error.
        if gross > pool.raising_amount {
            tracing::error!(
                pool = index,
                payout = ?gross,
                held = ?pool.raising_amount,
                "redemption payout exceeds held funds"
            );
            return Err(Error::AccountingInvariant);
        }
        let fee = fees::fee_amount(gross, sell_bps)?;
        let payment_out = gross.checked_sub(fee).ok_or(Error::Overflow)?;
        Ok(PreparedSell {
            fee,
            payment_out,
            new_token_sold: pool.token_sold - actual_tokens,
            new_raising_amount: pool.raising_amount - gross,
        })
    }

    /// Returns pulled value after a rejected trade. Failure to refund is
    /// logged but does not mask the original error.
    async fn refund(&self, token: TokenAddress, to: Address, amount: U256) {
        if amount.is_zero() {
            return;
        }
        if let Err(err) = self.transfers.push(token, to, amount).await {
            tracing::error!(?token, ?amount, ?err, "failed to refund a rejected trade");
        }
    }
}
