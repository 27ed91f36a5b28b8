//! Value movement capability.
//!
//! The engine never assumes a requested transfer amount arrived in full.
//! [`TransferAdapter::pull`] reports the amount that actually landed, which
//! for fungible tokens means differencing balances around the transfer so
//! fee-on-transfer tokens cannot cause accounting drift. The native
//! currency path has no balance to difference: the attached call value must
//! cover the requested amount, which is then taken verbatim.

use crate::domain::eth::{Address, TokenAddress, U256};

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("attached native value is below the requested amount")]
    InsufficientAttachedValue,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("transfer did not complete: {0}")]
    Failed(String),
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait TransferAdapter: Send + Sync {
    /// Moves `amount` of `token` from `from` into the engine's custody and
    /// returns the amount actually received. `attached` is the native value
    /// accompanying the call; it is only consulted on the native path.
    async fn pull(
        &self,
        token: TokenAddress,
        from: Address,
        amount: U256,
        attached: U256,
    ) -> Result<U256, TransferError>;

    /// Moves `amount` of `token` out of the engine's custody to `to`. Must
    /// fail loudly if the value cannot be delivered.
    async fn push(&self, token: TokenAddress, to: Address, amount: U256) -> Result<(), TransferError>;
}

pub mod in_memory {
    //! Balance-tracking adapter for tests and local wiring.

    use {super::*, dashmap::DashMap};

    /// Tracks balances per (token, account) pair, with an optional
    /// fee-on-transfer rate per token to exercise the actual-amount paths.
    /// Native currency pulled into custody is credited to the engine
    /// account like any other asset.
    pub struct Transfers {
        engine: Address,
        balances: DashMap<(TokenAddress, Address), U256>,
        transfer_fees: DashMap<TokenAddress, u16>,
    }

    impl Transfers {
        pub fn new(engine: Address) -> Self {
            Self {
                engine,
                balances: Default::default(),
                transfer_fees: Default::default(),
            }
        }

        pub fn credit(&self, token: TokenAddress, account: Address, amount: U256) {
            let mut balance = self.balances.entry((token, account)).or_default();
            *balance = balance.saturating_add(amount);
        }

        pub fn balance_of(&self, token: TokenAddress, account: Address) -> U256 {
            self.balances
                .get(&(token, account))
                .map(|balance| *balance)
                .unwrap_or_default()
        }

        /// Makes every subsequent transfer of `token` burn `bps` basis
        /// points on the way, like a fee-on-transfer token would.
        pub fn set_transfer_fee(&self, token: TokenAddress, bps: u16) {
            self.transfer_fees.insert(token, bps);
        }

        fn skim(&self, token: TokenAddress, amount: U256) -> U256 {
            let bps = self
                .transfer_fees
                .get(&token)
                .map(|bps| *bps)
                .unwrap_or_default();
            amount - amount * U256::from(bps) / U256::from(10_000)
        }

        fn debit(
            &self,
            token: TokenAddress,
            account: Address,
            amount: U256,
        ) -> Result<(), TransferError> {
            let mut balance = self.balances.entry((token, account)).or_default();
            *balance = balance
                .checked_sub(amount)
                .ok_or(TransferError::InsufficientBalance)?;
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl TransferAdapter for Transfers {
        async fn pull(
            &self,
            token: TokenAddress,
            from: Address,
            amount: U256,
            attached: U256,
        ) -> Result<U256, TransferError> {
            if token.is_native() {
                if attached < amount {
                    return Err(TransferError::InsufficientAttachedValue);
                }
                self.credit(token, self.engine, amount);
                return Ok(amount);
            }
            self.debit(token, from, amount)?;
            let received = self.skim(token, amount);
            self.credit(token, self.engine, received);
            Ok(received)
        }

        async fn push(
            &self,
            token: TokenAddress,
            to: Address,
            amount: U256,
        ) -> Result<(), TransferError> {
            self.debit(token, self.engine, amount)?;
            self.credit(token, to, self.skim(token, amount));
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn account(byte: u8) -> Address {
            Address(ethereum_types::H160::repeat_byte(byte))
        }

        #[tokio::test]
        async fn pull_reports_the_received_amount() {
            let token = TokenAddress(ethereum_types::H160::repeat_byte(1));
            let transfers = Transfers::new(account(0xaa));
            transfers.credit(token, account(1), U256::from(1_000_000));
            transfers.set_transfer_fee(token, 100);

            let received = transfers
                .pull(token, account(1), U256::from(1_000_000), U256::zero())
                .await
                .unwrap();
            assert_eq!(received, U256::from(990_000));
            assert_eq!(transfers.balance_of(token, account(0xaa)), received);
            assert_eq!(transfers.balance_of(token, account(1)), U256::zero());
        }

        #[tokio::test]
        async fn native_pull_requires_attached_value() {
            let transfers = Transfers::new(account(0xaa));
            let result = transfers
                .pull(
                    TokenAddress::NATIVE,
                    account(1),
                    U256::from(10),
                    U256::from(9),
                )
                .await;
            assert!(matches!(
                result,
                Err(TransferError::InsufficientAttachedValue)
            ));

            let received = transfers
                .pull(
                    TokenAddress::NATIVE,
                    account(1),
                    U256::from(10),
                    U256::from(10),
                )
                .await
                .unwrap();
            assert_eq!(received, U256::from(10));
        }

        #[tokio::test]
        async fn push_fails_without_custody() {
            let token = TokenAddress(ethereum_types::H160::repeat_byte(1));
            let transfers = Transfers::new(account(0xaa));
            let result = transfers.push(token, account(1), U256::from(1)).await;
            assert!(matches!(result, Err(TransferError::InsufficientBalance)));
        }
    }
}
