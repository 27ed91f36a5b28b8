//! Token metadata capability.

use {
    crate::domain::eth::TokenAddress,
    anyhow::{Context, Result},
    std::collections::HashMap,
};

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait TokenInfoFetching: Send + Sync {
    /// The number of decimals the token reports.
    async fn decimals(&self, token: TokenAddress) -> Result<u8>;
}

/// Static decimals table for tests and local wiring.
pub struct TokenInfos(HashMap<TokenAddress, u8>);

impl TokenInfos {
    pub fn new(decimals: HashMap<TokenAddress, u8>) -> Self {
        Self(decimals)
    }
}

#[async_trait::async_trait]
impl TokenInfoFetching for TokenInfos {
    async fn decimals(&self, token: TokenAddress) -> Result<u8> {
        self.0
            .get(&token)
            .copied()
            .with_context(|| format!("no decimals known for token {:?}", token.0))
    }
}
