use crate::infra::transfer::TransferError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no pool at index {0}")]
    PoolNotFound(u64),
    #[error("pool has ended and its state was cleared")]
    PoolEnded,
    #[error("sale period is over")]
    SaleClosed,
    #[error("sale period is still open")]
    SaleStillOpen,
    #[error("purchase exceeds the remaining sellable supply")]
    SupplyExhausted,
    #[error("caller is not authorized for this operation")]
    Unauthorized,
    #[error("new owner must not be the zero address")]
    InvalidOwner,
    #[error("no pricing function registered under {0:?}")]
    UnknownCurve(String),
    #[error("token reports more than 18 decimals: {0}")]
    UnsupportedDecimals(u8),
    #[error("arithmetic overflow")]
    Overflow,
    #[error("pool accounting violated an internal invariant")]
    AccountingInvariant,
    #[error("pricing function failed: {0}")]
    Pricing(#[from] curves::Error),
    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    TokenInfo(anyhow::Error),
}
