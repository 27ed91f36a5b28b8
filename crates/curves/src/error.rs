#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("division by zero")]
    ZeroDivision,
    #[error("arithmetic overflow")]
    Overflow,
    #[error("invalid fixed point literal {0:?}")]
    InvalidLiteral(String),
    #[error("invalid curve parameters: {0}")]
    InvalidParameters(String),
    #[error("redeem amount exceeds the baseline supply")]
    AmountExceedsSupply,
    #[error("quantity spans too many price steps")]
    StepLimitExceeded,
}
