//! Chain address primitives.

pub use ethereum_types::{H160, U256};

/// An account address.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    derive_more::From,
    derive_more::Into,
)]
pub struct Address(pub H160);

impl Address {
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

/// The identity of a fungible asset.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    derive_more::From,
    derive_more::Into,
)]
pub struct TokenAddress(pub H160);

impl TokenAddress {
    /// Sentinel identity denoting the chain's native currency.
    pub const NATIVE: Self = Self(H160::repeat_byte(0xee));

    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }
}
