//! Accounting engine for bonding-curve token sales.
//!
//! A seller deposits a fixed supply of a token into a pool and lets buyers
//! purchase it at a price that rises with cumulative quantity sold. The
//! engine owns the pool ledger (supply caps, raised funds, lifecycle), the
//! platform fee accounting, and the decimal normalization between tokens of
//! arbitrary precision and the 18-decimal unit the pricing functions work
//! in. Curve math, value movement, token metadata, and time are consumed
//! through capability traits in [`infra`] so they can be swapped out or
//! mocked wholesale.

pub mod domain;
pub mod infra;

pub use crate::{
    domain::{
        error::Error,
        events::Event,
        ledger::{Launchpad, PoolConfig},
    },
    infra::{registry::Registry, transfer::TransferAdapter},
};
