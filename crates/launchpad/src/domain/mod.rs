pub mod error;
pub mod eth;
pub mod events;
pub mod fees;
pub mod ledger;
pub mod pool;
