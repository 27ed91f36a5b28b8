pub mod registry;
pub mod time;
pub mod tokens;
pub mod transfer;
