//! Ledger module: chart of accounts, journal engine, balances and fiscal periods

pub mod account;
pub mod balance;
pub mod core;
pub mod fiscal;
pub mod journal;
pub mod recipes;

pub use account::*;
pub use balance::*;
pub use core::*;
pub use fiscal::*;
pub use journal::*;
