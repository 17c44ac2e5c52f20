// chain-core/src/lib.rs

//! Ledger primitives consumed by the staking framework
//!
//! This crate provides:
//! - Linear `Coin` values with capability-gated mint and burn
//! - Per-account coin stores and total-supply tracking
//! - The staking policy configuration
//! - The global timekeeper

pub mod coin;
pub mod config;
pub mod timestamp;

pub use coin::{BurnCapability, Coin, CoinLedger, MintCapability, StakeCoin};
pub use config::StakingConfig;
pub use timestamp::Timekeeper;

/// Result type for ledger operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in ledger operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    #[error("Coin store already registered for {0}")]
    StoreAlreadyRegistered(String),

    #[error("No coin store registered for {0}")]
    StoreMissing(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Global time went backwards")]
    TimeWentBackwards,
}
