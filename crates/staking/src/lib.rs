// staking/src/lib.rs

//! Validator staking core
//!
//! This crate implements the on-chain staking subsystem:
//! - Per-validator stake pools with four time-phased buckets
//! - The validator set and its pending join/leave queues
//! - Per-epoch reward minting driven by proposal performance
//! - Lockup-based withdrawal semantics
//! - The genesis bootstrap and the block prologue that drives epochs
//!
//! Stake moves through `pending_active → active → pending_inactive →
//! inactive`; membership and voting-power changes commit only at epoch
//! boundaries via [`StakingEngine::on_new_epoch`].

pub mod block;
pub mod capability;
pub mod engine;
pub mod epoch;
pub mod events;
pub mod genesis;
pub mod performance;
pub mod pool;
pub mod rewards;
pub mod validator;

pub use block::BlockTracker;
pub use capability::{OwnerCapability, Signer};
pub use engine::StakingEngine;
pub use events::{EventLog, StakingEvent};
pub use genesis::{Framework, GenesisConfig, ValidatorGenesisInfo};
pub use performance::{IndividualValidatorPerformance, ValidatorPerformance};
pub use pool::StakePool;
pub use validator::{ValidatorConfig, ValidatorInfo, ValidatorSet, ValidatorState};

use chain_core::CoreError;
use chain_crypto::Address;

/// Result type for staking operations
pub type StakingResult<T> = Result<T, StakingError>;

/// Errors that can occur in staking operations
#[derive(Debug, thiserror::Error)]
pub enum StakingError {
    #[error("Account is not the pool operator")]
    NotOperator,

    #[error("Stake pool already exists at {0}")]
    AlreadyRegistered(Address),

    #[error("Validator set changes are currently disabled")]
    SetChangeDisabled,

    #[error("Invalid consensus public key or proof of possession")]
    InvalidPublicKey,

    #[error("Stake amount must be greater than zero")]
    InvalidStakeAmount,

    #[error("Stake {actual} is below the required minimum {minimum}")]
    StakeTooLow { actual: u64, minimum: u64 },

    #[error("Stake {actual} is above the allowed maximum {maximum}")]
    StakeTooHigh { actual: u64, maximum: u64 },

    #[error("Total stake {total} would exceed the maximum {maximum}")]
    StakeExceedsMax { total: u64, maximum: u64 },

    #[error("Validator set has reached its maximum size")]
    ValidatorSetTooLarge,

    #[error("New lockup deadline does not extend the current one")]
    LockTimeTooShort,

    #[error("No validator configuration at {0}")]
    ValidatorConfigMissing(Address),

    #[error("Validator is already active or pending")]
    AlreadyActive,

    #[error("Account is not an active validator")]
    NotValidator,

    #[error("Cannot remove the last validator from the set")]
    LastValidator,

    #[error("No withdrawable coins in the pool")]
    NoCoinsToWithdraw,

    #[error("No stake pool at {0}")]
    PoolMissing(Address),

    #[error("No owner capability stored at {0}")]
    OwnerCapabilityMissing(Address),

    #[error("An owner capability is already stored at {0}")]
    OwnerCapabilityAlreadyStored(Address),

    #[error("Mint capability has not been installed")]
    MintCapabilityMissing,

    #[error(transparent)]
    Core(#[from] CoreError),
}
