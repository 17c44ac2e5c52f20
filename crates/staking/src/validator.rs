// staking/src/validator.rs

use chain_crypto::Address;
use serde::{Deserialize, Serialize};

/// Maximum number of validators in `active + pending_active`, bounded by
/// the bitvec voting-power representation used by consensus.
pub const MAX_VALIDATOR_SET_SIZE: usize = 65536;

/// Per-validator consensus configuration
///
/// `validator_index` caches this validator's position in the active set.
/// It is authoritative only between epoch boundaries; consumers must
/// bounds-check before trusting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub consensus_pubkey: Vec<u8>,
    pub network_addresses: Vec<u8>,
    pub fullnode_addresses: Vec<u8>,
    pub validator_index: u64,
}

impl ValidatorConfig {
    pub fn new(
        consensus_pubkey: Vec<u8>,
        network_addresses: Vec<u8>,
        fullnode_addresses: Vec<u8>,
    ) -> Self {
        Self {
            consensus_pubkey,
            network_addresses,
            fullnode_addresses,
            validator_index: 0,
        }
    }

    /// An empty config, populated later by the owner before joining.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }
}

/// Snapshot of one validator's membership row
///
/// Voting power is fixed at the moment the row is computed, at the epoch
/// boundary or at join time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorInfo {
    pub addr: Address,
    pub voting_power: u64,
    pub config: ValidatorConfig,
}

impl ValidatorInfo {
    pub fn new(addr: Address, voting_power: u64, config: ValidatorConfig) -> Self {
        Self {
            addr,
            voting_power,
            config,
        }
    }
}

/// Observable membership state of a pool, derived from the set and never
/// stored on the pool itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidatorState {
    /// Queued to join at the next epoch boundary
    PendingActive,
    /// Participating in the current epoch
    Active,
    /// Leaving at the next epoch boundary; still counted this epoch
    PendingInactive,
    /// Not in the set
    Inactive,
}

/// The validator set singleton
///
/// Three ordered sequences; any address appears in at most one. Order
/// within `active_validators` is consensus-visible: appends go to the
/// tail and epoch-boundary removals preserve the relative order of
/// survivors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorSet {
    pub active_validators: Vec<ValidatorInfo>,
    pub pending_active: Vec<ValidatorInfo>,
    pub pending_inactive: Vec<ValidatorInfo>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self {
            active_validators: Vec::new(),
            pending_active: Vec::new(),
            pending_inactive: Vec::new(),
        }
    }

    /// Derive the membership state of `addr`
    pub fn state_of(&self, addr: &Address) -> ValidatorState {
        if self.find_pending_active(addr).is_some() {
            ValidatorState::PendingActive
        } else if self.find_active(addr).is_some() {
            ValidatorState::Active
        } else if self.find_pending_inactive(addr).is_some() {
            ValidatorState::PendingInactive
        } else {
            ValidatorState::Inactive
        }
    }

    /// Whether `addr` counts for the current epoch (voting power and
    /// reward eligibility)
    pub fn is_current_epoch_validator(&self, addr: &Address) -> bool {
        matches!(
            self.state_of(addr),
            ValidatorState::Active | ValidatorState::PendingInactive
        )
    }

    pub fn find_active(&self, addr: &Address) -> Option<usize> {
        self.active_validators.iter().position(|v| v.addr == *addr)
    }

    pub fn find_pending_active(&self, addr: &Address) -> Option<usize> {
        self.pending_active.iter().position(|v| v.addr == *addr)
    }

    pub fn find_pending_inactive(&self, addr: &Address) -> Option<usize> {
        self.pending_inactive.iter().position(|v| v.addr == *addr)
    }

    /// Size bound relevant to joins: active plus queued-to-join
    pub fn join_candidate_count(&self) -> usize {
        self.active_validators.len() + self.pending_active.len()
    }

    pub fn active_count(&self) -> usize {
        self.active_validators.len()
    }
}

impl Default for ValidatorSet {
    fn default() -> Self {
        Self::new()
    }
}
