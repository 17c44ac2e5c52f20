// staking/src/events.rs

//! Staking event stream
//!
//! Every pool-mutating operation appends one typed event. The log is
//! append-only; consumers index or fold it but never remove entries.

use chain_crypto::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterValidatorCandidateEvent {
    pub pool_address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOperatorEvent {
    pub pool_address: Address,
    pub old_operator: Address,
    pub new_operator: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddStakeEvent {
    pub pool_address: Address,
    pub amount_added: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotateConsensusKeyEvent {
    pub pool_address: Address,
    pub old_consensus_pubkey: Vec<u8>,
    pub new_consensus_pubkey: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNetworkAndFullnodeAddressesEvent {
    pub pool_address: Address,
    pub old_network_addresses: Vec<u8>,
    pub new_network_addresses: Vec<u8>,
    pub old_fullnode_addresses: Vec<u8>,
    pub new_fullnode_addresses: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncreaseLockupEvent {
    pub pool_address: Address,
    pub old_locked_until_secs: u64,
    pub new_locked_until_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinValidatorSetEvent {
    pub pool_address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributeRewardsEvent {
    pub pool_address: Address,
    pub rewards_amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockStakeEvent {
    pub pool_address: Address,
    pub amount_unlocked: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawStakeEvent {
    pub pool_address: Address,
    pub amount_withdrawn: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveValidatorSetEvent {
    pub pool_address: Address,
}

/// One entry in the staking event stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StakingEvent {
    RegisterValidatorCandidate(RegisterValidatorCandidateEvent),
    SetOperator(SetOperatorEvent),
    AddStake(AddStakeEvent),
    RotateConsensusKey(RotateConsensusKeyEvent),
    UpdateNetworkAndFullnodeAddresses(UpdateNetworkAndFullnodeAddressesEvent),
    IncreaseLockup(IncreaseLockupEvent),
    JoinValidatorSet(JoinValidatorSetEvent),
    DistributeRewards(DistributeRewardsEvent),
    UnlockStake(UnlockStakeEvent),
    WithdrawStake(WithdrawStakeEvent),
    LeaveValidatorSet(LeaveValidatorSetEvent),
}

impl StakingEvent {
    /// The pool this event concerns
    pub fn pool_address(&self) -> Address {
        match self {
            StakingEvent::RegisterValidatorCandidate(e) => e.pool_address,
            StakingEvent::SetOperator(e) => e.pool_address,
            StakingEvent::AddStake(e) => e.pool_address,
            StakingEvent::RotateConsensusKey(e) => e.pool_address,
            StakingEvent::UpdateNetworkAndFullnodeAddresses(e) => e.pool_address,
            StakingEvent::IncreaseLockup(e) => e.pool_address,
            StakingEvent::JoinValidatorSet(e) => e.pool_address,
            StakingEvent::DistributeRewards(e) => e.pool_address,
            StakingEvent::UnlockStake(e) => e.pool_address,
            StakingEvent::WithdrawStake(e) => e.pool_address,
            StakingEvent::LeaveValidatorSet(e) => e.pool_address,
        }
    }
}

/// Append-only event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<StakingEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: StakingEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[StakingEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events concerning `pool`, in emission order
    pub fn for_pool(&self, pool: &Address) -> Vec<&StakingEvent> {
        self.events
            .iter()
            .filter(|e| e.pool_address() == *pool)
            .collect()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
