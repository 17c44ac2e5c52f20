// staking/src/pool.rs

use chain_core::{Coin, StakeCoin};
use chain_crypto::Address;
use serde::{Deserialize, Serialize};

/// Per-validator stake pool
///
/// Stake is partitioned into four buckets encoding the delay between a
/// user action and its epoch-boundary commitment:
///
/// - `active`: counted in the current epoch's voting power
/// - `pending_active`: added while the validator is in the set; promoted
///   to `active` at the next epoch boundary
/// - `pending_inactive`: unlocked but still locked up; earns rewards and
///   counts toward voting power until released
/// - `inactive`: withdrawable
///
/// The buckets are linear coins, so pool value can only change through an
/// explicit mint (rewards) or an explicit move out (withdraw).
#[derive(Debug, Serialize, Deserialize)]
pub struct StakePool {
    pub active: Coin<StakeCoin>,
    pub inactive: Coin<StakeCoin>,
    pub pending_active: Coin<StakeCoin>,
    pub pending_inactive: Coin<StakeCoin>,
    /// Wall-clock second at which the current lockup expires
    pub locked_until_secs: u64,
    /// Only principal permitted to rotate keys, update addresses and
    /// join or leave the validator set
    pub operator_address: Address,
    /// Governance voting delegate
    pub delegated_voter: Address,
}

impl StakePool {
    /// Create an empty pool. Operator and voter both default to the owner.
    pub fn new(owner: Address) -> Self {
        Self {
            active: Coin::zero(),
            inactive: Coin::zero(),
            pending_active: Coin::zero(),
            pending_inactive: Coin::zero(),
            locked_until_secs: 0,
            operator_address: owner,
            delegated_voter: owner,
        }
    }

    /// Total value held by the pool across all four buckets
    pub fn total_stake(&self) -> u64 {
        self.active
            .value()
            .saturating_add(self.inactive.value())
            .saturating_add(self.pending_active.value())
            .saturating_add(self.pending_inactive.value())
    }

    /// Stake counted for consensus: `active + pending_inactive`
    pub fn voting_power(&self) -> u64 {
        self.active
            .value()
            .saturating_add(self.pending_inactive.value())
    }

    /// Stake counted for the next epoch: everything not yet withdrawable
    pub fn next_epoch_voting_power(&self) -> u64 {
        self.active
            .value()
            .saturating_add(self.pending_active.value())
            .saturating_add(self.pending_inactive.value())
    }

    /// Whether the lockup has expired at `now_secs`
    pub fn lockup_expired(&self, now_secs: u64) -> bool {
        now_secs >= self.locked_until_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_core::{CoinLedger, StakeCoin};

    fn pool_with(active: u64, pending_active: u64, pending_inactive: u64) -> StakePool {
        let (mut ledger, mint, _burn) = CoinLedger::<StakeCoin>::initialize();
        let mut pool = StakePool::new(Address::zero());
        pool.active.merge(ledger.mint(active, &mint));
        pool.pending_active.merge(ledger.mint(pending_active, &mint));
        pool.pending_inactive
            .merge(ledger.mint(pending_inactive, &mint));
        pool
    }

    #[test]
    fn test_new_pool_is_empty() {
        let pool = StakePool::new(Address::zero());
        assert_eq!(pool.total_stake(), 0);
        assert_eq!(pool.voting_power(), 0);
        assert_eq!(pool.locked_until_secs, 0);
        assert_eq!(pool.operator_address, Address::zero());
        assert_eq!(pool.delegated_voter, Address::zero());
    }

    #[test]
    fn test_voting_power_excludes_pending_active() {
        let pool = pool_with(100, 40, 7);
        assert_eq!(pool.voting_power(), 107);
        assert_eq!(pool.next_epoch_voting_power(), 147);
        assert_eq!(pool.total_stake(), 147);
    }

    #[test]
    fn test_lockup_expiry() {
        let mut pool = StakePool::new(Address::zero());
        pool.locked_until_secs = 1000;
        assert!(!pool.lockup_expired(999));
        assert!(pool.lockup_expired(1000));
        assert!(pool.lockup_expired(1001));
    }
}
