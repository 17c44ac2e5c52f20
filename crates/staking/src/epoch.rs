// staking/src/epoch.rs

//! Epoch transition
//!
//! `on_new_epoch` commits everything the epoch deferred: rewards are
//! minted against recorded performance, pending stake is promoted,
//! expired lockups are released, membership changes take effect and the
//! active set is re-snapshotted with dense indices. The whole procedure
//! is infallible; pools or indices that fail a lookup are skipped.

use crate::{
    engine::StakingEngine,
    events::{DistributeRewardsEvent, StakingEvent},
    rewards,
    validator::ValidatorInfo,
};
use chain_core::{CoinLedger, StakeCoin};
use chain_crypto::Address;

impl StakingEngine {
    /// Run the epoch transition at `now_secs`.
    ///
    /// Order matters and is observable:
    /// 1. rewards + promotion + expired-lockup release, per pool, for every
    ///    pool that counted this epoch (active first, then leaving)
    /// 2. queued joins appended to the active set, leavers dropped from it
    /// 3. active set re-snapshotted: fresh configs, fresh voting power,
    ///    min-stake filter, dense reindex, performance reset
    /// 4. lockup renewal for every pool still active
    ///
    /// The release in step 1 reads the pre-renewal lockup deadline, so a
    /// pool whose lockup expired during the epoch releases now and is
    /// re-locked in step 4.
    pub fn on_new_epoch(&mut self, ledger: &mut CoinLedger<StakeCoin>, now_secs: u64) {
        let (rate, denominator) = self.config().reward_rate();
        let (minimum_stake, _) = self.config().required_stake();
        let lockup_duration = self.config().recurring_lockup_duration();

        // Step 1: every pool that counted for the closing epoch.
        let mut epoch_pools: Vec<Address> = self
            .validator_set
            .active_validators
            .iter()
            .map(|v| v.addr)
            .collect();
        epoch_pools.extend(self.validator_set.pending_inactive.iter().map(|v| v.addr));

        let mut total_rewards = 0u64;
        for addr in epoch_pools {
            total_rewards =
                total_rewards.saturating_add(self.update_stake_pool(ledger, addr, now_secs, rate, denominator));
        }

        // Step 2: membership reconciliation.
        let joining = std::mem::take(&mut self.validator_set.pending_active);
        self.validator_set.active_validators.extend(joining);
        self.validator_set.pending_inactive.clear();

        // Step 3: rebuild the active set in place, preserving order.
        let rows = std::mem::take(&mut self.validator_set.active_validators);
        let mut next_epoch_validators: Vec<ValidatorInfo> = Vec::with_capacity(rows.len());
        for row in rows {
            let addr = row.addr;
            let Some(pool) = self.pools.get(&addr) else {
                continue;
            };
            let voting_power = pool.voting_power();
            if voting_power < minimum_stake {
                tracing::info!(
                    pool = %addr,
                    voting_power,
                    minimum_stake,
                    "validator dropped below minimum stake"
                );
                continue;
            }
            let Some(config) = self.validator_configs.get_mut(&addr) else {
                continue;
            };
            config.validator_index = next_epoch_validators.len() as u64;
            let config = config.clone();
            next_epoch_validators.push(ValidatorInfo::new(addr, voting_power, config));
        }
        self.performance.reset(next_epoch_validators.len());
        self.validator_set.active_validators = next_epoch_validators;

        // Step 4: renew expired lockups for the new active set.
        let renew: Vec<Address> = self
            .validator_set
            .active_validators
            .iter()
            .map(|v| v.addr)
            .collect();
        for addr in renew {
            if let Some(pool) = self.pool_mut(&addr) {
                if pool.locked_until_secs <= now_secs {
                    pool.locked_until_secs = now_secs.saturating_add(lockup_duration);
                }
            }
        }

        self.current_epoch += 1;
        tracing::info!(
            epoch = self.current_epoch,
            validators = self.validator_set.active_validators.len(),
            total_rewards,
            "epoch transition complete"
        );
    }

    /// Distribute rewards into a pool's `active` and `pending_inactive`
    /// buckets, promote `pending_active` and release `pending_inactive` if
    /// the lockup expired. Returns the minted reward total.
    fn update_stake_pool(
        &mut self,
        ledger: &mut CoinLedger<StakeCoin>,
        pool_address: Address,
        now_secs: u64,
        rate: u64,
        denominator: u64,
    ) -> u64 {
        // The cached index is authoritative for the closing epoch; a stale
        // or out-of-range one yields no rewards rather than someone else's.
        let Some(config) = self.validator_configs.get(&pool_address) else {
            return 0;
        };
        let Some(perf) = self.performance.get(config.validator_index) else {
            return 0;
        };
        let num_successful = perf.successful_proposals;
        let num_total = num_successful.saturating_add(perf.failed_proposals);

        let rewards_amount = {
            let Some(pool) = self.pools.get_mut(&pool_address) else {
                return 0;
            };
            let Some(mint_cap) = self.mint_cap.as_ref() else {
                tracing::warn!("no mint capability installed, skipping rewards");
                return 0;
            };

            let rewards_active = rewards::distribute_rewards(
                &mut pool.active,
                num_successful,
                num_total,
                rate,
                denominator,
                ledger,
                mint_cap,
            );
            let rewards_pending_inactive = rewards::distribute_rewards(
                &mut pool.pending_inactive,
                num_successful,
                num_total,
                rate,
                denominator,
                ledger,
                mint_cap,
            );
            let rewards_amount = rewards_active.saturating_add(rewards_pending_inactive);

            // Promote stake added during the epoch.
            let promoted = pool.pending_active.extract_all();
            pool.active.merge(promoted);

            // Release unlocked stake whose lockup has expired.
            if pool.lockup_expired(now_secs) {
                let released = pool.pending_inactive.extract_all();
                pool.inactive.merge(released);
            }

            rewards_amount
        };

        if rewards_amount > 0 {
            self.events
                .emit(StakingEvent::DistributeRewards(DistributeRewardsEvent {
                    pool_address,
                    rewards_amount,
                }));
        }
        rewards_amount
    }
}
