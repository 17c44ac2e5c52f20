// staking/src/block.rs

//! Block prologue
//!
//! The first thing that happens in every block: advance the global clock,
//! record the previous round's proposal outcomes and, once the epoch
//! interval has elapsed, trigger the epoch transition. Runs on every
//! block, so nothing in here may abort.

use crate::genesis::Framework;
use serde::{Deserialize, Serialize};

/// Reconfiguration schedule state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTracker {
    /// Seconds between epoch transitions
    pub epoch_interval_secs: u64,
    /// Chain time at which the last epoch transition ran
    pub last_reconfiguration_secs: u64,
    /// Blocks processed since genesis
    pub block_height: u64,
}

impl BlockTracker {
    pub fn new(epoch_interval_secs: u64) -> Self {
        Self {
            epoch_interval_secs,
            last_reconfiguration_secs: 0,
            block_height: 0,
        }
    }

    /// Whether the epoch interval has elapsed at `now_secs`
    pub fn epoch_due(&self, now_secs: u64) -> bool {
        now_secs.saturating_sub(self.last_reconfiguration_secs) >= self.epoch_interval_secs
    }
}

impl Framework {
    /// Process the prologue of one block proposed at `timestamp_secs`.
    ///
    /// `proposer_index` is the active-set index of the round's proposer
    /// (absent for NIL blocks); `failed_proposer_indices` are the indices
    /// of proposers of failed rounds since the previous block.
    pub fn block_prologue(
        &mut self,
        proposer_index: Option<u64>,
        failed_proposer_indices: Vec<u64>,
        timestamp_secs: u64,
    ) {
        if self.timekeeper.update_global_time(timestamp_secs).is_err() {
            tracing::warn!(
                timestamp_secs,
                now = self.timekeeper.now_seconds(),
                "block timestamp went backwards, keeping current time"
            );
        }
        self.block.block_height = self.block.block_height.saturating_add(1);

        self.staking
            .update_performance_statistics(proposer_index, failed_proposer_indices);

        let now_secs = self.timekeeper.now_seconds();
        if self.block.epoch_due(now_secs) {
            self.staking.on_new_epoch(&mut self.coin_ledger, now_secs);
            self.block.last_reconfiguration_secs = now_secs;
        }
    }
}
