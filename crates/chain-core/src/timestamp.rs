// chain-core/src/timestamp.rs

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Global time oracle
///
/// Holds the chain-observed wall clock in seconds. Time starts at zero,
/// is marked started once at genesis, and only ever moves forward: the
/// block prologue feeds it proposer timestamps and regressions are
/// rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timekeeper {
    now_secs: u64,
    started: bool,
}

impl Timekeeper {
    pub fn new() -> Self {
        Self {
            now_secs: 0,
            started: false,
        }
    }

    /// Current chain time in seconds
    pub fn now_seconds(&self) -> u64 {
        self.now_secs
    }

    /// Genesis marks the clock as running.
    pub fn set_time_has_started(&mut self) {
        self.started = true;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Advance the clock to `secs`. Non-decreasing: a regression is an
    /// error and leaves the clock unchanged.
    pub fn update_global_time(&mut self, secs: u64) -> CoreResult<()> {
        if secs < self.now_secs {
            return Err(CoreError::TimeWentBackwards);
        }
        self.now_secs = secs;
        Ok(())
    }

    /// Jump the clock forward by `delta` seconds.
    pub fn fast_forward_seconds(&mut self, delta: u64) {
        self.now_secs = self.now_secs.saturating_add(delta);
    }
}

impl Default for Timekeeper {
    fn default() -> Self {
        Self::new()
    }
}
