// chain-core/src/config.rs

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Staking policy configuration
///
/// Governs pool sizes, lockup duration, set-change permission and the
/// per-epoch reward rate. Read by every stake-bearing operation; written
/// only through the validated update methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakingConfig {
    /// Minimum `active` stake required to join the validator set
    pub minimum_stake: u64,
    /// Maximum total stake a pool may hold
    pub maximum_stake: u64,
    /// Lockup window applied on every renewal, in seconds
    pub recurring_lockup_duration_secs: u64,
    /// Whether validators may join or leave the set after genesis
    pub allow_validator_set_change: bool,
    /// Reward rate numerator, applied per epoch
    pub rewards_rate: u64,
    /// Reward rate denominator
    pub rewards_rate_denominator: u64,
}

impl StakingConfig {
    /// Create a validated configuration.
    pub fn new(
        minimum_stake: u64,
        maximum_stake: u64,
        recurring_lockup_duration_secs: u64,
        allow_validator_set_change: bool,
        rewards_rate: u64,
        rewards_rate_denominator: u64,
    ) -> CoreResult<Self> {
        if minimum_stake > maximum_stake {
            return Err(CoreError::InvalidConfiguration(
                "minimum stake exceeds maximum stake".into(),
            ));
        }
        if recurring_lockup_duration_secs == 0 {
            return Err(CoreError::InvalidConfiguration(
                "recurring lockup duration must be positive".into(),
            ));
        }
        if rewards_rate_denominator == 0 {
            return Err(CoreError::InvalidConfiguration(
                "rewards rate denominator must be positive".into(),
            ));
        }

        Ok(Self {
            minimum_stake,
            maximum_stake,
            recurring_lockup_duration_secs,
            allow_validator_set_change,
            rewards_rate,
            rewards_rate_denominator,
        })
    }

    /// Required stake bounds as `(minimum, maximum)`
    pub fn required_stake(&self) -> (u64, u64) {
        (self.minimum_stake, self.maximum_stake)
    }

    pub fn recurring_lockup_duration(&self) -> u64 {
        self.recurring_lockup_duration_secs
    }

    /// Reward rate as `(numerator, denominator)`
    pub fn reward_rate(&self) -> (u64, u64) {
        (self.rewards_rate, self.rewards_rate_denominator)
    }

    pub fn allow_validator_set_change(&self) -> bool {
        self.allow_validator_set_change
    }

    /// Governance update of the stake bounds.
    pub fn update_required_stake(&mut self, minimum: u64, maximum: u64) -> CoreResult<()> {
        if minimum > maximum {
            return Err(CoreError::InvalidConfiguration(
                "minimum stake exceeds maximum stake".into(),
            ));
        }
        self.minimum_stake = minimum;
        self.maximum_stake = maximum;
        Ok(())
    }

    /// Governance update of the reward rate.
    pub fn update_rewards_rate(&mut self, rate: u64, denominator: u64) -> CoreResult<()> {
        if denominator == 0 {
            return Err(CoreError::InvalidConfiguration(
                "rewards rate denominator must be positive".into(),
            ));
        }
        self.rewards_rate = rate;
        self.rewards_rate_denominator = denominator;
        Ok(())
    }

    /// Governance update of the lockup duration.
    pub fn update_recurring_lockup_duration(&mut self, secs: u64) -> CoreResult<()> {
        if secs == 0 {
            return Err(CoreError::InvalidConfiguration(
                "recurring lockup duration must be positive".into(),
            ));
        }
        self.recurring_lockup_duration_secs = secs;
        Ok(())
    }
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            minimum_stake: 100,
            maximum_stake: 100_000_000,
            recurring_lockup_duration_secs: 30 * 24 * 3600, // 30 days
            allow_validator_set_change: true,
            rewards_rate: 1,
            rewards_rate_denominator: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let cfg = StakingConfig::default();
        assert!(cfg.minimum_stake <= cfg.maximum_stake);
        assert!(cfg.rewards_rate_denominator > 0);
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        assert!(StakingConfig::new(1000, 100, 3600, true, 1, 100).is_err());
    }

    #[test]
    fn test_zero_denominator_rejected() {
        assert!(StakingConfig::new(100, 1000, 3600, true, 1, 0).is_err());
        let mut cfg = StakingConfig::default();
        assert!(cfg.update_rewards_rate(1, 0).is_err());
    }

    #[test]
    fn test_zero_lockup_rejected() {
        assert!(StakingConfig::new(100, 1000, 0, true, 1, 100).is_err());
        let mut cfg = StakingConfig::default();
        assert!(cfg.update_recurring_lockup_duration(0).is_err());
    }

    #[test]
    fn test_accessors() {
        let cfg = StakingConfig::new(100, 10000, 3600, false, 7, 777).unwrap();
        assert_eq!(cfg.required_stake(), (100, 10000));
        assert_eq!(cfg.reward_rate(), (7, 777));
        assert_eq!(cfg.recurring_lockup_duration(), 3600);
        assert!(!cfg.allow_validator_set_change());
    }
}
