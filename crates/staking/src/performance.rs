// staking/src/performance.rs

use serde::{Deserialize, Serialize};

/// Proposal counters for one validator over the current epoch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualValidatorPerformance {
    pub successful_proposals: u64,
    pub failed_proposals: u64,
}

/// The performance registry singleton
///
/// One entry per active validator, indexed in the same order as
/// `ValidatorSet::active_validators`. Reset to zeros at every epoch
/// boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorPerformance {
    pub validators: Vec<IndividualValidatorPerformance>,
}

impl ValidatorPerformance {
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Fresh zeroed counters for a set of `len` validators
    pub fn reset(&mut self, len: usize) {
        self.validators = vec![IndividualValidatorPerformance::default(); len];
    }

    /// Counters for the validator at `index`, if in bounds
    pub fn get(&self, index: u64) -> Option<&IndividualValidatorPerformance> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.validators.get(i))
    }

    /// Record a successful proposal. Out-of-bounds indices are ignored.
    pub fn record_success(&mut self, index: u64) -> bool {
        match usize::try_from(index)
            .ok()
            .and_then(|i| self.validators.get_mut(i))
        {
            Some(perf) => {
                perf.successful_proposals = perf.successful_proposals.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Record a failed proposal. Out-of-bounds indices are ignored.
    pub fn record_failure(&mut self, index: u64) -> bool {
        match usize::try_from(index)
            .ok()
            .and_then(|i| self.validators.get_mut(i))
        {
            Some(perf) => {
                perf.failed_proposals = perf.failed_proposals.saturating_add(1);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl Default for ValidatorPerformance {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_in_bounds() {
        let mut perf = ValidatorPerformance::new();
        perf.reset(2);

        assert!(perf.record_success(0));
        assert!(perf.record_failure(1));
        assert!(perf.record_failure(1));

        assert_eq!(perf.get(0).unwrap().successful_proposals, 1);
        assert_eq!(perf.get(1).unwrap().failed_proposals, 2);
    }

    #[test]
    fn test_record_out_of_bounds_is_ignored() {
        let mut perf = ValidatorPerformance::new();
        perf.reset(1);

        assert!(!perf.record_success(1));
        assert!(!perf.record_failure(u64::MAX));
        assert_eq!(perf.get(0).unwrap().successful_proposals, 0);
        assert_eq!(perf.get(0).unwrap().failed_proposals, 0);
    }

    #[test]
    fn test_reset_zeroes_counters() {
        let mut perf = ValidatorPerformance::new();
        perf.reset(1);
        perf.record_success(0);

        perf.reset(3);
        assert_eq!(perf.len(), 3);
        assert!(perf
            .validators
            .iter()
            .all(|p| p.successful_proposals == 0 && p.failed_proposals == 0));
    }
}
