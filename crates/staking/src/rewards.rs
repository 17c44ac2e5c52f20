// staking/src/rewards.rs

//! Reward arithmetic
//!
//! Rewards scale a bucket's stake by the configured rate and the
//! validator's proposal success ratio. The numerator is fully multiplied
//! out in 128-bit arithmetic before the single division; dividing earlier
//! would discard precision per intermediate step.

use chain_core::{Coin, CoinLedger, MintCapability, StakeCoin};

/// Compute the reward owed on `stake_amount` for an epoch in which the
/// validator made `num_successful` out of `num_total` proposals, at rate
/// `rate / denominator`.
///
/// Returns 0 when the validator proposed nothing or the denominator is
/// zero. Never panics: the multiplications widen to u128 and saturate in
/// the astronomically-out-of-range case.
pub fn calculate_rewards_amount(
    stake_amount: u64,
    num_successful: u64,
    num_total: u64,
    rate: u64,
    denominator: u64,
) -> u64 {
    let rewards_denominator = (denominator as u128) * (num_total as u128);
    if rewards_denominator == 0 {
        return 0;
    }

    let rewards_numerator = (stake_amount as u128)
        .checked_mul(rate as u128)
        .and_then(|n| n.checked_mul(num_successful as u128))
        .unwrap_or(u128::MAX);

    (rewards_numerator / rewards_denominator) as u64
}

/// Mint the reward owed on `bucket` and merge it in. Returns the minted
/// amount (0 for an empty bucket or a zero formula result).
pub fn distribute_rewards(
    bucket: &mut Coin<StakeCoin>,
    num_successful: u64,
    num_total: u64,
    rate: u64,
    denominator: u64,
    ledger: &mut CoinLedger<StakeCoin>,
    mint_cap: &MintCapability<StakeCoin>,
) -> u64 {
    if bucket.is_zero() {
        return 0;
    }

    let amount =
        calculate_rewards_amount(bucket.value(), num_successful, num_total, rate, denominator);
    if amount > 0 {
        bucket.merge(ledger.mint(amount, mint_cap));
    }
    amount
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numerator_first_precision() {
        // Dividing before the final multiplication would yield 1791.
        assert_eq!(calculate_rewards_amount(2000, 199, 200, 700, 777), 1792);
    }

    #[test]
    fn test_large_stake_no_overflow() {
        assert_eq!(
            calculate_rewards_amount(100_000_000_000_000_000, 9999, 10000, 3_141_592, 10_000_000),
            31_412_778_408_000_000
        );
    }

    #[test]
    fn test_zero_total_proposals() {
        assert_eq!(calculate_rewards_amount(2000, 5, 0, 700, 777), 0);
    }

    #[test]
    fn test_zero_denominator() {
        assert_eq!(calculate_rewards_amount(2000, 5, 10, 700, 0), 0);
    }

    #[test]
    fn test_zero_successes() {
        assert_eq!(calculate_rewards_amount(2000, 0, 10, 700, 777), 0);
    }

    #[test]
    fn test_full_ratio_simple_rate() {
        // 1% of 100 with a perfect proposal record
        assert_eq!(calculate_rewards_amount(100, 1, 1, 1, 100), 1);
    }

    #[test]
    fn test_distribute_mints_into_bucket() {
        let (mut ledger, mint, _burn) = chain_core::CoinLedger::initialize();
        let mut bucket = ledger.mint(100, &mint);

        let amount = distribute_rewards(&mut bucket, 1, 1, 1, 100, &mut ledger, &mint);
        assert_eq!(amount, 1);
        assert_eq!(bucket.value(), 101);
        assert_eq!(ledger.supply(), &num_bigint::BigUint::from(101u64));
    }

    #[test]
    fn test_distribute_empty_bucket() {
        let (mut ledger, mint, _burn) = chain_core::CoinLedger::initialize();
        let mut bucket: Coin<StakeCoin> = Coin::zero();

        let amount = distribute_rewards(&mut bucket, 1, 1, 1, 100, &mut ledger, &mint);
        assert_eq!(amount, 0);
        assert!(bucket.is_zero());
    }
}
