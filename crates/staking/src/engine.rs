// staking/src/engine.rs

use crate::{
    capability::{OwnerCapability, Signer},
    events::{
        AddStakeEvent, EventLog, IncreaseLockupEvent, JoinValidatorSetEvent,
        LeaveValidatorSetEvent, RegisterValidatorCandidateEvent, RotateConsensusKeyEvent,
        SetOperatorEvent, StakingEvent, UnlockStakeEvent, UpdateNetworkAndFullnodeAddressesEvent,
        WithdrawStakeEvent,
    },
    performance::ValidatorPerformance,
    pool::StakePool,
    validator::{
        ValidatorConfig, ValidatorInfo, ValidatorSet, ValidatorState, MAX_VALIDATOR_SET_SIZE,
    },
    StakingError, StakingResult,
};
use chain_core::{Coin, CoinLedger, MintCapability, StakeCoin, StakingConfig};
use chain_crypto::{bls, Address};
use std::collections::HashMap;

/// The staking core
///
/// Owns every piece of staking state: the pools, the stored owner
/// capabilities, the per-validator consensus configs, the validator set
/// and performance singletons, the event stream and the mint capability
/// installed at genesis. All entry points are methods; holding `&mut`
/// access to the engine is what makes the privileged ones privileged.
pub struct StakingEngine {
    config: StakingConfig,
    pub(crate) pools: HashMap<Address, StakePool>,
    pub(crate) validator_configs: HashMap<Address, ValidatorConfig>,
    stored_owner_caps: HashMap<Address, OwnerCapability>,
    pub(crate) validator_set: ValidatorSet,
    pub(crate) performance: ValidatorPerformance,
    pub(crate) events: EventLog,
    pub(crate) mint_cap: Option<MintCapability<StakeCoin>>,
    pub(crate) current_epoch: u64,
}

impl StakingEngine {
    pub fn new(config: StakingConfig) -> Self {
        Self {
            config,
            pools: HashMap::new(),
            validator_configs: HashMap::new(),
            stored_owner_caps: HashMap::new(),
            validator_set: ValidatorSet::new(),
            performance: ValidatorPerformance::new(),
            events: EventLog::new(),
            mint_cap: None,
            current_epoch: 0,
        }
    }

    /// Install the mint capability. Genesis-only: rewards cannot be minted
    /// until this has happened, and it happens exactly once.
    pub(crate) fn store_mint_cap(&mut self, cap: MintCapability<StakeCoin>) {
        self.mint_cap = Some(cap);
    }

    pub(crate) fn mint_cap(&self) -> Option<&MintCapability<StakeCoin>> {
        self.mint_cap.as_ref()
    }

    // ---- registration ----------------------------------------------------

    /// Register `signer` as a validator candidate: creates the stake pool,
    /// stores the consensus config and deposits the owner capability at the
    /// signer's address.
    pub fn initialize_validator(
        &mut self,
        signer: &Signer,
        consensus_pubkey: &[u8],
        proof_of_possession: &[u8],
        network_addresses: Vec<u8>,
        fullnode_addresses: Vec<u8>,
    ) -> StakingResult<()> {
        if !bls::verify_bls_pop(consensus_pubkey, proof_of_possession) {
            return Err(StakingError::InvalidPublicKey);
        }
        self.initialize_owner(signer)?;
        self.validator_configs.insert(
            signer.address(),
            ValidatorConfig::new(
                consensus_pubkey.to_vec(),
                network_addresses,
                fullnode_addresses,
            ),
        );
        Ok(())
    }

    /// Register a pool whose validator config is filled in later. The
    /// operator and voter may differ from the owner from the start; the
    /// initial stake, if any, is withdrawn from the owner's coin store.
    pub fn initialize_stake_owner(
        &mut self,
        ledger: &mut CoinLedger<StakeCoin>,
        signer: &Signer,
        initial_stake_amount: u64,
        operator: Address,
        voter: Address,
    ) -> StakingResult<()> {
        let addr = signer.address();
        self.initialize_owner(signer)?;
        self.validator_configs.insert(addr, ValidatorConfig::empty());

        if initial_stake_amount > 0 {
            let coins = ledger.withdraw(addr, initial_stake_amount)?;
            self.add_stake_inner(addr, coins).map_err(|(err, coins)| {
                let _ = ledger.deposit(addr, coins);
                err
            })?;
        }
        if operator != addr {
            self.set_operator_inner(addr, operator)?;
        }
        if voter != addr {
            self.set_delegated_voter_inner(addr, voter)?;
        }
        Ok(())
    }

    fn initialize_owner(&mut self, signer: &Signer) -> StakingResult<()> {
        let addr = signer.address();
        if self.pools.contains_key(&addr) {
            return Err(StakingError::AlreadyRegistered(addr));
        }
        self.pools.insert(addr, StakePool::new(addr));
        self.stored_owner_caps.insert(addr, OwnerCapability::new(addr));
        self.events
            .emit(StakingEvent::RegisterValidatorCandidate(
                RegisterValidatorCandidateEvent { pool_address: addr },
            ));
        tracing::info!(pool = %addr, "stake pool created");
        Ok(())
    }

    // ---- capability custody ----------------------------------------------

    /// Take the owner capability stored at the signer's address.
    pub fn extract_owner_cap(&mut self, signer: &Signer) -> StakingResult<OwnerCapability> {
        let addr = signer.address();
        self.stored_owner_caps
            .remove(&addr)
            .ok_or(StakingError::OwnerCapabilityMissing(addr))
    }

    /// Store an owner capability at the signer's address.
    pub fn deposit_owner_cap(
        &mut self,
        signer: &Signer,
        cap: OwnerCapability,
    ) -> StakingResult<()> {
        let addr = signer.address();
        if self.stored_owner_caps.contains_key(&addr) {
            return Err(StakingError::OwnerCapabilityAlreadyStored(addr));
        }
        self.stored_owner_caps.insert(addr, cap);
        Ok(())
    }

    /// Pool controlled by the capability stored at `addr`, if any.
    fn stored_cap_pool(&self, addr: Address) -> StakingResult<Address> {
        self.stored_owner_caps
            .get(&addr)
            .map(|cap| cap.pool_address())
            .ok_or(StakingError::OwnerCapabilityMissing(addr))
    }

    // ---- operator / voter ------------------------------------------------

    pub fn set_operator(&mut self, signer: &Signer, new_operator: Address) -> StakingResult<()> {
        let pool_address = self.stored_cap_pool(signer.address())?;
        self.set_operator_inner(pool_address, new_operator)
    }

    pub fn set_operator_with_cap(
        &mut self,
        cap: &OwnerCapability,
        new_operator: Address,
    ) -> StakingResult<()> {
        self.set_operator_inner(cap.pool_address(), new_operator)
    }

    fn set_operator_inner(&mut self, pool_address: Address, new_operator: Address) -> StakingResult<()> {
        let pool = self
            .pools
            .get_mut(&pool_address)
            .ok_or(StakingError::PoolMissing(pool_address))?;
        let old_operator = std::mem::replace(&mut pool.operator_address, new_operator);
        self.events.emit(StakingEvent::SetOperator(SetOperatorEvent {
            pool_address,
            old_operator,
            new_operator,
        }));
        Ok(())
    }

    pub fn set_delegated_voter(&mut self, signer: &Signer, new_voter: Address) -> StakingResult<()> {
        let pool_address = self.stored_cap_pool(signer.address())?;
        self.set_delegated_voter_inner(pool_address, new_voter)
    }

    pub fn set_delegated_voter_with_cap(
        &mut self,
        cap: &OwnerCapability,
        new_voter: Address,
    ) -> StakingResult<()> {
        self.set_delegated_voter_inner(cap.pool_address(), new_voter)
    }

    fn set_delegated_voter_inner(&mut self, pool_address: Address, new_voter: Address) -> StakingResult<()> {
        let pool = self
            .pools
            .get_mut(&pool_address)
            .ok_or(StakingError::PoolMissing(pool_address))?;
        pool.delegated_voter = new_voter;
        Ok(())
    }

    // ---- stake movement --------------------------------------------------

    /// Add stake from the signer's coin store to the pool controlled by the
    /// capability stored at the signer's address.
    pub fn add_stake(
        &mut self,
        ledger: &mut CoinLedger<StakeCoin>,
        signer: &Signer,
        amount: u64,
    ) -> StakingResult<()> {
        let addr = signer.address();
        let pool_address = self.stored_cap_pool(addr)?;
        let coins = ledger.withdraw(addr, amount)?;
        self.add_stake_inner(pool_address, coins).map_err(|(err, coins)| {
            let _ = ledger.deposit(addr, coins);
            err
        })
    }

    /// Add already-withdrawn coins to the capability's pool. On rejection
    /// the coins come back with the error, mpsc-`SendError` style, so no
    /// value is lost.
    pub fn add_stake_with_cap(
        &mut self,
        cap: &OwnerCapability,
        coins: Coin<StakeCoin>,
    ) -> Result<(), (StakingError, Coin<StakeCoin>)> {
        self.add_stake_inner(cap.pool_address(), coins)
    }

    fn add_stake_inner(
        &mut self,
        pool_address: Address,
        coins: Coin<StakeCoin>,
    ) -> Result<(), (StakingError, Coin<StakeCoin>)> {
        let amount = coins.value();
        if amount == 0 {
            return Err((StakingError::InvalidStakeAmount, coins));
        }
        let Some(pool) = self.pools.get_mut(&pool_address) else {
            return Err((StakingError::PoolMissing(pool_address), coins));
        };

        let (_, maximum) = self.config.required_stake();
        let total = pool.next_epoch_voting_power().saturating_add(amount);
        if total > maximum {
            return Err((StakingError::StakeExceedsMax { total, maximum }, coins));
        }

        // Stake added while the validator counts for the current epoch only
        // becomes effective next epoch.
        if self.validator_set.is_current_epoch_validator(&pool_address) {
            pool.pending_active.merge(coins);
        } else {
            pool.active.merge(coins);
        }

        self.events.emit(StakingEvent::AddStake(AddStakeEvent {
            pool_address,
            amount_added: amount,
        }));
        Ok(())
    }

    /// Move stake from `active` to `pending_inactive`, starting the path
    /// toward withdrawal. Unlocking zero is a silent no-op.
    pub fn unlock(&mut self, signer: &Signer, amount: u64) -> StakingResult<()> {
        let pool_address = self.stored_cap_pool(signer.address())?;
        self.unlock_inner(pool_address, amount)
    }

    pub fn unlock_with_cap(&mut self, cap: &OwnerCapability, amount: u64) -> StakingResult<()> {
        self.unlock_inner(cap.pool_address(), amount)
    }

    fn unlock_inner(&mut self, pool_address: Address, amount: u64) -> StakingResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let pool = self
            .pools
            .get_mut(&pool_address)
            .ok_or(StakingError::PoolMissing(pool_address))?;
        let unlocked = pool.active.extract(amount)?;
        pool.pending_inactive.merge(unlocked);
        self.events.emit(StakingEvent::UnlockStake(UnlockStakeEvent {
            pool_address,
            amount_unlocked: amount,
        }));
        Ok(())
    }

    /// Withdraw up to `amount` of inactive stake into the signer's coin
    /// store.
    pub fn withdraw(
        &mut self,
        ledger: &mut CoinLedger<StakeCoin>,
        signer: &Signer,
        amount: u64,
        now_secs: u64,
    ) -> StakingResult<()> {
        let addr = signer.address();
        let pool_address = self.stored_cap_pool(addr)?;
        let coins = self.withdraw_inner(pool_address, amount, now_secs)?;
        ledger.deposit(addr, coins)?;
        Ok(())
    }

    pub fn withdraw_with_cap(
        &mut self,
        cap: &OwnerCapability,
        amount: u64,
        now_secs: u64,
    ) -> StakingResult<Coin<StakeCoin>> {
        self.withdraw_inner(cap.pool_address(), amount, now_secs)
    }

    fn withdraw_inner(
        &mut self,
        pool_address: Address,
        amount: u64,
        now_secs: u64,
    ) -> StakingResult<Coin<StakeCoin>> {
        let state = self.validator_set.state_of(&pool_address);
        let pool = self
            .pools
            .get_mut(&pool_address)
            .ok_or(StakingError::PoolMissing(pool_address))?;

        // A pool that fell out of the set keeps its pending_inactive stake
        // until someone withdraws after lockup expiry; sweep it lazily here
        // rather than on every epoch.
        if state == ValidatorState::Inactive && pool.lockup_expired(now_secs) {
            let expired = pool.pending_inactive.extract_all();
            pool.inactive.merge(expired);
        }

        let amount = amount.min(pool.inactive.value());
        if amount == 0 {
            return Err(StakingError::NoCoinsToWithdraw);
        }

        let coins = pool.inactive.extract(amount)?;
        self.events.emit(StakingEvent::WithdrawStake(WithdrawStakeEvent {
            pool_address,
            amount_withdrawn: amount,
        }));
        Ok(coins)
    }

    // ---- validator config ------------------------------------------------

    /// Rotate the consensus key. Operator-only; effective at the next epoch
    /// boundary, when the active set re-snapshots configs.
    pub fn rotate_consensus_key(
        &mut self,
        signer: &Signer,
        pool_address: Address,
        new_consensus_pubkey: &[u8],
        proof_of_possession: &[u8],
    ) -> StakingResult<()> {
        self.assert_operator(signer, pool_address)?;
        if !self.validator_configs.contains_key(&pool_address) {
            return Err(StakingError::ValidatorConfigMissing(pool_address));
        }
        if !bls::verify_bls_pop(new_consensus_pubkey, proof_of_possession) {
            return Err(StakingError::InvalidPublicKey);
        }

        let config = self
            .validator_configs
            .get_mut(&pool_address)
            .ok_or(StakingError::ValidatorConfigMissing(pool_address))?;
        let old_consensus_pubkey =
            std::mem::replace(&mut config.consensus_pubkey, new_consensus_pubkey.to_vec());

        self.events
            .emit(StakingEvent::RotateConsensusKey(RotateConsensusKeyEvent {
                pool_address,
                old_consensus_pubkey,
                new_consensus_pubkey: new_consensus_pubkey.to_vec(),
            }));
        Ok(())
    }

    /// Update network and fullnode addresses. Operator-only; next-epoch
    /// effective.
    pub fn update_network_and_fullnode_addresses(
        &mut self,
        signer: &Signer,
        pool_address: Address,
        new_network_addresses: Vec<u8>,
        new_fullnode_addresses: Vec<u8>,
    ) -> StakingResult<()> {
        self.assert_operator(signer, pool_address)?;
        let config = self
            .validator_configs
            .get_mut(&pool_address)
            .ok_or(StakingError::ValidatorConfigMissing(pool_address))?;

        let old_network_addresses =
            std::mem::replace(&mut config.network_addresses, new_network_addresses.clone());
        let old_fullnode_addresses =
            std::mem::replace(&mut config.fullnode_addresses, new_fullnode_addresses.clone());

        self.events.emit(StakingEvent::UpdateNetworkAndFullnodeAddresses(
            UpdateNetworkAndFullnodeAddressesEvent {
                pool_address,
                old_network_addresses,
                new_network_addresses,
                old_fullnode_addresses,
                new_fullnode_addresses,
            },
        ));
        Ok(())
    }

    // ---- lockup ----------------------------------------------------------

    /// Renew the lockup to `now + recurring_lockup_duration`. Lockups never
    /// shorten; a renewal that would not extend the deadline is rejected.
    pub fn increase_lockup(&mut self, signer: &Signer, now_secs: u64) -> StakingResult<()> {
        let pool_address = self.stored_cap_pool(signer.address())?;
        self.increase_lockup_inner(pool_address, now_secs)
    }

    pub fn increase_lockup_with_cap(
        &mut self,
        cap: &OwnerCapability,
        now_secs: u64,
    ) -> StakingResult<()> {
        self.increase_lockup_inner(cap.pool_address(), now_secs)
    }

    fn increase_lockup_inner(&mut self, pool_address: Address, now_secs: u64) -> StakingResult<()> {
        let duration = self.config.recurring_lockup_duration();
        let pool = self
            .pools
            .get_mut(&pool_address)
            .ok_or(StakingError::PoolMissing(pool_address))?;

        let old_locked_until_secs = pool.locked_until_secs;
        let new_locked_until_secs = now_secs.saturating_add(duration);
        if new_locked_until_secs <= old_locked_until_secs {
            return Err(StakingError::LockTimeTooShort);
        }
        pool.locked_until_secs = new_locked_until_secs;

        self.events.emit(StakingEvent::IncreaseLockup(IncreaseLockupEvent {
            pool_address,
            old_locked_until_secs,
            new_locked_until_secs,
        }));
        Ok(())
    }

    // ---- set membership --------------------------------------------------

    /// Request to join the validator set at the next epoch boundary.
    pub fn join_validator_set(&mut self, signer: &Signer, pool_address: Address) -> StakingResult<()> {
        if !self.config.allow_validator_set_change() {
            return Err(StakingError::SetChangeDisabled);
        }
        self.join_validator_set_internal(signer, pool_address)
    }

    /// Join path used by genesis, which seeds the initial set regardless of
    /// the set-change policy.
    pub(crate) fn join_validator_set_internal(
        &mut self,
        signer: &Signer,
        pool_address: Address,
    ) -> StakingResult<()> {
        self.assert_operator(signer, pool_address)?;
        if self.validator_set.state_of(&pool_address) != ValidatorState::Inactive {
            return Err(StakingError::AlreadyActive);
        }

        let pool = self
            .pools
            .get(&pool_address)
            .ok_or(StakingError::PoolMissing(pool_address))?;
        let (minimum, maximum) = self.config.required_stake();
        let active = pool.active.value();
        if active < minimum {
            return Err(StakingError::StakeTooLow {
                actual: active,
                minimum,
            });
        }
        if active > maximum {
            return Err(StakingError::StakeTooHigh {
                actual: active,
                maximum,
            });
        }

        let config = self
            .validator_configs
            .get(&pool_address)
            .ok_or(StakingError::ValidatorConfigMissing(pool_address))?;
        if config.consensus_pubkey.is_empty() {
            return Err(StakingError::InvalidPublicKey);
        }
        if self.validator_set.join_candidate_count() >= MAX_VALIDATOR_SET_SIZE {
            return Err(StakingError::ValidatorSetTooLarge);
        }

        let info = ValidatorInfo::new(pool_address, pool.voting_power(), config.clone());
        self.validator_set.pending_active.push(info);
        tracing::info!(pool = %pool_address, voting_power = active, "validator queued to join");

        self.events
            .emit(StakingEvent::JoinValidatorSet(JoinValidatorSetEvent {
                pool_address,
            }));
        Ok(())
    }

    /// Request to leave the validator set at the next epoch boundary. A
    /// still-pending join is cancelled immediately instead.
    pub fn leave_validator_set(&mut self, signer: &Signer, pool_address: Address) -> StakingResult<()> {
        if !self.config.allow_validator_set_change() {
            return Err(StakingError::SetChangeDisabled);
        }
        self.assert_operator(signer, pool_address)?;

        match self.validator_set.state_of(&pool_address) {
            ValidatorState::PendingActive => {
                // Not yet effective for consensus; just drop the queued row.
                if let Some(index) = self.validator_set.find_pending_active(&pool_address) {
                    self.validator_set.pending_active.swap_remove(index);
                }
                Ok(())
            }
            ValidatorState::Active => {
                // Removal may not empty the set.
                if self.validator_set.active_count() <= 1 {
                    return Err(StakingError::LastValidator);
                }
                let index = self
                    .validator_set
                    .find_active(&pool_address)
                    .ok_or(StakingError::NotValidator)?;
                let info = self.validator_set.active_validators.swap_remove(index);
                self.validator_set.pending_inactive.push(info);
                tracing::info!(pool = %pool_address, "validator queued to leave");

                self.events
                    .emit(StakingEvent::LeaveValidatorSet(LeaveValidatorSetEvent {
                        pool_address,
                    }));
                Ok(())
            }
            _ => Err(StakingError::NotValidator),
        }
    }

    // ---- block prologue --------------------------------------------------

    /// Record proposal outcomes for the current block. Called by the block
    /// prologue; must never abort, so out-of-range indices are skipped.
    pub fn update_performance_statistics(
        &mut self,
        proposer_index: Option<u64>,
        failed_proposer_indices: Vec<u64>,
    ) {
        for index in failed_proposer_indices {
            if !self.performance.record_failure(index) {
                tracing::warn!(index, "failed-proposal index out of range, skipping");
            }
        }
        if let Some(index) = proposer_index {
            if !self.performance.record_success(index) {
                tracing::warn!(index, "proposer index out of range, skipping");
            }
        }
    }

    // ---- queries ---------------------------------------------------------

    pub fn validator_state(&self, pool_address: &Address) -> ValidatorState {
        self.validator_set.state_of(pool_address)
    }

    pub fn is_current_epoch_validator(&self, pool_address: &Address) -> bool {
        self.validator_set.is_current_epoch_validator(pool_address)
    }

    /// The four bucket values `(active, inactive, pending_active,
    /// pending_inactive)` of a pool.
    pub fn stake(&self, pool_address: &Address) -> Option<(u64, u64, u64, u64)> {
        self.pools.get(pool_address).map(|pool| {
            (
                pool.active.value(),
                pool.inactive.value(),
                pool.pending_active.value(),
                pool.pending_inactive.value(),
            )
        })
    }

    pub fn voting_power(&self, pool_address: &Address) -> u64 {
        self.pools
            .get(pool_address)
            .map(|pool| pool.voting_power())
            .unwrap_or(0)
    }

    pub fn remaining_lockup_secs(&self, pool_address: &Address, now_secs: u64) -> u64 {
        self.pools
            .get(pool_address)
            .map(|pool| pool.locked_until_secs.saturating_sub(now_secs))
            .unwrap_or(0)
    }

    pub fn pool(&self, pool_address: &Address) -> Option<&StakePool> {
        self.pools.get(pool_address)
    }

    pub(crate) fn pool_mut(&mut self, pool_address: &Address) -> Option<&mut StakePool> {
        self.pools.get_mut(pool_address)
    }

    pub fn validator_set(&self) -> &ValidatorSet {
        &self.validator_set
    }

    pub fn performance(&self) -> &ValidatorPerformance {
        &self.performance
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn config(&self) -> &StakingConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut StakingConfig {
        &mut self.config
    }

    pub fn current_epoch(&self) -> u64 {
        self.current_epoch
    }

    fn assert_operator(&self, signer: &Signer, pool_address: Address) -> StakingResult<()> {
        let pool = self
            .pools
            .get(&pool_address)
            .ok_or(StakingError::PoolMissing(pool_address))?;
        if signer.address() != pool.operator_address {
            return Err(StakingError::NotOperator);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chain_core::BurnCapability;
    use chain_crypto::BlsSecretKey;

    struct Harness {
        engine: StakingEngine,
        ledger: CoinLedger<StakeCoin>,
        _burn_cap: BurnCapability<StakeCoin>,
    }

    fn harness(config: StakingConfig) -> Harness {
        let (ledger, mint_cap, burn_cap) = CoinLedger::initialize();
        let mut engine = StakingEngine::new(config);
        engine.store_mint_cap(mint_cap);
        Harness {
            engine,
            ledger,
            _burn_cap: burn_cap,
        }
    }

    fn test_config() -> StakingConfig {
        StakingConfig::new(100, 10000, 3600, true, 1, 100).unwrap()
    }

    fn addr(last: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Address::new(bytes)
    }

    fn register_validator(h: &mut Harness, owner: Address) -> (Signer, BlsSecretKey) {
        let signer = Signer::new(owner);
        let sk = BlsSecretKey::generate().unwrap();
        h.ledger.register(owner).unwrap();
        h.engine
            .initialize_validator(
                &signer,
                &sk.public_key().to_bytes(),
                &sk.proof_of_possession().to_bytes(),
                vec![1],
                vec![2],
            )
            .unwrap();
        (signer, sk)
    }

    fn fund(h: &mut Harness, owner: Address, amount: u64) {
        let coin = {
            let cap = h.engine.mint_cap().unwrap();
            h.ledger.mint(amount, cap)
        };
        h.ledger.deposit(owner, coin).unwrap();
    }

    #[test]
    fn test_initialize_validator_creates_pool_and_cap() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);

        assert_eq!(h.engine.stake(&owner), Some((0, 0, 0, 0)));
        assert_eq!(h.engine.validator_state(&owner), ValidatorState::Inactive);

        let cap = h.engine.extract_owner_cap(&signer).unwrap();
        assert_eq!(cap.pool_address(), owner);
        // Extracting twice fails
        assert!(matches!(
            h.engine.extract_owner_cap(&signer),
            Err(StakingError::OwnerCapabilityMissing(_))
        ));
        h.engine.deposit_owner_cap(&signer, cap).unwrap();
    }

    #[test]
    fn test_double_registration_fails() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);

        let sk = BlsSecretKey::generate().unwrap();
        let result = h.engine.initialize_validator(
            &signer,
            &sk.public_key().to_bytes(),
            &sk.proof_of_possession().to_bytes(),
            vec![],
            vec![],
        );
        assert!(matches!(result, Err(StakingError::AlreadyRegistered(_))));
    }

    #[test]
    fn test_initialize_validator_rejects_bad_pop() {
        let mut h = harness(test_config());
        let signer = Signer::new(addr(1));
        let sk1 = BlsSecretKey::generate().unwrap();
        let sk2 = BlsSecretKey::generate().unwrap();

        // PoP from a different key
        let result = h.engine.initialize_validator(
            &signer,
            &sk1.public_key().to_bytes(),
            &sk2.proof_of_possession().to_bytes(),
            vec![],
            vec![],
        );
        assert!(matches!(result, Err(StakingError::InvalidPublicKey)));
    }

    #[test]
    fn test_add_stake_routes_to_active_when_inactive() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);
        fund(&mut h, owner, 500);

        h.engine.add_stake(&mut h.ledger, &signer, 200).unwrap();
        assert_eq!(h.engine.stake(&owner), Some((200, 0, 0, 0)));
        assert_eq!(h.ledger.balance(&owner), 300);
    }

    #[test]
    fn test_add_stake_zero_rejected_and_refunded() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);
        fund(&mut h, owner, 100);

        let result = h.engine.add_stake(&mut h.ledger, &signer, 0);
        assert!(matches!(result, Err(StakingError::InvalidStakeAmount)));
        assert_eq!(h.ledger.balance(&owner), 100);
    }

    #[test]
    fn test_add_stake_exceeding_max_rejected_and_refunded() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);
        fund(&mut h, owner, 50000);

        let result = h.engine.add_stake(&mut h.ledger, &signer, 10001);
        assert!(matches!(result, Err(StakingError::StakeExceedsMax { .. })));
        // Refunded in full
        assert_eq!(h.ledger.balance(&owner), 50000);
        assert_eq!(h.engine.stake(&owner), Some((0, 0, 0, 0)));
    }

    #[test]
    fn test_unlock_zero_is_silent_noop() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);
        fund(&mut h, owner, 500);
        h.engine.add_stake(&mut h.ledger, &signer, 200).unwrap();

        let events_before = h.engine.events().len();
        h.engine.unlock(&signer, 0).unwrap();
        assert_eq!(h.engine.events().len(), events_before);
        assert_eq!(h.engine.stake(&owner), Some((200, 0, 0, 0)));
    }

    #[test]
    fn test_unlock_more_than_active_fails() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);
        fund(&mut h, owner, 500);
        h.engine.add_stake(&mut h.ledger, &signer, 200).unwrap();

        assert!(h.engine.unlock(&signer, 201).is_err());
        assert_eq!(h.engine.stake(&owner), Some((200, 0, 0, 0)));
    }

    #[test]
    fn test_withdraw_clamps_to_inactive() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);
        fund(&mut h, owner, 500);
        h.engine.add_stake(&mut h.ledger, &signer, 200).unwrap();
        h.engine.unlock(&signer, 150).unwrap();

        // Inactive pool, lockup expired at t=0: sweep happens lazily
        h.engine.withdraw(&mut h.ledger, &signer, 1000, 0).unwrap();
        assert_eq!(h.ledger.balance(&owner), 450);
        assert_eq!(h.engine.stake(&owner), Some((50, 0, 0, 0)));
    }

    #[test]
    fn test_withdraw_nothing_available_fails() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);
        fund(&mut h, owner, 500);
        h.engine.add_stake(&mut h.ledger, &signer, 200).unwrap();

        let result = h.engine.withdraw(&mut h.ledger, &signer, 50, 0);
        assert!(matches!(result, Err(StakingError::NoCoinsToWithdraw)));
    }

    #[test]
    fn test_set_operator_and_voter() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);

        h.engine.set_operator(&signer, addr(2)).unwrap();
        h.engine.set_delegated_voter(&signer, addr(3)).unwrap();

        let pool = h.engine.pool(&owner).unwrap();
        assert_eq!(pool.operator_address, addr(2));
        assert_eq!(pool.delegated_voter, addr(3));
    }

    #[test]
    fn test_rotate_key_requires_operator() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (_signer, _) = register_validator(&mut h, owner);

        let sk = BlsSecretKey::generate().unwrap();
        let stranger = Signer::new(addr(9));
        let result = h.engine.rotate_consensus_key(
            &stranger,
            owner,
            &sk.public_key().to_bytes(),
            &sk.proof_of_possession().to_bytes(),
        );
        assert!(matches!(result, Err(StakingError::NotOperator)));
    }

    #[test]
    fn test_rotate_key_round_trip_restores_original() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, sk1) = register_validator(&mut h, owner);

        let original = h
            .engine
            .validator_configs
            .get(&owner)
            .unwrap()
            .consensus_pubkey
            .clone();

        let sk2 = BlsSecretKey::generate().unwrap();
        h.engine
            .rotate_consensus_key(
                &signer,
                owner,
                &sk2.public_key().to_bytes(),
                &sk2.proof_of_possession().to_bytes(),
            )
            .unwrap();
        assert_ne!(
            h.engine.validator_configs.get(&owner).unwrap().consensus_pubkey,
            original
        );

        // Rotate back to the original key
        h.engine
            .rotate_consensus_key(
                &signer,
                owner,
                &sk1.public_key().to_bytes(),
                &sk1.proof_of_possession().to_bytes(),
            )
            .unwrap();
        assert_eq!(
            h.engine.validator_configs.get(&owner).unwrap().consensus_pubkey,
            original
        );
    }

    #[test]
    fn test_increase_lockup() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);

        h.engine.increase_lockup(&signer, 1000).unwrap();
        assert_eq!(h.engine.pool(&owner).unwrap().locked_until_secs, 4600);

        // Same second again: deadline would not move
        assert!(matches!(
            h.engine.increase_lockup(&signer, 1000),
            Err(StakingError::LockTimeTooShort)
        ));

        // Later renewal extends
        h.engine.increase_lockup(&signer, 2000).unwrap();
        assert_eq!(h.engine.pool(&owner).unwrap().locked_until_secs, 5600);
    }

    #[test]
    fn test_join_requires_min_stake_boundary() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);
        fund(&mut h, owner, 500);

        h.engine.add_stake(&mut h.ledger, &signer, 99).unwrap();
        assert!(matches!(
            h.engine.join_validator_set(&signer, owner),
            Err(StakingError::StakeTooLow { actual: 99, minimum: 100 })
        ));

        h.engine.add_stake(&mut h.ledger, &signer, 1).unwrap();
        h.engine.join_validator_set(&signer, owner).unwrap();
        assert_eq!(
            h.engine.validator_state(&owner),
            ValidatorState::PendingActive
        );
    }

    #[test]
    fn test_join_twice_fails() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);
        fund(&mut h, owner, 500);
        h.engine.add_stake(&mut h.ledger, &signer, 100).unwrap();
        h.engine.join_validator_set(&signer, owner).unwrap();

        assert!(matches!(
            h.engine.join_validator_set(&signer, owner),
            Err(StakingError::AlreadyActive)
        ));
    }

    #[test]
    fn test_join_when_set_full() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);
        fund(&mut h, owner, 500);
        h.engine.add_stake(&mut h.ledger, &signer, 100).unwrap();

        // Fill the set with synthetic rows up to the cap
        for i in 0..MAX_VALIDATOR_SET_SIZE {
            let mut bytes = [0u8; 20];
            bytes[..8].copy_from_slice(&(i as u64).to_le_bytes());
            bytes[10] = 0xff;
            h.engine.validator_set.pending_active.push(ValidatorInfo::new(
                Address::new(bytes),
                100,
                ValidatorConfig::empty(),
            ));
        }

        assert!(matches!(
            h.engine.join_validator_set(&signer, owner),
            Err(StakingError::ValidatorSetTooLarge)
        ));
    }

    #[test]
    fn test_leave_cancels_pending_join() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);
        fund(&mut h, owner, 500);
        h.engine.add_stake(&mut h.ledger, &signer, 100).unwrap();
        h.engine.join_validator_set(&signer, owner).unwrap();

        h.engine.leave_validator_set(&signer, owner).unwrap();
        assert_eq!(h.engine.validator_state(&owner), ValidatorState::Inactive);
    }

    #[test]
    fn test_leave_when_not_in_set_fails() {
        let mut h = harness(test_config());
        let owner = addr(1);
        let (signer, _) = register_validator(&mut h, owner);

        assert!(matches!(
            h.engine.leave_validator_set(&signer, owner),
            Err(StakingError::NotValidator)
        ));
    }

    #[test]
    fn test_performance_out_of_bounds_ignored() {
        let mut h = harness(test_config());
        h.engine.performance.reset(1);

        h.engine
            .update_performance_statistics(Some(101), vec![0, 101]);
        let perf = h.engine.performance().get(0).unwrap();
        assert_eq!(perf.failed_proposals, 1);
        assert_eq!(perf.successful_proposals, 0);
    }
}
