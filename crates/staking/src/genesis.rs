// staking/src/genesis.rs

//! Genesis bootstrap
//!
//! Two-phase, invoked exactly once: [`Framework::initialize`] builds the
//! framework root (timekeeper, coin subsystem, staking engine, block
//! tracker) and wires the mint capability into the staking engine;
//! [`Framework::create_initialize_validators`] seeds and activates the
//! initial validator set.

use crate::{
    block::BlockTracker,
    capability::Signer,
    engine::StakingEngine,
    StakingError, StakingResult,
};
use chain_core::{BurnCapability, CoinLedger, StakeCoin, StakingConfig, Timekeeper};
use chain_crypto::Address;
use serde::{Deserialize, Serialize};

/// Everything genesis needs to boot a chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub chain_id: u8,
    /// Seconds between epoch transitions
    pub epoch_interval_secs: u64,
    pub minimum_stake: u64,
    pub maximum_stake: u64,
    pub recurring_lockup_duration_secs: u64,
    pub allow_validator_set_change: bool,
    pub rewards_rate: u64,
    pub rewards_rate_denominator: u64,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            chain_id: 4,
            epoch_interval_secs: 2 * 3600,
            minimum_stake: 100,
            maximum_stake: 100_000_000,
            recurring_lockup_duration_secs: 30 * 24 * 3600,
            allow_validator_set_change: true,
            rewards_rate: 1,
            rewards_rate_denominator: 100,
        }
    }
}

/// One entry of the initial validator set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorGenesisInfo {
    pub owner: Address,
    pub consensus_pubkey: Vec<u8>,
    pub proof_of_possession: Vec<u8>,
    pub network_addresses: Vec<u8>,
    pub fullnode_addresses: Vec<u8>,
    pub stake_amount: u64,
}

/// The framework root
///
/// Created exactly once by genesis and never destroyed. Sole owner of the
/// process-wide singletons; privileged entry points (epoch engine, block
/// prologue) are privileged because only the host runtime holds `&mut`
/// access to this value.
pub struct Framework {
    pub chain_id: u8,
    pub timekeeper: Timekeeper,
    pub coin_ledger: CoinLedger<StakeCoin>,
    pub staking: StakingEngine,
    pub block: BlockTracker,
    /// Held for the fee subsystem; staking itself never burns.
    burn_cap: BurnCapability<StakeCoin>,
}

impl Framework {
    /// Phase one: build the framework root and wire the coin capabilities.
    pub fn initialize(genesis: GenesisConfig) -> StakingResult<Self> {
        let config = StakingConfig::new(
            genesis.minimum_stake,
            genesis.maximum_stake,
            genesis.recurring_lockup_duration_secs,
            genesis.allow_validator_set_change,
            genesis.rewards_rate,
            genesis.rewards_rate_denominator,
        )?;

        let mut timekeeper = Timekeeper::new();
        timekeeper.set_time_has_started();

        let (coin_ledger, mint_cap, burn_cap) = CoinLedger::initialize();
        let mut staking = StakingEngine::new(config);
        staking.store_mint_cap(mint_cap);

        tracing::info!(chain_id = genesis.chain_id, "framework initialized");
        Ok(Self {
            chain_id: genesis.chain_id,
            timekeeper,
            coin_ledger,
            staking,
            block: BlockTracker::new(genesis.epoch_interval_secs),
            burn_cap,
        })
    }

    /// Phase two: seed the initial validator set and run the first epoch
    /// transition so every seeded validator becomes active.
    pub fn create_initialize_validators(
        &mut self,
        validators: Vec<ValidatorGenesisInfo>,
    ) -> StakingResult<()> {
        let now_secs = self.timekeeper.now_seconds();

        for validator in validators {
            let owner = validator.owner;
            let signer = Signer::new(owner);

            self.coin_ledger.register(owner)?;
            self.staking.initialize_validator(
                &signer,
                &validator.consensus_pubkey,
                &validator.proof_of_possession,
                validator.network_addresses,
                validator.fullnode_addresses,
            )?;
            self.staking.increase_lockup(&signer, now_secs)?;
            self.mint_to(owner, validator.stake_amount)?;
            self.staking
                .add_stake(&mut self.coin_ledger, &signer, validator.stake_amount)?;
            self.staking.join_validator_set_internal(&signer, owner)?;
        }

        self.staking.on_new_epoch(&mut self.coin_ledger, now_secs);
        tracing::info!(
            validators = self.staking.validator_set().active_count(),
            "initial validator set activated"
        );
        Ok(())
    }

    /// Mint `amount` into the coin store at `to`, registering the store if
    /// needed. Used by genesis seeding and test-network faucets.
    pub fn mint_to(&mut self, to: Address, amount: u64) -> StakingResult<()> {
        if !self.coin_ledger.is_registered(&to) {
            self.coin_ledger.register(to)?;
        }
        let mint_cap = self
            .staking
            .mint_cap()
            .ok_or(StakingError::MintCapabilityMissing)?;
        let coins = self.coin_ledger.mint(amount, mint_cap);
        self.coin_ledger.deposit(to, coins)?;
        Ok(())
    }

    pub fn burn_cap(&self) -> &BurnCapability<StakeCoin> {
        &self.burn_cap
    }
}
