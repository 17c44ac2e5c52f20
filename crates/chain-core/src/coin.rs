// chain-core/src/coin.rs

//! Linear coin values
//!
//! A `Coin<T>` is a quantity of tokens that cannot be cloned or silently
//! dropped into existence: value moves between coins through `merge` and
//! `extract`, and enters or leaves circulation only through the mint and
//! burn capabilities handed out once at coin initialization.

use crate::{CoreError, CoreResult};
use chain_crypto::Address;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;

/// Marker type for the staking token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeCoin;

/// A linear amount of tokens of type `T`.
///
/// Deliberately neither `Clone` nor `Copy`. Buckets hold coins, operations
/// move value between them, and the sum over all live coins stays equal to
/// the registered supply.
#[derive(Debug, Serialize, Deserialize)]
pub struct Coin<T> {
    value: u64,
    #[serde(skip)]
    marker: PhantomData<T>,
}

impl<T> Coin<T> {
    /// A coin holding no value
    pub fn zero() -> Self {
        Self {
            value: 0,
            marker: PhantomData,
        }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Absorb `other` into this coin.
    ///
    /// Saturates at `u64::MAX`; per-pool totals are bounded by the max-stake
    /// policy well below that, so saturation is unreachable in practice and
    /// the epoch engine can rely on merge never failing.
    pub fn merge(&mut self, other: Coin<T>) {
        self.value = self.value.saturating_add(other.value);
    }

    /// Split `amount` out of this coin.
    pub fn extract(&mut self, amount: u64) -> CoreResult<Coin<T>> {
        if amount > self.value {
            return Err(CoreError::InsufficientBalance {
                requested: amount,
                available: self.value,
            });
        }
        self.value -= amount;
        Ok(Coin {
            value: amount,
            marker: PhantomData,
        })
    }

    /// Take the entire value, leaving this coin empty.
    pub fn extract_all(&mut self) -> Coin<T> {
        let value = std::mem::take(&mut self.value);
        Coin {
            value,
            marker: PhantomData,
        }
    }

    fn from_value(value: u64) -> Self {
        Self {
            value,
            marker: PhantomData,
        }
    }
}

/// Capability to mint coins of type `T`. Move-only; created exactly once.
#[derive(Debug)]
pub struct MintCapability<T> {
    marker: PhantomData<T>,
}

/// Capability to burn coins of type `T`. Move-only; created exactly once.
#[derive(Debug)]
pub struct BurnCapability<T> {
    marker: PhantomData<T>,
}

/// The coin subsystem: total supply plus per-account stores.
#[derive(Debug, Serialize, Deserialize)]
pub struct CoinLedger<T> {
    supply: BigUint,
    stores: HashMap<Address, u64>,
    #[serde(skip)]
    marker: PhantomData<T>,
}

impl<T> CoinLedger<T> {
    /// One-shot initialization. The returned capabilities are the only way
    /// coins of this type ever enter or leave circulation.
    pub fn initialize() -> (Self, MintCapability<T>, BurnCapability<T>) {
        (
            Self {
                supply: BigUint::from(0u64),
                stores: HashMap::new(),
                marker: PhantomData,
            },
            MintCapability {
                marker: PhantomData,
            },
            BurnCapability {
                marker: PhantomData,
            },
        )
    }

    /// Create an empty store for `addr`.
    pub fn register(&mut self, addr: Address) -> CoreResult<()> {
        if self.stores.contains_key(&addr) {
            return Err(CoreError::StoreAlreadyRegistered(addr.to_hex()));
        }
        self.stores.insert(addr, 0);
        Ok(())
    }

    pub fn is_registered(&self, addr: &Address) -> bool {
        self.stores.contains_key(addr)
    }

    pub fn balance(&self, addr: &Address) -> u64 {
        self.stores.get(addr).copied().unwrap_or(0)
    }

    /// Total number of tokens in circulation
    pub fn supply(&self) -> &BigUint {
        &self.supply
    }

    /// Mint fresh coins, growing the supply.
    pub fn mint(&mut self, amount: u64, _cap: &MintCapability<T>) -> Coin<T> {
        self.supply += BigUint::from(amount);
        Coin::from_value(amount)
    }

    /// Burn coins, shrinking the supply.
    pub fn burn(&mut self, coin: Coin<T>, _cap: &BurnCapability<T>) {
        let value = BigUint::from(coin.value());
        if self.supply >= value {
            self.supply -= value;
        }
    }

    /// Deposit a coin into the store at `addr`.
    pub fn deposit(&mut self, addr: Address, coin: Coin<T>) -> CoreResult<()> {
        let balance = self
            .stores
            .get_mut(&addr)
            .ok_or_else(|| CoreError::StoreMissing(addr.to_hex()))?;
        *balance = balance.saturating_add(coin.value());
        Ok(())
    }

    /// Withdraw `amount` from the store at `addr`.
    pub fn withdraw(&mut self, addr: Address, amount: u64) -> CoreResult<Coin<T>> {
        let balance = self
            .stores
            .get_mut(&addr)
            .ok_or_else(|| CoreError::StoreMissing(addr.to_hex()))?;
        if amount > *balance {
            return Err(CoreError::InsufficientBalance {
                requested: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        Ok(Coin::from_value(amount))
    }
}
