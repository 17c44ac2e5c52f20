// staking/src/capability.rs

//! Authorization primitives
//!
//! Two mechanisms gate staking mutations. A [`Signer`] proves that the
//! current transaction was authorized by an address; operator-gated calls
//! compare it against the pool's operator. An [`OwnerCapability`] is a
//! bearer token minted once at pool creation; possession alone authorizes
//! the stake-bearing operations on its pool.

use chain_crypto::Address;
use serde::{Deserialize, Serialize};

/// Proof that the enclosing transaction was signed by `address`.
///
/// Constructed by the transaction runtime (or by genesis and tests); the
/// staking core itself never fabricates signers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signer {
    address: Address,
}

impl Signer {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

/// Bearer token authorizing stake-bearing operations on one pool.
///
/// Move-only: no `Clone`, no way to conjure one from public state. Exactly
/// one exists per pool, created with the pool and thereafter transferred
/// only through `extract_owner_cap` / `deposit_owner_cap`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerCapability {
    pool_address: Address,
}

impl OwnerCapability {
    /// Minted by the engine when a pool is created.
    pub(crate) fn new(pool_address: Address) -> Self {
        Self { pool_address }
    }

    pub fn pool_address(&self) -> Address {
        self.pool_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signer_address() {
        let signer = Signer::new(Address::zero());
        assert_eq!(signer.address(), Address::zero());
    }

    #[test]
    fn test_capability_binds_pool() {
        let cap = OwnerCapability::new(Address::zero());
        assert_eq!(cap.pool_address(), Address::zero());
    }
}
