// chain-crypto/src/lib.rs

//! Cryptographic primitives for the staking framework
//!
//! This crate provides:
//! - Account addresses and hex encoding
//! - BLS12-381 consensus keys with proof-of-possession verification

pub mod address;
pub mod bls;

pub use address::{Address, FRAMEWORK_ADDRESS};
pub use bls::{BlsPublicKey, BlsSecretKey, ProofOfPossession};

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur during cryptographic operations
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid secret key")]
    InvalidSecretKey,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Proof of possession verification failed")]
    InvalidProofOfPossession,

    #[error("Random number generation failed")]
    RngError,

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_round_trip() {
        let sk = BlsSecretKey::generate().unwrap();
        let pk = sk.public_key();
        let pop = sk.proof_of_possession();
        assert!(pk.verify_proof_of_possession(&pop));
    }
}
