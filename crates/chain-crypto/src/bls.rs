// chain-crypto/src/bls.rs

//! BLS12-381 consensus keys
//!
//! Validators identify themselves to consensus with a BLS12-381 public key.
//! Registration requires a proof of possession: a signature over the
//! compressed public key itself, which prevents rogue-key attacks on
//! signature aggregation downstream.
//!
//! Public keys are compressed G2 points (96 bytes), signatures compressed G1
//! points (48 bytes). Pure Rust implementation, no C toolchain required.

use crate::{CryptoError, CryptoResult};
use bls12_381_plus::{
    multi_miller_loop, G1Affine, G1Projective, G2Affine, G2Prepared, G2Projective, Gt, Scalar,
};
use ff::Field;
use group::{Curve, Group};
use std::fmt;
use std::ops::Neg;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Domain separation tags. Signatures are only valid in the context they
/// were produced for.
pub mod dst {
    /// DST for general message signing
    pub const MESSAGE: &[u8] = b"STAKING_BLS_SIG_MESSAGE_V1";
    /// DST for proof of possession
    pub const PROOF_OF_POSSESSION: &[u8] = b"STAKING_BLS_POP_V1";
}

/// Hash a message to a point on G1 with the given domain separation tag.
fn hash_to_g1(message: &[u8], dst: &[u8]) -> G1Projective {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(dst);
    hasher.update((message.len() as u64).to_le_bytes());
    hasher.update(message);
    let first = hasher.finalize();

    let mut hasher = Sha256::new();
    hasher.update(first);
    hasher.update(b"_wide");
    let second = hasher.finalize();

    let mut wide = [0u8; 64];
    wide[..32].copy_from_slice(&first);
    wide[32..].copy_from_slice(&second);

    G1Projective::generator() * Scalar::from_bytes_wide(&wide)
}

/// BLS secret key. Zeroized on drop; never serialized.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BlsSecretKey {
    #[zeroize(skip)]
    scalar: Scalar,
    bytes: [u8; 32],
}

impl BlsSecretKey {
    /// Generate a fresh secret key from OS entropy
    pub fn generate() -> CryptoResult<Self> {
        let mut wide = [0u8; 64];
        getrandom::getrandom(&mut wide).map_err(|_| CryptoError::RngError)?;

        let scalar = Scalar::from_bytes_wide(&wide);
        wide.zeroize();

        if bool::from(scalar.is_zero()) {
            return Err(CryptoError::InvalidSecretKey);
        }

        Ok(Self {
            scalar,
            bytes: scalar.to_le_bytes(),
        })
    }

    /// Reconstruct from 32 little-endian bytes
    pub fn from_bytes(bytes: &[u8; 32]) -> CryptoResult<Self> {
        if bytes.iter().all(|&b| b == 0) {
            return Err(CryptoError::InvalidSecretKey);
        }

        let scalar_opt = Scalar::from_le_bytes(bytes);
        if bool::from(scalar_opt.is_none()) {
            return Err(CryptoError::InvalidSecretKey);
        }
        let scalar = scalar_opt.unwrap();

        Ok(Self {
            scalar,
            bytes: *bytes,
        })
    }

    /// Corresponding public key (G2 point)
    pub fn public_key(&self) -> BlsPublicKey {
        let point = G2Projective::generator() * self.scalar;
        BlsPublicKey {
            point: point.to_affine(),
        }
    }

    /// Sign a message under the given domain separation tag
    pub fn sign(&self, message: &[u8], dst: &[u8]) -> BlsSignature {
        let h = hash_to_g1(message, dst);
        BlsSignature {
            point: (h * self.scalar).to_affine(),
        }
    }

    /// Produce the proof of possession for this key: a signature over the
    /// compressed public key under the PoP tag.
    pub fn proof_of_possession(&self) -> ProofOfPossession {
        let pk_bytes = self.public_key().to_bytes();
        ProofOfPossession {
            signature: self.sign(&pk_bytes, dst::PROOF_OF_POSSESSION),
        }
    }
}

impl fmt::Debug for BlsSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsSecretKey([REDACTED])")
    }
}

/// BLS public key (96 bytes compressed G2)
#[derive(Clone, Copy)]
pub struct BlsPublicKey {
    point: G2Affine,
}

impl BlsPublicKey {
    /// Compressed size in bytes
    pub const BYTES: usize = 96;

    /// Parse from compressed bytes. Rejects malformed encodings, points
    /// outside the subgroup and the identity element.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != Self::BYTES {
            return Err(CryptoError::InvalidPublicKey);
        }
        if bytes.iter().all(|&b| b == 0) {
            return Err(CryptoError::InvalidPublicKey);
        }

        let mut arr = [0u8; 96];
        arr.copy_from_slice(bytes);

        let point_opt = G2Affine::from_compressed(&arr);
        if bool::from(point_opt.is_none()) {
            return Err(CryptoError::InvalidPublicKey);
        }
        let point = point_opt.unwrap();

        if bool::from(point.is_identity()) {
            return Err(CryptoError::InvalidPublicKey);
        }

        Ok(Self { point })
    }

    /// Serialize to compressed bytes
    pub fn to_bytes(&self) -> [u8; 96] {
        self.point.to_compressed()
    }

    /// Verify a signature by pairing: e(sig, -g2) * e(H(m), pk) == 1
    pub fn verify(&self, message: &[u8], signature: &BlsSignature, dst: &[u8]) -> bool {
        let h = hash_to_g1(message, dst).to_affine();
        let g2_neg = G2Prepared::from(G2Affine::generator().neg());
        let pk = G2Prepared::from(self.point);

        let result = multi_miller_loop(&[(&signature.point, &g2_neg), (&h, &pk)])
            .final_exponentiation();

        result == Gt::identity()
    }

    /// Verify a proof of possession for this key
    pub fn verify_proof_of_possession(&self, pop: &ProofOfPossession) -> bool {
        let pk_bytes = self.to_bytes();
        self.verify(&pk_bytes, &pop.signature, dst::PROOF_OF_POSSESSION)
    }
}

impl fmt::Debug for BlsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsPublicKey({}...)", hex::encode(&self.to_bytes()[..8]))
    }
}

impl PartialEq for BlsPublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.point == other.point
    }
}

impl Eq for BlsPublicKey {}

/// BLS signature (48 bytes compressed G1)
#[derive(Clone, Copy)]
pub struct BlsSignature {
    point: G1Affine,
}

impl BlsSignature {
    /// Compressed size in bytes
    pub const BYTES: usize = 48;

    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != Self::BYTES {
            return Err(CryptoError::InvalidSignature);
        }

        let mut arr = [0u8; 48];
        arr.copy_from_slice(bytes);

        let point_opt = G1Affine::from_compressed(&arr);
        if bool::from(point_opt.is_none()) {
            return Err(CryptoError::InvalidSignature);
        }

        Ok(Self {
            point: point_opt.unwrap(),
        })
    }

    pub fn to_bytes(&self) -> [u8; 48] {
        self.point.to_compressed()
    }
}

impl fmt::Debug for BlsSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlsSignature({}...)", hex::encode(&self.to_bytes()[..8]))
    }
}

/// Proof of possession of a BLS secret key
#[derive(Clone, Copy)]
pub struct ProofOfPossession {
    signature: BlsSignature,
}

impl ProofOfPossession {
    /// Compressed size in bytes
    pub const BYTES: usize = 48;

    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        Ok(Self {
            signature: BlsSignature::from_bytes(bytes)
                .map_err(|_| CryptoError::InvalidProofOfPossession)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; 48] {
        self.signature.to_bytes()
    }
}

impl fmt::Debug for ProofOfPossession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofOfPossession({}...)", hex::encode(&self.to_bytes()[..8]))
    }
}

/// Verify a proof of possession over raw bytes, as the staking core consumes
/// them from transaction arguments. Malformed input is a failed verification,
/// never a panic.
pub fn verify_bls_pop(pubkey_bytes: &[u8], pop_bytes: &[u8]) -> bool {
    let pk = match BlsPublicKey::from_bytes(pubkey_bytes) {
        Ok(pk) => pk,
        Err(_) => return false,
    };
    let pop = match ProofOfPossession::from_bytes(pop_bytes) {
        Ok(pop) => pop,
        Err(_) => return false,
    };
    pk.verify_proof_of_possession(&pop)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let sk = BlsSecretKey::generate().unwrap();
        let pk = sk.public_key();
        let sig = sk.sign(b"hello", dst::MESSAGE);

        assert!(pk.verify(b"hello", &sig, dst::MESSAGE));
        assert!(!pk.verify(b"other", &sig, dst::MESSAGE));
    }

    #[test]
    fn test_domain_separation() {
        let sk = BlsSecretKey::generate().unwrap();
        let pk = sk.public_key();
        let sig = sk.sign(b"hello", dst::MESSAGE);

        // Same message, wrong tag
        assert!(!pk.verify(b"hello", &sig, dst::PROOF_OF_POSSESSION));
    }

    #[test]
    fn test_pop_verifies_for_own_key_only() {
        let sk1 = BlsSecretKey::generate().unwrap();
        let sk2 = BlsSecretKey::generate().unwrap();
        let pop1 = sk1.proof_of_possession();

        assert!(sk1.public_key().verify_proof_of_possession(&pop1));
        assert!(!sk2.public_key().verify_proof_of_possession(&pop1));
    }

    #[test]
    fn test_verify_bls_pop_bytes() {
        let sk = BlsSecretKey::generate().unwrap();
        let pk_bytes = sk.public_key().to_bytes();
        let pop_bytes = sk.proof_of_possession().to_bytes();

        assert!(verify_bls_pop(&pk_bytes, &pop_bytes));
        assert!(!verify_bls_pop(&pk_bytes[..95], &pop_bytes));
        assert!(!verify_bls_pop(&[0u8; 96], &pop_bytes));
        assert!(!verify_bls_pop(&pk_bytes, &[1u8; 48]));
    }

    #[test]
    fn test_public_key_round_trip() {
        let sk = BlsSecretKey::generate().unwrap();
        let pk = sk.public_key();
        let parsed = BlsPublicKey::from_bytes(&pk.to_bytes()).unwrap();
        assert_eq!(pk, parsed);
    }

    #[test]
    fn test_secret_key_round_trip() {
        let sk = BlsSecretKey::generate().unwrap();
        let restored = BlsSecretKey::from_bytes(&sk.bytes).unwrap();
        assert_eq!(sk.public_key(), restored.public_key());
    }

    #[test]
    fn test_zero_secret_key_rejected() {
        assert!(BlsSecretKey::from_bytes(&[0u8; 32]).is_err());
    }
}
