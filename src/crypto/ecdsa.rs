//! Recoverable ECDSA signatures
//!
//! Uses the secp256k1 curve. A signature carries its recovery id so the
//! signer's public key (and therefore address) can be recovered from the
//! signed digest alone.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

use super::{hash_bytes, Hash};

/// Length of `r || s || v`
pub const SIGNATURE_LENGTH: usize = 65;

/// Length of an address in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// Signature errors
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Signing failed: {0}")]
    SigningFailed(String),
    #[error("Failed to recover public key from signature")]
    RecoveryFailed,
}

/// 32-byte private key
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey([REDACTED])")
    }
}

/// secp256k1 public key
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

/// 65-byte signature: 64 bytes of `r || s` followed by the recovery id
#[derive(Clone, PartialEq, Eq)]
pub struct RecoverableSignature(pub [u8; SIGNATURE_LENGTH]);

impl PrivateKey {
    /// Generate a new random private key
    pub fn generate() -> Self {
        PrivateKey(SigningKey::random(&mut OsRng))
    }

    /// Create from raw scalar bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        SigningKey::from_slice(bytes)
            .map(PrivateKey)
            .map_err(|_| SignatureError::InvalidPrivateKey)
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key().clone())
    }

    /// Sign a message digest
    pub fn sign(&self, message: &Hash) -> Result<RecoverableSignature, SignatureError> {
        let (signature, recovery_id) = self
            .0
            .sign_prehash_recoverable(&message.0)
            .map_err(|e| SignatureError::SigningFailed(e.to_string()))?;

        let mut bytes = [0u8; SIGNATURE_LENGTH];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery_id.to_byte();
        Ok(RecoverableSignature(bytes))
    }

    /// Export to bytes
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes().into()
    }
}

impl PublicKey {
    /// Parse a SEC1-encoded key (compressed or uncompressed)
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        VerifyingKey::from_sec1_bytes(bytes)
            .map(PublicKey)
            .map_err(|_| SignatureError::InvalidPublicKey)
    }

    /// Uncompressed SEC1 encoding (65 bytes, leading 0x04 tag)
    pub fn to_uncompressed_bytes(&self) -> Vec<u8> {
        self.0.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Verify a signature over a message digest
    pub fn verify(&self, message: &Hash, signature: &RecoverableSignature) -> bool {
        let sig = match Signature::from_slice(&signature.0[..64]) {
            Ok(s) => s,
            Err(_) => return false,
        };

        self.0.verify_prehash(&message.0, &sig).is_ok()
    }

    /// Derive the account address for this key
    pub fn to_address(&self) -> [u8; ADDRESS_LENGTH] {
        address_from_public_key(self)
    }
}

impl RecoverableSignature {
    /// Parse from a hex string
    pub fn from_hex(hex: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(hex).map_err(|_| SignatureError::InvalidSignature)?;
        if bytes.len() != SIGNATURE_LENGTH {
            return Err(SignatureError::InvalidSignature);
        }
        let mut arr = [0u8; SIGNATURE_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(RecoverableSignature(arr))
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Recover the public key that produced this signature over `message`
    pub fn recover(&self, message: &Hash) -> Result<PublicKey, SignatureError> {
        let signature =
            Signature::from_slice(&self.0[..64]).map_err(|_| SignatureError::InvalidSignature)?;
        let recovery_id =
            RecoveryId::from_byte(self.0[64]).ok_or(SignatureError::InvalidSignature)?;

        VerifyingKey::recover_from_prehash(&message.0, &signature, recovery_id)
            .map(PublicKey)
            .map_err(|_| SignatureError::RecoveryFailed)
    }
}

/// Address = last 20 bytes of the hash of the uncompressed key, tag byte excluded
pub fn address_from_public_key(public_key: &PublicKey) -> [u8; ADDRESS_LENGTH] {
    let encoded = public_key.to_uncompressed_bytes();
    let digest = hash_bytes(&encoded[1..]);

    let mut address = [0u8; ADDRESS_LENGTH];
    address.copy_from_slice(&digest.0[32 - ADDRESS_LENGTH..]);
    address
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_uncompressed_bytes()))
    }
}

impl std::fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}
