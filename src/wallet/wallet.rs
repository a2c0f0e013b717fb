//! Wallet implementation
//!
//! A wallet is a single secp256k1 key pair plus its derived address. Byte
//! fields travel as hex strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{hex_serde, PrivateKey, SignatureError};
use crate::ledger::{LedgerError, Transaction, TransactionBody};

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid key material: {0}")]
    InvalidKey(#[from] SignatureError),
    #[error("failed to build transaction: {0}")]
    Ledger(#[from] LedgerError),
}

/// A wallet key pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    #[serde(with = "hex_serde")]
    pub address: Vec<u8>,
    #[serde(with = "hex_serde")]
    pub private_key: Vec<u8>,
    /// Uncompressed SEC1 encoding
    #[serde(with = "hex_serde")]
    pub public_key: Vec<u8>,
}

impl Wallet {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self::from_private_key(&PrivateKey::generate())
    }

    pub fn from_private_key(key: &PrivateKey) -> Self {
        let public_key = key.public_key();

        Self {
            address: public_key.to_address().to_vec(),
            private_key: key.to_bytes().to_vec(),
            public_key: public_key.to_uncompressed_bytes(),
        }
    }

    /// Address as used in transaction bodies
    pub fn address_hex(&self) -> String {
        hex::encode(&self.address)
    }

    pub fn signing_key(&self) -> Result<PrivateKey, WalletError> {
        Ok(PrivateKey::from_bytes(&self.private_key)?)
    }

    /// Build a transfer from this wallet signed with its key
    pub fn new_transaction(
        &self,
        recipient: impl Into<String>,
        amount: f64,
    ) -> Result<Transaction, WalletError> {
        let body = TransactionBody::new(self.address_hex(), recipient, amount);
        Ok(Transaction::signed(body, &self.signing_key()?)?)
    }
}
