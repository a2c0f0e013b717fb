//! Account-style transactions signed with recoverable ECDSA
//!
//! The signature covers the canonical JSON encoding of the body only, so the
//! ledger can assign `id` and `timestamp` after the client signed.

use serde::{Deserialize, Serialize};

use super::LedgerError;
use crate::crypto::{hash_bytes, Hash, PrivateKey, RecoverableSignature};

/// Reserved sender marking a mining reward
pub const COINBASE_SENDER: &str = "0";

/// Transfer details covered by the signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionBody {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
}

impl TransactionBody {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, amount: f64) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
        }
    }

    /// Digest that gets signed
    pub fn signing_hash(&self) -> Result<Hash, LedgerError> {
        let encoded = serde_json::to_vec(self)?;
        Ok(hash_bytes(&encoded))
    }

    /// Effect of this transfer on the balance of `address`
    pub fn balance_delta(&self, address: &str) -> f64 {
        let mut delta = 0.0;
        if address == self.recipient {
            delta += self.amount;
        }
        if address == self.sender {
            delta -= self.amount;
        }
        delta
    }
}

/// A transaction as stored in the pool and in blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Assigned by the ledger on admission when empty
    #[serde(default)]
    pub id: String,
    /// Milliseconds since the Unix epoch, assigned on admission when zero
    #[serde(default)]
    pub timestamp: i64,
    pub body: TransactionBody,
    /// Hex-encoded `r || s || v`
    #[serde(default)]
    pub signature: String,
}

impl Transaction {
    /// Unsigned transaction; only admissible as coinbase
    pub fn unsigned(body: TransactionBody) -> Self {
        Self {
            id: String::new(),
            timestamp: 0,
            body,
            signature: String::new(),
        }
    }

    /// Reward transaction paying `amount` to `recipient`
    pub fn coinbase(recipient: impl Into<String>, amount: f64) -> Self {
        Self::unsigned(TransactionBody::new(COINBASE_SENDER, recipient, amount))
    }

    /// Sign `body` with the sender's key
    pub fn signed(body: TransactionBody, key: &PrivateKey) -> Result<Self, LedgerError> {
        let digest = body.signing_hash()?;
        let signature = key
            .sign(&digest)
            .map_err(|_| LedgerError::InvalidSignature)?;

        Ok(Self {
            signature: signature.to_hex(),
            ..Self::unsigned(body)
        })
    }

    pub fn is_coinbase(&self) -> bool {
        self.body.sender == COINBASE_SENDER
    }

    /// Check that the signature is valid and was produced by the declared sender
    pub fn verify_sender(&self) -> Result<(), LedgerError> {
        let digest = self.body.signing_hash()?;

        let signature = RecoverableSignature::from_hex(&self.signature)
            .map_err(|_| LedgerError::InvalidSignature)?;
        let public_key = signature
            .recover(&digest)
            .map_err(|_| LedgerError::InvalidSignature)?;

        let sender = hex::decode(&self.body.sender).map_err(|_| LedgerError::UnknownSender)?;
        if public_key.to_address().as_slice() != sender.as_slice() {
            return Err(LedgerError::UnknownSender);
        }

        if !public_key.verify(&digest, &signature) {
            return Err(LedgerError::InvalidSignature);
        }

        Ok(())
    }
}
