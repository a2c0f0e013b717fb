//! Cryptography module - BLAKE3 hashing and recoverable ECDSA signatures

mod hash;
mod ecdsa;
pub mod hex_serde;

pub use hash::*;
pub use ecdsa::*;
