//! Core wire types and consensus serialization.

pub mod base58;
pub mod encoding;
pub mod hash;
pub mod outpoint;
pub mod transaction;

pub use base58::{
    address_to_key_hash, key_hash_to_address, secret_key_to_wif, wif_to_secret_key, Base58Error,
};
pub use hash::{hash160, sha256, sha256d};
pub use outpoint::OutPoint;
pub use transaction::{Transaction, TxIn, TxOut};
