//! Consensus types and constants shared across validation.

pub mod constants;

pub use constants::*;

/// 32-byte hash, stored little-endian as it appears on the wire.
pub type Hash256 = [u8; 32];
