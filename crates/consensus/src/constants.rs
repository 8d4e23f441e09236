//! Consensus-wide constants shared across validation.

/// Base units per coin.
pub const COIN: i64 = 100_000_000;
/// Collateral required to register an SPV-tier service node (network rule).
pub const COLLATERAL_SPV: i64 = 5_000 * COIN;
/// Maximum number of collateral inputs accepted on a registration (network rule).
pub const SN_MAX_COLLATERAL_COUNT: usize = 10;
/// Anchors referencing a block this many blocks behind the tip are stale.
pub const SN_STALE_BLOCKS: u32 = 4;
