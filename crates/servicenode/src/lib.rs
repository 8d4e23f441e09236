//! Service node identity, collateral-backed trust, and liveness protocol.
//!
//! Registrations bind an identity key to a tier and, for paid tiers, to
//! spendable collateral; pings keep a registration fresh by anchoring it to
//! recent chain state. Validation reads chain and UTXO state through two
//! injected functions and never mutates the entities it checks.

pub mod config;
pub mod keys;
pub mod legacy;
pub mod ping;
pub mod registry;
pub mod script;
pub mod servicenode;

pub use config::{parse_service_config, ConfigEntry, ConfigError};
pub use keys::{recover_compact, sign_compact, KeyId, RecoveredKey};
pub use legacy::LegacyPacket;
pub use ping::ServiceNodePing;
pub use registry::ServiceNodeRegistry;
pub use servicenode::{ServiceNode, Tier, ValidationError};
