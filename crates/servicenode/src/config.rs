//! Service configuration strings and the local node configuration file.

use std::fmt;

use rand::RngCore;
use secp256k1::SecretKey;
use tracing::warn;

use xchain_primitives::{
    address_to_key_hash, hash160, key_hash_to_address, secret_key_to_wif, wif_to_secret_key,
};

use crate::keys::{pubkey_bytes, KeyId};
use crate::servicenode::Tier;

/// Parses a service configuration string: a protocol version followed by
/// service identifiers, delimited by commas or spaces. Returns `None` when
/// the leading token is missing or not a positive integer (an empty leading
/// token is a parse failure, not version zero).
pub fn parse_service_config(raw: &str) -> Option<(u32, Vec<String>)> {
    let mut tokens = raw.split([',', ' ']);
    let version: u32 = tokens.next()?.parse().ok()?;
    if version == 0 {
        return None;
    }
    let services = tokens
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();
    Some((version, services))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigError {
    MissingField(&'static str),
    BadTier,
    BadKey,
    BadAddress,
    MissingAddress,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingField(field) => write!(f, "missing {field}"),
            ConfigError::BadTier => write!(f, "unrecognized tier name"),
            ConfigError::BadKey => write!(f, "invalid identity key"),
            ConfigError::BadAddress => write!(f, "invalid payment address"),
            ConfigError::MissingAddress => write!(f, "payment address required for paid tier"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// One entry of the local node configuration file:
/// `alias tier wif-key [payment-address]`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigEntry {
    pub alias: String,
    pub tier: Tier,
    pub secret: [u8; 32],
    pub compressed: bool,
    pub payment_address: KeyId,
}

impl ConfigEntry {
    pub fn identity_key(&self) -> Option<Vec<u8>> {
        let secret = SecretKey::from_slice(&self.secret).ok()?;
        Some(pubkey_bytes(&secret, self.compressed))
    }
}

pub fn parse_entry(line: &str) -> Result<ConfigEntry, ConfigError> {
    let mut fields = line.split_whitespace();
    let alias = fields.next().ok_or(ConfigError::MissingField("alias"))?;
    let tier_name = fields.next().ok_or(ConfigError::MissingField("tier"))?;
    let wif = fields.next().ok_or(ConfigError::MissingField("key"))?;
    let address = fields.next();

    let tier = Tier::from_name(tier_name).ok_or(ConfigError::BadTier)?;
    let (secret, compressed) = wif_to_secret_key(wif).map_err(|_| ConfigError::BadKey)?;
    if SecretKey::from_slice(&secret).is_err() {
        return Err(ConfigError::BadKey);
    }

    let payment_address = match address {
        Some(address) => KeyId(address_to_key_hash(address).map_err(|_| ConfigError::BadAddress)?),
        None if tier.requires_collateral() => return Err(ConfigError::MissingAddress),
        None => KeyId::null(),
    };

    Ok(ConfigEntry {
        alias: alias.to_string(),
        tier,
        secret,
        compressed,
        payment_address,
    })
}

/// Loads configuration entries from file contents. Blank lines and `#`
/// comments are skipped; entries that fail to parse are skipped with a
/// warning rather than aborting the load.
pub fn load_entries(contents: &str) -> Vec<ConfigEntry> {
    let mut entries = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_entry(line) {
            Ok(entry) => entries.push(entry),
            Err(err) => warn!("skipping service node config entry: {err}"),
        }
    }
    entries
}

/// Canonical single-line form of an entry, as written back to disk.
pub fn format_entry(entry: &ConfigEntry) -> String {
    let wif = secret_key_to_wif(&entry.secret, entry.compressed);
    if entry.payment_address.is_null() {
        format!("{} {} {}", entry.alias, entry.tier.name(), wif)
    } else {
        format!(
            "{} {} {} {}",
            entry.alias,
            entry.tier.name(),
            wif,
            key_hash_to_address(&entry.payment_address.0)
        )
    }
}

/// Generates a fresh identity key for local setup, returned in WIF form.
pub fn generate_identity_key() -> String {
    let mut rng = rand::rngs::OsRng;
    let mut seed = [0u8; 32];
    loop {
        rng.fill_bytes(&mut seed);
        if SecretKey::from_slice(&seed).is_ok() {
            return secret_key_to_wif(&seed, true);
        }
    }
}

/// Key hash of a secret key's public key, for deriving a default payment
/// address during setup.
pub fn payment_key_id(secret: &SecretKey, compressed: bool) -> KeyId {
    KeyId(hash160(&pubkey_bytes(secret, compressed)))
}
