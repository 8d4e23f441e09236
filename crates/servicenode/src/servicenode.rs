//! Service node registration records and their validation.

use std::collections::HashSet;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use secp256k1::SecretKey;

use xchain_consensus::{Hash256, COLLATERAL_SPV, SN_MAX_COLLATERAL_COUNT};
use xchain_primitives::encoding::{Decodable, DecodeError, Decoder, Encodable, Encoder};
use xchain_primitives::{sha256d, OutPoint, Transaction};

use crate::config::parse_service_config;
use crate::keys::{is_fully_valid, recover_compact, sign_compact, KeyId};
use crate::script::{extract_destination, script_id};

/// Trust tiers a service node may register under. Codes carry gaps for
/// future tiers; unknown codes never validate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tier {
    Open,
    Spv,
}

impl Tier {
    pub fn from_code(code: u8) -> Option<Tier> {
        match code {
            0 => Some(Tier::Open),
            50 => Some(Tier::Spv),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Tier::Open => 0,
            Tier::Spv => 50,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Tier::Open => "OPEN",
            Tier::Spv => "SPV",
        }
    }

    pub fn from_name(name: &str) -> Option<Tier> {
        if name.eq_ignore_ascii_case("OPEN") {
            Some(Tier::Open)
        } else if name.eq_ignore_ascii_case("SPV") {
            Some(Tier::Spv)
        } else {
            None
        }
    }

    /// Minimum total collateral value backing a registration at this tier.
    pub fn min_collateral(self) -> i64 {
        match self {
            Tier::Open => 0,
            Tier::Spv => COLLATERAL_SPV,
        }
    }

    pub fn requires_collateral(self) -> bool {
        self.min_collateral() > 0
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationError {
    /// The anchor is not on the recognized chain or outside the freshness
    /// window.
    StaleOrUnknownAnchor,
    /// The identity key is not a valid curve point, or a recovered signer
    /// does not match the claimed identity.
    InvalidIdentity,
    /// The tier byte does not name a defined tier.
    UnknownTier(u8),
    /// A collateral proof failed; security-relevant, distinguishable from
    /// benign staleness in logs.
    Collateral(&'static str),
    /// The service configuration string has no parseable protocol version.
    MalformedConfig,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::StaleOrUnknownAnchor => write!(f, "stale or unknown chain anchor"),
            ValidationError::InvalidIdentity => write!(f, "invalid identity key or signature"),
            ValidationError::UnknownTier(code) => write!(f, "unknown tier code {code}"),
            ValidationError::Collateral(message) => write!(f, "collateral fault: {message}"),
            ValidationError::MalformedConfig => write!(f, "malformed service config"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub(crate) fn unix_time() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// A service node registration: identity, tier, collateral references, and
/// the recoverable signature binding them to a chain anchor.
#[derive(Clone, Debug)]
pub struct ServiceNode {
    // network serialized
    identity_key: Vec<u8>,
    tier: u8,
    payment_address: KeyId,
    collateral: Vec<OutPoint>,
    anchor_height: u32,
    anchor_hash: Hash256,
    signature: Vec<u8>,

    // in-memory only
    registered_at: i64,
    last_ping: i64,
    ping_anchor_height: u32,
    ping_anchor_hash: Hash256,
    raw_config: String,
    protocol_version: u32,
    services: Vec<String>,
}

impl PartialEq for ServiceNode {
    // identity-key equality, as on the wire protocol
    fn eq(&self, other: &Self) -> bool {
        self.identity_key == other.identity_key
    }
}

impl Eq for ServiceNode {}

impl Default for ServiceNode {
    fn default() -> Self {
        Self::new(Vec::new(), Tier::Open.code(), KeyId::null(), Vec::new(), 0, [0u8; 32])
    }
}

impl ServiceNode {
    pub fn new(
        identity_key: Vec<u8>,
        tier: u8,
        payment_address: KeyId,
        collateral: Vec<OutPoint>,
        anchor_height: u32,
        anchor_hash: Hash256,
    ) -> Self {
        Self {
            identity_key,
            tier,
            payment_address,
            collateral,
            anchor_height,
            anchor_hash,
            signature: Vec::new(),
            registered_at: unix_time(),
            last_ping: 0,
            ping_anchor_height: anchor_height,
            ping_anchor_hash: anchor_hash,
            raw_config: String::new(),
            protocol_version: 0,
            services: Vec::new(),
        }
    }

    /// Canonical signing digest over the registration fields, excluding the
    /// signature itself. Order-sensitive over the collateral sequence.
    pub fn create_sig_hash(
        identity_key: &[u8],
        tier: u8,
        payment_address: &KeyId,
        collateral: &[OutPoint],
        anchor_height: u32,
        anchor_hash: &Hash256,
    ) -> Hash256 {
        let mut encoder = Encoder::new();
        encoder.write_var_bytes(identity_key);
        encoder.write_u8(tier);
        encoder.write_bytes(&payment_address.0);
        encoder.write_varint(collateral.len() as u64);
        for outpoint in collateral {
            outpoint.consensus_encode(&mut encoder);
        }
        encoder.write_u32_le(anchor_height);
        encoder.write_bytes(anchor_hash);
        sha256d(&encoder.into_inner())
    }

    pub fn sig_hash(&self) -> Hash256 {
        Self::create_sig_hash(
            &self.identity_key,
            self.tier,
            &self.payment_address,
            &self.collateral,
            self.anchor_height,
            &self.anchor_hash,
        )
    }

    /// Content hash over wire-transmitted fields plus the last seen config.
    /// Local bookkeeping fields are deliberately excluded so the hash is
    /// equal across peers that decoded the same bytes.
    pub fn record_hash(&self) -> Hash256 {
        let mut encoder = Encoder::new();
        self.consensus_encode(&mut encoder);
        encoder.write_var_str(&self.raw_config);
        sha256d(&encoder.into_inner())
    }

    /// Signs the registration with the identity (OPEN) or collateral (paid
    /// tier) secret key.
    pub fn sign(&mut self, secret: &SecretKey, compressed: bool) -> bool {
        match sign_compact(secret, &self.sig_hash(), compressed) {
            Some(sig) => {
                self.signature = sig.to_vec();
                true
            }
            None => false,
        }
    }

    pub fn is_null(&self) -> bool {
        !is_fully_valid(&self.identity_key)
    }

    pub fn identity_key(&self) -> &[u8] {
        &self.identity_key
    }

    pub fn key_id(&self) -> KeyId {
        KeyId::from_pubkey_bytes(&self.identity_key)
    }

    pub fn tier_code(&self) -> u8 {
        self.tier
    }

    pub fn tier(&self) -> Option<Tier> {
        Tier::from_code(self.tier)
    }

    pub fn payment_address(&self) -> &KeyId {
        &self.payment_address
    }

    pub fn collateral(&self) -> &[OutPoint] {
        &self.collateral
    }

    pub fn anchor_height(&self) -> u32 {
        self.anchor_height
    }

    pub fn anchor_hash(&self) -> &Hash256 {
        &self.anchor_hash
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn registered_at(&self) -> i64 {
        self.registered_at
    }

    pub fn last_ping(&self) -> i64 {
        self.last_ping
    }

    pub fn ping_anchor_height(&self) -> u32 {
        self.ping_anchor_height
    }

    pub fn ping_anchor_hash(&self) -> &Hash256 {
        &self.ping_anchor_hash
    }

    pub fn raw_config(&self) -> &str {
        &self.raw_config
    }

    pub fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    pub fn service_list(&self) -> &[String] {
        &self.services
    }

    /// Records a fresher chain anchor observed via a ping.
    pub fn set_ping_anchor(&mut self, height: u32, hash: Hash256) {
        self.ping_anchor_height = height;
        self.ping_anchor_hash = hash;
    }

    /// Assigns the raw service config, reparsing the protocol version and
    /// service list. Unparseable configs leave the version at zero.
    pub fn set_config(&mut self, config: &str) {
        self.raw_config = config.to_string();
        match parse_service_config(config) {
            Some((version, services)) => {
                self.protocol_version = version;
                self.services = services;
            }
            None => {
                self.protocol_version = 0;
                self.services = Vec::new();
            }
        }
    }

    pub fn update_ping(&mut self) {
        self.last_ping = unix_time();
    }

    /// Decides whether this registration is currently valid against chain
    /// state. `lookup_output` resolves an outpoint to its unspent funding
    /// transaction; `is_anchor_valid` confirms chain membership of an anchor
    /// and, when asked, its freshness. Pure: no mutation, no I/O of its own.
    pub fn validate<L, B>(
        &self,
        lookup_output: L,
        is_anchor_valid: B,
        check_stale: bool,
    ) -> Result<(), ValidationError>
    where
        L: Fn(&OutPoint) -> Option<Transaction>,
        B: Fn(u32, &Hash256, bool) -> bool,
    {
        // Anchor reported by the node must be on our recognized chain.
        if !is_anchor_valid(self.ping_anchor_height, &self.ping_anchor_hash, check_stale) {
            return Err(ValidationError::StaleOrUnknownAnchor);
        }

        if !is_fully_valid(&self.identity_key) {
            return Err(ValidationError::InvalidIdentity);
        }

        let Some(tier) = Tier::from_code(self.tier) else {
            return Err(ValidationError::UnknownTier(self.tier));
        };

        match tier {
            // Open tier is self-certifying: the registration must be signed
            // by the identity key itself.
            Tier::Open => {
                let Some(signer) = recover_compact(&self.sig_hash(), &self.signature) else {
                    return Err(ValidationError::InvalidIdentity);
                };
                if signer.key_id() != self.key_id() {
                    return Err(ValidationError::InvalidIdentity);
                }
                Ok(())
            }
            // Paid tiers prove control of the collateral instead.
            Tier::Spv => self.validate_collateral(tier, lookup_output),
        }
    }

    pub fn is_valid<L, B>(&self, lookup_output: L, is_anchor_valid: B, check_stale: bool) -> bool
    where
        L: Fn(&OutPoint) -> Option<Transaction>,
        B: Fn(u32, &Hash256, bool) -> bool,
    {
        self.validate(lookup_output, is_anchor_valid, check_stale).is_ok()
    }

    fn validate_collateral<L>(&self, tier: Tier, lookup_output: L) -> Result<(), ValidationError>
    where
        L: Fn(&OutPoint) -> Option<Transaction>,
    {
        if self.payment_address.is_null() {
            return Err(ValidationError::Collateral("missing payment address"));
        }
        if self.collateral.is_empty() {
            return Err(ValidationError::Collateral("no collateral inputs"));
        }
        if self.collateral.len() > SN_MAX_COLLATERAL_COUNT {
            return Err(ValidationError::Collateral("too many collateral inputs"));
        }

        let distinct: HashSet<&OutPoint> = self.collateral.iter().collect();
        if distinct.len() != self.collateral.len() {
            return Err(ValidationError::Collateral("duplicate collateral outpoint"));
        }

        // The collateral signer, distinct in role from the identity key: it
        // must prove control of the spendable funds.
        let Some(signer) = recover_compact(&self.sig_hash(), &self.signature) else {
            return Err(ValidationError::Collateral("unrecoverable signature"));
        };
        let signer_id = signer.key_id();

        let mut total: i64 = 0;
        let mut processed: HashSet<[u8; 20]> = HashSet::new();

        for outpoint in &self.collateral {
            let Some(tx) = lookup_output(outpoint) else {
                return Err(ValidationError::Collateral("missing or spent output"));
            };
            let Some(output) = tx.vout.get(outpoint.index as usize) else {
                return Err(ValidationError::Collateral("bad vout index"));
            };
            // Value accumulates for every outpoint; the script dedup below
            // only skips the repeated destination check.
            total = total.saturating_add(output.value);

            if processed.contains(&script_id(&output.script_pubkey)) {
                continue;
            }
            let Some(destination) = extract_destination(&output.script_pubkey) else {
                return Err(ValidationError::Collateral("unsupported destination script"));
            };
            if destination != signer_id {
                return Err(ValidationError::Collateral("collateral signer mismatch"));
            }
            processed.insert(script_id(&output.script_pubkey));
        }

        if total < tier.min_collateral() {
            return Err(ValidationError::Collateral("insufficient collateral value"));
        }
        Ok(())
    }
}

impl Encodable for ServiceNode {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        encoder.write_var_bytes(&self.identity_key);
        encoder.write_u8(self.tier);
        encoder.write_bytes(&self.payment_address.0);
        encoder.write_varint(self.collateral.len() as u64);
        for outpoint in &self.collateral {
            outpoint.consensus_encode(encoder);
        }
        encoder.write_u32_le(self.anchor_height);
        encoder.write_bytes(&self.anchor_hash);
        encoder.write_var_bytes(&self.signature);
    }
}

impl Decodable for ServiceNode {
    fn consensus_decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let identity_key = decoder.read_var_bytes()?;
        let tier = decoder.read_u8()?;
        let payment_address = KeyId(decoder.read_fixed::<20>()?);
        let count = decoder.read_varint()?;
        let count = usize::try_from(count).map_err(|_| DecodeError::UnexpectedEof)?;
        // Outpoints are 36 bytes each; reject counts the buffer cannot hold.
        if count > decoder.remaining() / 36 {
            return Err(DecodeError::UnexpectedEof);
        }
        let mut collateral = Vec::with_capacity(count);
        for _ in 0..count {
            collateral.push(OutPoint::consensus_decode(decoder)?);
        }
        let anchor_height = decoder.read_u32_le()?;
        let anchor_hash = decoder.read_fixed::<32>()?;
        let signature = decoder.read_var_bytes()?;
        let mut node = Self::new(
            identity_key,
            tier,
            payment_address,
            collateral,
            anchor_height,
            anchor_hash,
        );
        node.signature = signature;
        Ok(node)
    }
}
