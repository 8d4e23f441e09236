//! Periodic liveness pings carrying a fresh anchor and node snapshot.

use secp256k1::SecretKey;

use xchain_consensus::Hash256;
use xchain_primitives::encoding::{Decodable, DecodeError, Decoder, Encodable, Encoder};
use xchain_primitives::{sha256d, OutPoint, Transaction};

use crate::config::parse_service_config;
use crate::keys::{is_fully_valid, recover_compact, sign_compact, KeyId};
use crate::servicenode::{ServiceNode, ValidationError};

/// A liveness assertion for a registered service node. Immutable once
/// constructed; decoding refreshes only the embedded snapshot, and nothing
/// reaches registry state until validation succeeds.
#[derive(Clone, Debug)]
pub struct ServiceNodePing {
    identity_key: Vec<u8>,
    anchor_height: u32,
    anchor_hash: Hash256,
    config: String,
    node: ServiceNode,
    signature: Vec<u8>,
}

impl ServiceNodePing {
    pub fn new(
        identity_key: Vec<u8>,
        anchor_height: u32,
        anchor_hash: Hash256,
        config: String,
        node: ServiceNode,
    ) -> Self {
        Self {
            identity_key,
            anchor_height,
            anchor_hash,
            config,
            node,
            signature: Vec::new(),
        }
    }

    pub fn identity_key(&self) -> &[u8] {
        &self.identity_key
    }

    pub fn key_id(&self) -> KeyId {
        KeyId::from_pubkey_bytes(&self.identity_key)
    }

    pub fn anchor_height(&self) -> u32 {
        self.anchor_height
    }

    pub fn anchor_hash(&self) -> &Hash256 {
        &self.anchor_hash
    }

    pub fn config(&self) -> &str {
        &self.config
    }

    pub fn node(&self) -> &ServiceNode {
        &self.node
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Signing digest over identity, anchor, config, and the embedded
    /// node's serialized state.
    pub fn sig_hash(&self) -> Hash256 {
        let mut encoder = Encoder::new();
        encoder.write_var_bytes(&self.identity_key);
        encoder.write_u32_le(self.anchor_height);
        encoder.write_bytes(&self.anchor_hash);
        encoder.write_var_str(&self.config);
        self.node.consensus_encode(&mut encoder);
        sha256d(&encoder.into_inner())
    }

    pub fn record_hash(&self) -> Hash256 {
        let mut encoder = Encoder::new();
        self.consensus_encode(&mut encoder);
        sha256d(&encoder.into_inner())
    }

    /// Signs the ping with the node's identity key.
    pub fn sign(&mut self, secret: &SecretKey, compressed: bool) -> bool {
        match sign_compact(secret, &self.sig_hash(), compressed) {
            Some(sig) => {
                self.signature = sig.to_vec();
                true
            }
            None => false,
        }
    }

    /// Decides whether the ping is currently valid. Staleness is always
    /// enforced on the ping's own anchor; the embedded registration is then
    /// checked with the stale gate off, since a live ping vouches for it.
    pub fn validate<L, B>(&self, lookup_output: L, is_anchor_valid: B) -> Result<(), ValidationError>
    where
        L: Fn(&OutPoint) -> Option<Transaction>,
        B: Fn(u32, &Hash256, bool) -> bool,
    {
        if !is_anchor_valid(self.anchor_height, &self.anchor_hash, true) {
            return Err(ValidationError::StaleOrUnknownAnchor);
        }

        // Ping key must match the embedded node's identity.
        if !is_fully_valid(&self.identity_key) || self.identity_key != self.node.identity_key() {
            return Err(ValidationError::InvalidIdentity);
        }

        if parse_service_config(&self.config).is_none() {
            return Err(ValidationError::MalformedConfig);
        }

        let Some(signer) = recover_compact(&self.sig_hash(), &self.signature) else {
            return Err(ValidationError::InvalidIdentity);
        };
        if signer.key_id() != self.key_id() {
            return Err(ValidationError::InvalidIdentity);
        }

        self.node.validate(lookup_output, is_anchor_valid, false)
    }

    pub fn is_valid<L, B>(&self, lookup_output: L, is_anchor_valid: B) -> bool
    where
        L: Fn(&OutPoint) -> Option<Transaction>,
        B: Fn(u32, &Hash256, bool) -> bool,
    {
        self.validate(lookup_output, is_anchor_valid).is_ok()
    }
}

impl Encodable for ServiceNodePing {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        encoder.write_var_bytes(&self.identity_key);
        encoder.write_u32_le(self.anchor_height);
        encoder.write_bytes(&self.anchor_hash);
        encoder.write_var_str(&self.config);
        self.node.consensus_encode(encoder);
        encoder.write_var_bytes(&self.signature);
    }
}

impl Decodable for ServiceNodePing {
    fn consensus_decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let identity_key = decoder.read_var_bytes()?;
        let anchor_height = decoder.read_u32_le()?;
        let anchor_hash = decoder.read_fixed::<32>()?;
        let config = decoder.read_var_str()?;
        let mut node = ServiceNode::consensus_decode(decoder)?;
        let signature = decoder.read_var_bytes()?;
        // The decoded snapshot carries the ping's view of the node; the
        // candidate is provisional until validation passes.
        node.set_ping_anchor(anchor_height, anchor_hash);
        node.set_config(&config);
        node.update_ping();
        Ok(Self {
            identity_key,
            anchor_height,
            anchor_hash,
            config,
            node,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceNodePing;
    use crate::keys::{pubkey_bytes, KeyId};
    use crate::servicenode::{ServiceNode, Tier};
    use secp256k1::SecretKey;
    use xchain_primitives::encoding::{Decodable, Decoder, Encodable, Encoder};

    fn open_node(secret: &SecretKey) -> ServiceNode {
        let identity = pubkey_bytes(secret, true);
        let mut node = ServiceNode::new(
            identity,
            Tier::Open.code(),
            KeyId::null(),
            Vec::new(),
            5,
            [0x05; 32],
        );
        assert!(node.sign(secret, true));
        node
    }

    #[test]
    fn decode_refreshes_embedded_snapshot() {
        let secret = SecretKey::from_slice(&[0x21; 32]).expect("secret");
        let node = open_node(&secret);
        let mut ping = ServiceNodePing::new(
            node.identity_key().to_vec(),
            9,
            [0x09; 32],
            "50,BLOCK,BTC".to_string(),
            node,
        );
        assert!(ping.sign(&secret, true));

        let mut encoder = Encoder::new();
        ping.consensus_encode(&mut encoder);
        let bytes = encoder.into_inner();

        let mut decoder = Decoder::new(&bytes);
        let decoded = ServiceNodePing::consensus_decode(&mut decoder).expect("decode ping");
        assert!(decoder.is_empty());
        assert_eq!(decoded.anchor_height(), 9);
        assert_eq!(decoded.node().ping_anchor_height(), 9);
        assert_eq!(decoded.node().ping_anchor_hash(), &[0x09; 32]);
        assert_eq!(decoded.node().raw_config(), "50,BLOCK,BTC");
        assert_eq!(decoded.node().protocol_version(), 50);
        assert!(decoded.node().last_ping() > 0);
        // the registration anchor itself is untouched
        assert_eq!(decoded.node().anchor_height(), 5);
    }

    #[test]
    fn signature_covers_config_and_embedded_node_state() {
        let secret = SecretKey::from_slice(&[0x22; 32]).expect("secret");
        let node = open_node(&secret);
        let mut ping = ServiceNodePing::new(
            node.identity_key().to_vec(),
            9,
            [0x09; 32],
            "50,BLOCK".to_string(),
            node.clone(),
        );
        assert!(ping.sign(&secret, true));
        let original = ping.sig_hash();

        ping.config = "50,LTC".to_string();
        let config_changed = ping.sig_hash();
        assert_ne!(config_changed, original);

        // A divergent embedded snapshot changes what is signed too.
        let mut moved = ServiceNode::new(
            node.identity_key().to_vec(),
            Tier::Open.code(),
            KeyId::null(),
            Vec::new(),
            6,
            [0x06; 32],
        );
        assert!(moved.sign(&secret, true));
        ping.node = moved;
        assert_ne!(ping.sig_hash(), config_changed);
    }
}
