//! Key identities and compact recoverable signatures.

use std::sync::OnceLock;

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

use xchain_primitives::hash160;

pub const COMPACT_SIGNATURE_SIZE: usize = 65;

/// 20-byte hash of a serialized public key; the identity comparison unit.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct KeyId(pub [u8; 20]);

impl KeyId {
    pub fn null() -> Self {
        KeyId([0u8; 20])
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn from_pubkey_bytes(bytes: &[u8]) -> Self {
        KeyId(hash160(bytes))
    }
}

/// A public key recovered from a compact signature, together with the
/// serialization form the signer declared in the signature header.
#[derive(Clone, Copy, Debug)]
pub struct RecoveredKey {
    pub key: PublicKey,
    pub compressed: bool,
}

impl RecoveredKey {
    pub fn serialize(&self) -> Vec<u8> {
        if self.compressed {
            self.key.serialize().to_vec()
        } else {
            self.key.serialize_uncompressed().to_vec()
        }
    }

    pub fn key_id(&self) -> KeyId {
        KeyId(hash160(&self.serialize()))
    }
}

/// Strict curve-point validation of claimed public key bytes.
pub fn is_fully_valid(bytes: &[u8]) -> bool {
    PublicKey::from_slice(bytes).is_ok()
}

pub fn pubkey_bytes(secret: &SecretKey, compressed: bool) -> Vec<u8> {
    let pubkey = PublicKey::from_secret_key(secp(), secret);
    if compressed {
        pubkey.serialize().to_vec()
    } else {
        pubkey.serialize_uncompressed().to_vec()
    }
}

/// Signs a 32-byte digest, producing the 65-byte compact signature layout:
/// header = 27 + recovery id, +4 when the signing key is compressed.
pub fn sign_compact(
    secret: &SecretKey,
    digest: &[u8; 32],
    compressed: bool,
) -> Option<[u8; COMPACT_SIGNATURE_SIZE]> {
    let msg = Message::from_digest_slice(digest).ok()?;
    let sig = secp().sign_ecdsa_recoverable(&msg, secret);
    let (rec_id, bytes) = sig.serialize_compact();
    let mut out = [0u8; COMPACT_SIGNATURE_SIZE];
    let header = 27u8
        .saturating_add(rec_id.to_i32() as u8)
        .saturating_add(if compressed { 4 } else { 0 });
    out[0] = header;
    out[1..].copy_from_slice(&bytes);
    Some(out)
}

/// Recovers the signer from a compact signature over the digest. Returns
/// `None` on a malformed header, out-of-range recovery id, or failed
/// recovery.
pub fn recover_compact(digest: &[u8; 32], signature: &[u8]) -> Option<RecoveredKey> {
    if signature.len() != COMPACT_SIGNATURE_SIZE {
        return None;
    }
    let header = signature[0];
    if !(27..27 + 8).contains(&header) {
        return None;
    }
    let compressed = (header - 27) & 4 != 0;
    let rec_id = RecoveryId::from_i32(i32::from((header - 27) & 3)).ok()?;
    let sig = RecoverableSignature::from_compact(&signature[1..], rec_id).ok()?;
    let msg = Message::from_digest_slice(digest).ok()?;
    let key = secp().recover_ecdsa(&msg, &sig).ok()?;
    Some(RecoveredKey { key, compressed })
}

pub fn secp() -> &'static Secp256k1<secp256k1::All> {
    static SECP: OnceLock<Secp256k1<secp256k1::All>> = OnceLock::new();
    SECP.get_or_init(Secp256k1::new)
}

#[cfg(test)]
mod tests {
    use super::{is_fully_valid, pubkey_bytes, recover_compact, sign_compact, KeyId};
    use secp256k1::SecretKey;
    use xchain_primitives::sha256d;

    #[test]
    fn sign_recover_matches_signer_identity() {
        let secret = SecretKey::from_slice(&[0x2a; 32]).expect("secret key");
        let digest = sha256d(b"registration");
        for compressed in [true, false] {
            let sig = sign_compact(&secret, &digest, compressed).expect("sign");
            let recovered = recover_compact(&digest, &sig).expect("recover");
            assert_eq!(recovered.compressed, compressed);
            assert_eq!(
                recovered.key_id(),
                KeyId::from_pubkey_bytes(&pubkey_bytes(&secret, compressed))
            );
        }
    }

    #[test]
    fn recover_rejects_malformed_signatures() {
        let digest = sha256d(b"registration");
        assert!(recover_compact(&digest, &[]).is_none());
        assert!(recover_compact(&digest, &[0u8; 65]).is_none());
        let mut sig = [0u8; 65];
        sig[0] = 99; // header out of range
        assert!(recover_compact(&digest, &sig).is_none());
    }

    #[test]
    fn pubkey_validity_is_strict() {
        let secret = SecretKey::from_slice(&[0x11; 32]).expect("secret key");
        assert!(is_fully_valid(&pubkey_bytes(&secret, true)));
        assert!(!is_fully_valid(&[]));
        let mut bad_tag = [0u8; 33];
        bad_tag[0] = 0x05; // not a valid serialization tag
        assert!(!is_fully_valid(&bad_tag));
    }
}
