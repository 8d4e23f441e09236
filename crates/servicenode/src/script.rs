//! Single-key destination scripts for collateral outputs.

use xchain_primitives::hash160;

use crate::keys::KeyId;

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;

pub fn p2pkh_script(key_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(OP_DUP);
    script.push(OP_HASH160);
    script.push(0x14);
    script.extend_from_slice(key_hash);
    script.push(OP_EQUALVERIFY);
    script.push(OP_CHECKSIG);
    script
}

pub fn p2pk_script(pubkey: &[u8]) -> Vec<u8> {
    let mut script = Vec::with_capacity(pubkey.len() + 2);
    script.push(pubkey.len() as u8);
    script.extend_from_slice(pubkey);
    script.push(OP_CHECKSIG);
    script
}

/// Extracts the single-key destination of a script, or `None` when the
/// script is not a standard pay-to-pubkey or pay-to-pubkey-hash form.
pub fn extract_destination(script_pubkey: &[u8]) -> Option<KeyId> {
    // pay-to-pubkey-hash: DUP HASH160 <20> EQUALVERIFY CHECKSIG
    if script_pubkey.len() == 25
        && script_pubkey[0] == OP_DUP
        && script_pubkey[1] == OP_HASH160
        && script_pubkey[2] == 0x14
        && script_pubkey[23] == OP_EQUALVERIFY
        && script_pubkey[24] == OP_CHECKSIG
    {
        let mut key_hash = [0u8; 20];
        key_hash.copy_from_slice(&script_pubkey[3..23]);
        return Some(KeyId(key_hash));
    }
    // pay-to-pubkey: <33|65 pubkey> CHECKSIG
    if script_pubkey.len() >= 2 {
        let push = script_pubkey[0] as usize;
        if (push == 33 || push == 65)
            && script_pubkey.len() == push + 2
            && script_pubkey[push + 1] == OP_CHECKSIG
        {
            return Some(KeyId::from_pubkey_bytes(&script_pubkey[1..=push]));
        }
    }
    None
}

/// Hash identifying a script, used to dedupe repeated destination checks.
pub fn script_id(script_pubkey: &[u8]) -> [u8; 20] {
    hash160(script_pubkey)
}
