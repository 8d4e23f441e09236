//! Base58Check, P2PKH addresses, and WIF secret keys.

use std::fmt;

use crate::hash::sha256d;

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Version byte for pay-to-pubkey-hash addresses.
pub const ADDRESS_VERSION: u8 = 0x1a;
/// Version byte for WIF-encoded secret keys.
pub const WIF_VERSION: u8 = 0x9a;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Base58Error {
    InvalidCharacter,
    InvalidChecksum,
    InvalidLength,
    InvalidVersion,
}

impl fmt::Display for Base58Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Base58Error::InvalidCharacter => write!(f, "invalid base58 character"),
            Base58Error::InvalidChecksum => write!(f, "base58 checksum mismatch"),
            Base58Error::InvalidLength => write!(f, "unexpected payload length"),
            Base58Error::InvalidVersion => write!(f, "unexpected version byte"),
        }
    }
}

impl std::error::Error for Base58Error {}

pub fn base58_encode(payload: &[u8]) -> String {
    let mut digits: Vec<u8> = Vec::with_capacity(payload.len() * 138 / 100 + 1);
    for &byte in payload {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }
    let leading_zeros = payload.iter().take_while(|&&byte| byte == 0).count();
    let mut out = String::with_capacity(leading_zeros + digits.len());
    for _ in 0..leading_zeros {
        out.push('1');
    }
    for &digit in digits.iter().rev() {
        out.push(ALPHABET[digit as usize] as char);
    }
    out
}

pub fn base58_decode(input: &str) -> Result<Vec<u8>, Base58Error> {
    let mut bytes: Vec<u8> = Vec::with_capacity(input.len());
    for character in input.chars() {
        let value = ALPHABET
            .iter()
            .position(|&entry| entry as char == character)
            .ok_or(Base58Error::InvalidCharacter)?;
        let mut carry = value as u32;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }
    let leading_ones = input.chars().take_while(|&character| character == '1').count();
    for _ in 0..leading_ones {
        bytes.push(0);
    }
    bytes.reverse();
    Ok(bytes)
}

pub fn base58check_encode(payload: &[u8]) -> String {
    let checksum = sha256d(payload);
    let mut full = Vec::with_capacity(payload.len() + 4);
    full.extend_from_slice(payload);
    full.extend_from_slice(&checksum[..4]);
    base58_encode(&full)
}

pub fn base58check_decode(input: &str) -> Result<Vec<u8>, Base58Error> {
    let full = base58_decode(input)?;
    if full.len() < 5 {
        return Err(Base58Error::InvalidLength);
    }
    let (payload, checksum) = full.split_at(full.len() - 4);
    if sha256d(payload)[..4] != *checksum {
        return Err(Base58Error::InvalidChecksum);
    }
    Ok(payload.to_vec())
}

pub fn key_hash_to_address(key_hash: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(key_hash);
    base58check_encode(&payload)
}

pub fn address_to_key_hash(address: &str) -> Result<[u8; 20], Base58Error> {
    let payload = base58check_decode(address)?;
    if payload.len() != 21 {
        return Err(Base58Error::InvalidLength);
    }
    if payload[0] != ADDRESS_VERSION {
        return Err(Base58Error::InvalidVersion);
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&payload[1..]);
    Ok(out)
}

pub fn secret_key_to_wif(secret: &[u8; 32], compressed: bool) -> String {
    let mut payload = Vec::with_capacity(34);
    payload.push(WIF_VERSION);
    payload.extend_from_slice(secret);
    if compressed {
        payload.push(0x01);
    }
    base58check_encode(&payload)
}

pub fn wif_to_secret_key(wif: &str) -> Result<([u8; 32], bool), Base58Error> {
    let payload = base58check_decode(wif)?;
    if payload.is_empty() || payload[0] != WIF_VERSION {
        return Err(Base58Error::InvalidVersion);
    }
    let (secret_bytes, compressed) = match payload.len() {
        33 => (&payload[1..33], false),
        34 if payload[33] == 0x01 => (&payload[1..33], true),
        _ => return Err(Base58Error::InvalidLength),
    };
    let mut secret = [0u8; 32];
    secret.copy_from_slice(secret_bytes);
    Ok((secret, compressed))
}

#[cfg(test)]
mod tests {
    use super::{
        address_to_key_hash, base58check_decode, base58check_encode, key_hash_to_address,
        secret_key_to_wif, wif_to_secret_key, Base58Error,
    };

    #[test]
    fn check_encoding_roundtrip() {
        let payload = [0x00, 0x01, 0x02, 0xff, 0x00];
        let encoded = base58check_encode(&payload);
        let decoded = base58check_decode(&encoded).expect("decode");
        assert_eq!(decoded, payload);
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let encoded = base58check_encode(&[0x42; 21]);
        let mut corrupted = encoded.into_bytes();
        let last = corrupted.len() - 1;
        corrupted[last] = if corrupted[last] == b'2' { b'3' } else { b'2' };
        let corrupted = String::from_utf8(corrupted).expect("ascii");
        assert_eq!(
            base58check_decode(&corrupted),
            Err(Base58Error::InvalidChecksum)
        );
    }

    #[test]
    fn address_roundtrip() {
        let key_hash = [0x37; 20];
        let address = key_hash_to_address(&key_hash);
        assert_eq!(address_to_key_hash(&address).expect("decode"), key_hash);
    }

    #[test]
    fn wif_roundtrip_both_forms() {
        let secret = [0x0b; 32];
        for compressed in [false, true] {
            let wif = secret_key_to_wif(&secret, compressed);
            let (decoded, flag) = wif_to_secret_key(&wif).expect("decode wif");
            assert_eq!(decoded, secret);
            assert_eq!(flag, compressed);
        }
    }

    #[test]
    fn garbage_strings_rejected() {
        assert!(address_to_key_hash("jdfksjkfajsdkfjaksdfjaksdjk").is_err());
        assert!(wif_to_secret_key("fkjdsakfjdsakfjksadjfkasjk").is_err());
    }
}
