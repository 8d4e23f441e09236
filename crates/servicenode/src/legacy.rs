//! Fixed-layout decoder for the legacy advertisement packet format.

use xchain_primitives::encoding::{DecodeError, Decoder};

/// Packet address (20 bytes) and timestamp (8 bytes) prefix, not
/// interpreted here.
const PREFIX_SIZE: usize = 20 + 8;
const COMPRESSED_PUBKEY_SIZE: usize = 33;
const SIGNATURE_SIZE: usize = 64;

/// Smallest byte count a structurally complete packet can occupy.
pub const LEGACY_PACKET_MIN_SIZE: usize =
    PREFIX_SIZE + 4 * 4 + COMPRESSED_PUBKEY_SIZE + SIGNATURE_SIZE;

/// A legacy service-advertisement packet. Pure structural decoding; the
/// caller interprets `command` and `body`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LegacyPacket {
    pub version: u32,
    pub command: u32,
    pub timestamp: u32,
    pub body_size: u32,
    pub pubkey: [u8; COMPRESSED_PUBKEY_SIZE],
    pub signature: [u8; SIGNATURE_SIZE],
    pub body: Vec<u8>,
}

impl LegacyPacket {
    /// Decodes a packet from raw wire bytes. Short input is reported as an
    /// error, never read out of bounds.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < LEGACY_PACKET_MIN_SIZE {
            return Err(DecodeError::UnexpectedEof);
        }
        let mut decoder = Decoder::new(bytes);
        decoder.read_bytes(PREFIX_SIZE)?;
        let version = decoder.read_u32_le()?;
        let command = decoder.read_u32_le()?;
        let timestamp = decoder.read_u32_le()?;
        let body_size = decoder.read_u32_le()?;
        let pubkey = decoder.read_fixed::<COMPRESSED_PUBKEY_SIZE>()?;
        let signature = decoder.read_fixed::<SIGNATURE_SIZE>()?;
        let body = decoder.read_bytes(decoder.remaining())?;
        Ok(Self {
            version,
            command,
            timestamp,
            body_size,
            pubkey,
            signature,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{LegacyPacket, LEGACY_PACKET_MIN_SIZE};
    use xchain_primitives::encoding::{DecodeError, Encoder};

    fn build_packet(body: &[u8]) -> Vec<u8> {
        let mut encoder = Encoder::new();
        encoder.write_bytes(&[0u8; 20]); // address
        encoder.write_u64_le(1_555_000_000); // timestamp prefix
        encoder.write_u32_le(3); // version
        encoder.write_u32_le(37); // command
        encoder.write_u32_le(1_555_000_123); // packet timestamp
        encoder.write_u32_le(body.len() as u32);
        encoder.write_bytes(&[0x02; 33]);
        encoder.write_bytes(&[0x7f; 64]);
        encoder.write_bytes(body);
        encoder.into_inner()
    }

    #[test]
    fn decodes_fields_at_fixed_offsets() {
        let bytes = build_packet(b"xrouter");
        let packet = LegacyPacket::decode(&bytes).expect("decode packet");
        assert_eq!(packet.version, 3);
        assert_eq!(packet.command, 37);
        assert_eq!(packet.timestamp, 1_555_000_123);
        assert_eq!(packet.body_size, 7);
        assert_eq!(packet.pubkey, [0x02; 33]);
        assert_eq!(packet.signature, [0x7f; 64]);
        assert_eq!(packet.body, b"xrouter");
    }

    #[test]
    fn empty_body_allowed() {
        let bytes = build_packet(b"");
        let packet = LegacyPacket::decode(&bytes).expect("decode packet");
        assert!(packet.body.is_empty());
        assert_eq!(bytes.len(), LEGACY_PACKET_MIN_SIZE);
    }

    #[test]
    fn short_input_rejected_at_every_length() {
        let bytes = build_packet(b"");
        for cut in 0..bytes.len() {
            assert_eq!(
                LegacyPacket::decode(&bytes[..cut]),
                Err(DecodeError::UnexpectedEof),
                "length {cut} must be rejected"
            );
        }
    }
}
