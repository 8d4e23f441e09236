//! Minimal transaction model used by the UTXO-lookup boundary.

use xchain_consensus::Hash256;

use crate::encoding::{Decodable, DecodeError, Decoder, Encodable, Encoder};
use crate::hash::sha256d;
use crate::outpoint::OutPoint;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxIn {
    pub prevout: OutPoint,
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxOut {
    pub value: i64,
    pub script_pubkey: Vec<u8>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    pub version: i32,
    pub vin: Vec<TxIn>,
    pub vout: Vec<TxOut>,
    pub lock_time: u32,
}

impl Transaction {
    pub fn txid(&self) -> Hash256 {
        let mut encoder = Encoder::new();
        self.consensus_encode(&mut encoder);
        sha256d(&encoder.into_inner())
    }
}

impl Encodable for TxIn {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        self.prevout.consensus_encode(encoder);
        encoder.write_var_bytes(&self.script_sig);
        encoder.write_u32_le(self.sequence);
    }
}

impl Decodable for TxIn {
    fn consensus_decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let prevout = OutPoint::consensus_decode(decoder)?;
        let script_sig = decoder.read_var_bytes()?;
        let sequence = decoder.read_u32_le()?;
        Ok(Self {
            prevout,
            script_sig,
            sequence,
        })
    }
}

impl Encodable for TxOut {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        encoder.write_i64_le(self.value);
        encoder.write_var_bytes(&self.script_pubkey);
    }
}

impl Decodable for TxOut {
    fn consensus_decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let value = decoder.read_i64_le()?;
        let script_pubkey = decoder.read_var_bytes()?;
        Ok(Self {
            value,
            script_pubkey,
        })
    }
}

impl Encodable for Transaction {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        encoder.write_i32_le(self.version);
        encoder.write_varint(self.vin.len() as u64);
        for input in &self.vin {
            input.consensus_encode(encoder);
        }
        encoder.write_varint(self.vout.len() as u64);
        for output in &self.vout {
            output.consensus_encode(encoder);
        }
        encoder.write_u32_le(self.lock_time);
    }
}

impl Decodable for Transaction {
    fn consensus_decode(decoder: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let version = decoder.read_i32_le()?;
        let vin = decode_sequence(decoder)?;
        let vout = decode_sequence(decoder)?;
        let lock_time = decoder.read_u32_le()?;
        Ok(Self {
            version,
            vin,
            vout,
            lock_time,
        })
    }
}

fn decode_sequence<T: Decodable>(decoder: &mut Decoder<'_>) -> Result<Vec<T>, DecodeError> {
    let count = decoder.read_varint()?;
    let count = usize::try_from(count).map_err(|_| DecodeError::UnexpectedEof)?;
    // Each entry consumes at least one byte; reject counts the buffer cannot hold.
    if count > decoder.remaining() {
        return Err(DecodeError::UnexpectedEof);
    }
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(T::consensus_decode(decoder)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{Transaction, TxIn, TxOut};
    use crate::encoding::{Decodable, Decoder, Encodable, Encoder};
    use crate::outpoint::OutPoint;

    fn sample_tx() -> Transaction {
        Transaction {
            version: 1,
            vin: vec![TxIn {
                prevout: OutPoint::new([0x22; 32], 1),
                script_sig: vec![0x51],
                sequence: u32::MAX,
            }],
            vout: vec![TxOut {
                value: 50_000,
                script_pubkey: vec![0x76, 0xa9],
            }],
            lock_time: 0,
        }
    }

    #[test]
    fn transaction_roundtrip() {
        let tx = sample_tx();
        let mut encoder = Encoder::new();
        tx.consensus_encode(&mut encoder);
        let bytes = encoder.into_inner();

        let mut decoder = Decoder::new(&bytes);
        let decoded = Transaction::consensus_decode(&mut decoder).expect("decode tx");
        assert!(decoder.is_empty());
        assert_eq!(decoded, tx);
        assert_eq!(decoded.txid(), tx.txid());
    }

    #[test]
    fn oversized_output_count_rejected() {
        let mut encoder = Encoder::new();
        encoder.write_i32_le(1);
        encoder.write_varint(0);
        encoder.write_varint(u32::MAX as u64);
        let bytes = encoder.into_inner();
        let mut decoder = Decoder::new(&bytes);
        assert!(Transaction::consensus_decode(&mut decoder).is_err());
    }
}
