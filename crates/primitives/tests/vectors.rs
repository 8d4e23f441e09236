use xchain_primitives::encoding::{Decodable, Decoder, Encodable, Encoder};
use xchain_primitives::{OutPoint, Transaction, TxOut};

#[test]
fn outpoint_wire_layout() {
    let outpoint = OutPoint::new([0xab; 32], 0x0102_0304);
    let mut encoder = Encoder::new();
    outpoint.consensus_encode(&mut encoder);
    let bytes = encoder.into_inner();

    let mut expected = vec![0xab; 32];
    expected.extend_from_slice(&[0x04, 0x03, 0x02, 0x01]); // index, little-endian
    assert_eq!(bytes, expected);
}

#[test]
fn txout_wire_layout() {
    let output = TxOut {
        value: 1_000,
        script_pubkey: vec![0xac],
    };
    let mut encoder = Encoder::new();
    output.consensus_encode(&mut encoder);
    assert_eq!(
        encoder.into_inner(),
        [0xe8, 0x03, 0, 0, 0, 0, 0, 0, 0x01, 0xac]
    );
}

#[test]
fn varint_markers() {
    let cases: [(u64, &[u8]); 4] = [
        (0xfc, &[0xfc]),
        (0xfd, &[0xfd, 0xfd, 0x00]),
        (0x1_0000, &[0xfe, 0x00, 0x00, 0x01, 0x00]),
        (
            0x1_0000_0000,
            &[0xff, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00],
        ),
    ];
    for (value, expected) in cases {
        let mut encoder = Encoder::new();
        encoder.write_varint(value);
        assert_eq!(encoder.into_inner(), expected, "encoding {value:#x}");
        let mut decoder = Decoder::new(expected);
        assert_eq!(decoder.read_varint().expect("varint"), value);
        assert!(decoder.is_empty());
    }
}

#[test]
fn transaction_decodes_from_raw_bytes() {
    let mut raw = Vec::new();
    raw.extend_from_slice(&1i32.to_le_bytes()); // version
    raw.push(1); // input count
    raw.extend_from_slice(&[0x11; 32]); // prevout txid
    raw.extend_from_slice(&0u32.to_le_bytes()); // prevout index
    raw.push(0); // empty script_sig
    raw.extend_from_slice(&u32::MAX.to_le_bytes()); // sequence
    raw.push(1); // output count
    raw.extend_from_slice(&500_000i64.to_le_bytes()); // value
    raw.push(2); // script length
    raw.extend_from_slice(&[0x51, 0xac]);
    raw.extend_from_slice(&0u32.to_le_bytes()); // lock time

    let mut decoder = Decoder::new(&raw);
    let tx = Transaction::consensus_decode(&mut decoder).expect("decode raw tx");
    assert!(decoder.is_empty());
    assert_eq!(tx.version, 1);
    assert_eq!(tx.vin.len(), 1);
    assert_eq!(tx.vin[0].prevout, OutPoint::new([0x11; 32], 0));
    assert_eq!(tx.vout.len(), 1);
    assert_eq!(tx.vout[0].value, 500_000);
    assert_eq!(tx.vout[0].script_pubkey, [0x51, 0xac]);

    // Re-encoding reproduces the input bytes exactly.
    let mut encoder = Encoder::new();
    tx.consensus_encode(&mut encoder);
    assert_eq!(encoder.into_inner(), raw);
}
