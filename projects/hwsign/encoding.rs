//! Integer field encoding for device sign requests
//!
//! The device protocol carries nonce, gas and value fields as unsigned
//! big-endian byte strings without leading zeros.

use ethereum_types::U256;

/// Drop a single leading zero byte, if present.
///
/// Only the sign-disambiguation byte of a two's-complement style encoding is
/// removed; further zero bytes are left untouched. Empty input is returned as is.
pub fn strip_leading_zero(bytes: &[u8]) -> Vec<u8> {
    match bytes.split_first() {
        Some((&0, rest)) => rest.to_vec(),
        _ => bytes.to_vec(),
    }
}

/// Signed-integer style big-endian encoding of a non-negative value.
///
/// Minimal length, with one extra `0x00` in front when the top bit of the
/// first byte is set. Zero encodes as `[0x00]`.
pub fn to_signed_be_bytes(value: U256) -> Vec<u8> {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);

    let first = buf.iter().position(|b| *b != 0).unwrap_or(buf.len());
    let minimal = &buf[first..];

    match minimal.first() {
        None => vec![0],
        Some(b) if b & 0x80 != 0 => {
            let mut out = Vec::with_capacity(minimal.len() + 1);
            out.push(0);
            out.extend_from_slice(minimal);
            out
        }
        Some(_) => minimal.to_vec(),
    }
}

/// Encode a 256-bit field the way the device expects it: minimal big-endian,
/// zero as an empty buffer.
pub fn u256_to_device_bytes(value: U256) -> Vec<u8> {
    strip_leading_zero(&to_signed_be_bytes(value))
}
