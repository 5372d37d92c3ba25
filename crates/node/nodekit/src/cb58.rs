//! CB58: base-58 encoding with an appended 4-byte SHA-256-derived checksum.
//!
//! Distinct from Bitcoin's base58check: the checksum is the trailing 4 bytes of a *single*
//! SHA-256 pass over the payload, appended (not prepended) before encoding.

use crate::errors::Cb58Error;
use sha2::{Digest, Sha256};

const CHECKSUM_LEN: usize = 4;

fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = Sha256::digest(data);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&hash[hash.len() - CHECKSUM_LEN..]);
    out
}

/// Encodes `data` as a CB58 string: `base58(data || checksum(data))`.
pub fn encode(data: &[u8]) -> Result<String, Cb58Error> {
    if data.len() > i32::MAX as usize - CHECKSUM_LEN {
        return Err(Cb58Error::InputTooLarge(data.len()));
    }
    let mut buf = Vec::with_capacity(data.len() + CHECKSUM_LEN);
    buf.extend_from_slice(data);
    buf.extend_from_slice(&checksum(data));
    Ok(bs58::encode(buf).into_string())
}

/// Decodes a CB58 string, verifying and stripping its trailing checksum.
pub fn decode(input: &str) -> Result<Vec<u8>, Cb58Error> {
    let raw = bs58::decode(input).into_vec().map_err(|e| Cb58Error::Base58(e.to_string()))?;
    if raw.len() < CHECKSUM_LEN {
        return Err(Cb58Error::MissingChecksum(raw.len()));
    }
    let (payload, given_checksum) = raw.split_at(raw.len() - CHECKSUM_LEN);
    if checksum(payload).as_slice() != given_checksum {
        return Err(Cb58Error::BadChecksum);
    }
    Ok(payload.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let data = [1u8, 2, 3, 4, 5, 250, 251, 252];
        let encoded = encode(&data).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn round_trip_empty() {
        let encoded = encode(&[]).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn bit_flip_fails_checksum() {
        let data = b"the quick brown fox";
        let mut encoded = encode(data).unwrap().into_bytes();
        // Flip the last character, which is guaranteed to live inside the checksum's alphabet
        // range; base58's alphabet is a strict subset of ASCII so we flip case instead to stay
        // in-alphabet while still changing the decoded bytes.
        let last = encoded.len() - 1;
        encoded[last] = if encoded[last] == b'1' { b'2' } else { b'1' };
        let tampered = String::from_utf8(encoded).unwrap();
        // '1' and '2' are both valid base58-alphabet characters, so this flip can only ever
        // invalidate the checksum, never the base58 decode itself.
        assert_eq!(decode(&tampered), Err(Cb58Error::BadChecksum));
    }

    #[test]
    fn too_short_is_missing_checksum() {
        let encoded = bs58::encode([1u8, 2, 3]).into_string();
        assert_eq!(decode(&encoded), Err(Cb58Error::MissingChecksum(3)));
    }
}
