//! Wire types exchanged with the DA sequencer.

use crate::commitment::{Commitment, CommitmentBuilder};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// The root of a namespace's per-block transaction tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NmtRoot {
    /// The raw root bytes (32 bytes in practice).
    pub root: Vec<u8>,
}

impl NmtRoot {
    /// Computes this root's commitment under the `"NMTROOT"` domain.
    pub fn commit(&self) -> Commitment {
        CommitmentBuilder::new("NMTROOT").var_size_field("root", &self.root).finalize()
    }
}

/// A DA block header.
///
/// All fields are required: a header missing any of them fails to deserialize rather than
/// silently defaulting, mirroring the upstream contract that treats these as non-optional wire
/// fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Monotonically increasing DA block height.
    pub height: u64,
    /// Timestamp in seconds; used for window bounds.
    pub timestamp: u64,
    /// Timestamp in the sequencer's native unit (typically milliseconds); used for commitments.
    pub timestamp_original: u64,
    /// The L1 block number the DA sequencer had observed at this height.
    pub l1_head: u64,
    /// The root of this block's transaction namespace tree.
    pub transactions_root: NmtRoot,
}

impl Header {
    /// Computes this header's commitment under the `"BLOCK"` domain.
    pub fn commit(&self) -> Commitment {
        CommitmentBuilder::new("BLOCK")
            .uint64_field("height", self.height)
            .uint64_field("timestamp", self.timestamp_original)
            .uint64_field("l1_head", self.l1_head)
            .field("transactions_root", self.transactions_root.commit())
            .finalize()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RawHeader {
    height: Option<u64>,
    timestamp: Option<u64>,
    timestamp_original: Option<u64>,
    l1_head: Option<u64>,
    transactions_root: Option<NmtRoot>,
}

impl Serialize for Header {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawHeader {
            height: Some(self.height),
            timestamp: Some(self.timestamp),
            timestamp_original: Some(self.timestamp_original),
            l1_head: Some(self.l1_head),
            transactions_root: Some(self.transactions_root.clone()),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Header {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawHeader::deserialize(deserializer)?;
        Ok(Self {
            height: raw.height.ok_or_else(|| serde::de::Error::missing_field("height"))?,
            timestamp: raw.timestamp.ok_or_else(|| serde::de::Error::missing_field("timestamp"))?,
            timestamp_original: raw
                .timestamp_original
                .ok_or_else(|| serde::de::Error::missing_field("timestamp_original"))?,
            l1_head: raw.l1_head.ok_or_else(|| serde::de::Error::missing_field("l1_head"))?,
            transactions_root: raw
                .transactions_root
                .ok_or_else(|| serde::de::Error::missing_field("transactions_root"))?,
        })
    }
}

/// A single DA-sequencer transaction record, tagged with the namespace (rollup) it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// The namespace this transaction belongs to, as a lowercase 16-character hex string
    /// encoding an 8-byte little-endian `u64`.
    #[serde(rename = "vm")]
    pub namespace: String,
    /// The opaque rollup transaction payload.
    #[serde(rename = "payload")]
    pub data: Vec<u8>,
}

impl Transaction {
    /// Encodes `namespace` the way the wire format expects: little-endian 8 bytes, lowercase hex.
    pub fn encode_namespace(namespace: u64) -> String {
        hex::encode(namespace.to_le_bytes())
    }
}

/// An L1 block as observed by the DA sequencer, used for the `"L1BLOCK"`-domain commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L1BlockInfo {
    /// The L1 block number.
    pub number: u64,
    /// The L1 block timestamp, as a 256-bit integer (matching the wire's hex-string encoding).
    pub timestamp: U256,
    /// The L1 block hash (32 bytes).
    pub hash: alloy_primitives::B256,
}

impl L1BlockInfo {
    /// Computes this block's commitment under the `"L1BLOCK"` domain.
    pub fn commit(&self) -> Commitment {
        CommitmentBuilder::new("L1BLOCK")
            .uint64_field("number", self.number)
            .uint256_field("timestamp", &self.timestamp)
            .fixed_size_field("hash", self.hash.as_slice())
            .finalize()
    }
}

/// Lowercase hex encoding for [`Transaction::encode_namespace`]. Kept local rather than pulling
/// in a dedicated crate for one line of formatting.
mod hex {
    const ALPHABET: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        let bytes = bytes.as_ref();
        let mut out = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            out.push(ALPHABET[(b >> 4) as usize] as char);
            out.push(ALPHABET[(b & 0x0f) as usize] as char);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header {
            height: 2539,
            timestamp: 1_703_696_824,
            timestamp_original: 1_703_696_824,
            l1_head: 252,
            transactions_root: NmtRoot { root: vec![0u8; 32] },
        }
    }

    #[test]
    fn header_json_round_trip() {
        let header = sample_header();
        let json = serde_json::to_string(&header).unwrap();
        let decoded: Header = serde_json::from_str(&json).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn header_missing_required_field_fails() {
        let json = r#"{"timestamp":1,"timestamp_original":1,"l1_head":1,"transactions_root":{"root":[]}}"#;
        let result: Result<Header, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn namespace_encoding_is_little_endian_hex() {
        assert_eq!(Transaction::encode_namespace(1), "0100000000000000");
        assert_eq!(Transaction::encode_namespace(2), "0200000000000000");
    }
}
