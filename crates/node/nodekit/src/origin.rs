//! L1-origin selection for DA-derived batches.

use alloy_primitives::B256;
use kona_genesis::RollupConfig;
use kona_protocol::BlockInfo;

/// Picks the L1 origin a sealed batch must be anchored to, given the L2 parent's current L1
/// origin hash and a `candidate` origin (typically found via the chain's ordinary L1-origin
/// selector).
///
/// Mirrors the general OP Stack pipeline constraint also enforced by the legacy sequencing path:
/// the candidate must be either the parent's origin itself or its immediate child, never skipping
/// ahead by more than one L1 block.
pub fn next_l1_origin(
    parent_origin_hash: B256,
    candidate: &BlockInfo,
) -> Result<BlockInfo, OriginSelectionError> {
    let is_same = candidate.hash == parent_origin_hash;
    let is_child = candidate.parent_hash == parent_origin_hash;
    if !is_same && !is_child {
        return Err(OriginSelectionError::SkipAhead { candidate: candidate.number });
    }

    Ok(*candidate)
}

/// Whether a batch must be forced empty to respect the max-sequencer-drift constraint: the DA
/// sequencer has fallen behind L1 far enough that including transactions would build an invalid
/// block.
pub fn batch_must_be_empty(cfg: &RollupConfig, l1_origin: &BlockInfo, window_start: u64) -> bool {
    window_start > l1_origin.timestamp + cfg.max_sequencer_drift(l1_origin.timestamp)
}

/// An error selecting the next L1 origin for a DA batch.
#[derive(Debug, thiserror::Error)]
pub enum OriginSelectionError {
    /// The candidate is neither the parent's origin nor its immediate child.
    #[error("candidate L1 block {candidate} skips ahead of the L2 parent's current L1 origin")]
    SkipAhead {
        /// The candidate L1 block's number.
        candidate: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(number: u64, hash: u8, parent_hash: u8) -> BlockInfo {
        BlockInfo {
            hash: B256::repeat_byte(hash),
            number,
            parent_hash: B256::repeat_byte(parent_hash),
            timestamp: 1000 + number,
        }
    }

    #[test]
    fn accepts_same_origin() {
        let candidate = block(10, 1, 0);
        assert!(next_l1_origin(B256::repeat_byte(1), &candidate).is_ok());
    }

    #[test]
    fn accepts_immediate_child() {
        let candidate = block(11, 2, 1);
        assert!(next_l1_origin(B256::repeat_byte(1), &candidate).is_ok());
    }

    #[test]
    fn rejects_skip_ahead() {
        let candidate = block(12, 3, 2);
        let err = next_l1_origin(B256::repeat_byte(1), &candidate).unwrap_err();
        assert!(matches!(err, OriginSelectionError::SkipAhead { .. }));
    }
}
