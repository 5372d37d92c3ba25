//! The verifier-side view: checking a sequencer's claimed commitments against L1.

use crate::{commitment::Commitment, errors::VerifierError};
use alloy_primitives::Address;
use async_trait::async_trait;
use tracing::warn;

/// The narrow L1 fetcher the verifier needs: the abstract "fetch the sequencer's committed
/// commitments from a given height" operation. Generated contract bindings implement this in
/// practice; only the abstract operation is part of the core contract.
#[async_trait]
pub trait L1CommitmentFetcher: std::fmt::Debug + Send + Sync {
    /// Fetches `count` consecutive commitments starting at `first_height`, as recorded on L1 for
    /// `sequencer_address`.
    async fn l1_sequencer_commitments_from_height(
        &self,
        first_height: u64,
        count: u64,
        sequencer_address: Address,
    ) -> Result<Vec<Commitment>, VerifierError>;
}

/// Verifies a sequencer's claimed per-height commitments against the authoritative L1 record.
#[derive(Debug)]
pub struct CommitmentVerifier<F: L1CommitmentFetcher> {
    sequencer_address: Address,
    fetcher: F,
}

impl<F: L1CommitmentFetcher> CommitmentVerifier<F> {
    /// Builds a new verifier for `sequencer_address`, fetching from `fetcher`.
    pub const fn new(sequencer_address: Address, fetcher: F) -> Self {
        Self { sequencer_address, fetcher }
    }

    /// Verifies that `commitments`, starting at `first_height`, match the authoritative L1
    /// record element-wise. Returns `Ok(false)` (not an error) on a content mismatch; only
    /// transport/length failures are propagated as errors.
    pub async fn verify_commitments(
        &self,
        first_height: u64,
        commitments: &[Commitment],
    ) -> Result<bool, VerifierError> {
        let fetched = self
            .fetcher
            .l1_sequencer_commitments_from_height(
                first_height,
                commitments.len() as u64,
                self.sequencer_address,
            )
            .await?;

        if fetched.len() != commitments.len() {
            return Err(VerifierError::LengthMismatch {
                fetched: fetched.len(),
                expected: commitments.len(),
            });
        }

        for (i, (expected, actual)) in commitments.iter().zip(fetched.iter()).enumerate() {
            if !expected.equals(actual) {
                warn!(
                    target: "nodekit_verifier",
                    first_height,
                    index = i,
                    expected = %expected,
                    actual = %actual,
                    "commitment does not match expected"
                );
                return Ok(false);
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeFetcher(Vec<Commitment>);

    #[async_trait]
    impl L1CommitmentFetcher for FakeFetcher {
        async fn l1_sequencer_commitments_from_height(
            &self,
            first_height: u64,
            count: u64,
            _sequencer_address: Address,
        ) -> Result<Vec<Commitment>, VerifierError> {
            let start = first_height as usize;
            let end = (start + count as usize).min(self.0.len());
            Ok(self.0[start..end].to_vec())
        }
    }

    fn comm(byte: u8) -> Commitment {
        Commitment::from_bytes([byte; 32])
    }

    #[tokio::test]
    async fn matching_commitments_verify() {
        let verifier = CommitmentVerifier::new(Address::ZERO, FakeFetcher(vec![comm(1), comm(2)]));
        assert!(verifier.verify_commitments(0, &[comm(1), comm(2)]).await.unwrap());
    }

    #[tokio::test]
    async fn mismatched_commitment_fails_without_erroring() {
        let verifier = CommitmentVerifier::new(Address::ZERO, FakeFetcher(vec![comm(1), comm(9)]));
        assert!(!verifier.verify_commitments(0, &[comm(1), comm(2)]).await.unwrap());
    }

    #[tokio::test]
    async fn length_mismatch_is_an_error() {
        let verifier = CommitmentVerifier::new(Address::ZERO, FakeFetcher(vec![comm(1)]));
        let err = verifier.verify_commitments(0, &[comm(1), comm(2)]).await.unwrap_err();
        assert!(matches!(err, VerifierError::LengthMismatch { .. }));
    }
}
