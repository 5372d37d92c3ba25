//! Configuration plumbed in by the embedding binary/actor builder.

use alloy_primitives::Address;
use url::Url;

/// Configuration for the DA-sequencer driven block production pipeline.
///
/// Follows the `SequencerConfig`/`SequencerBuilder` pattern already used by the node service's
/// sequencer actor: a plain config struct constructed from CLI flags (or any other source) and
/// handed to the actor/driver builder, which derives its runtime state from it.
#[derive(Debug, Clone)]
pub struct DaSequencerConfig {
    /// The DA sequencer's JSON-RPC endpoint.
    pub da_endpoint: Url,
    /// The rollup's DA-sequencer namespace, as the plain `u64` (encoded little-endian hex on the
    /// wire; see [`crate::types::Transaction::encode_namespace`]).
    pub rollup_namespace: u64,
    /// The address whose claimed commitments are checked against L1 by [`crate::verifier`].
    pub sequencer_address: Address,
    /// Rejects header-window anomalies instead of accepting them under the lenient policy (see
    /// `DESIGN.md`'s header-window leniency decision). Off by default to match upstream behavior.
    pub strict_mode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_carries_supplied_fields() {
        let cfg = DaSequencerConfig {
            da_endpoint: Url::parse("http://localhost:9999").unwrap(),
            rollup_namespace: 42,
            sequencer_address: Address::ZERO,
            strict_mode: true,
        };
        assert_eq!(cfg.rollup_namespace, 42);
        assert!(cfg.strict_mode);
    }
}
