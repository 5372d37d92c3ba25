//! DA-sequencer CLI Flags

use alloy_primitives::Address;
use clap::Parser;
use kona_nodekit::DaSequencerConfig;
use url::Url;

/// DA-sequencer CLI arguments, populating a [`DaSequencerConfig`].
#[derive(Parser, Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeKitArgs {
    /// The DA sequencer's JSON-RPC endpoint. If unset, the node runs in legacy (non-DA-sequenced)
    /// mode regardless of what the L2 system config reports.
    #[arg(long = "nodekit.da-endpoint", env = "KONA_NODE_NODEKIT_DA_ENDPOINT")]
    pub da_endpoint: Option<Url>,
    /// The rollup's DA-sequencer namespace.
    #[arg(long = "nodekit.namespace", default_value = "0", env = "KONA_NODE_NODEKIT_NAMESPACE")]
    pub namespace: u64,
    /// The address whose claimed commitments are checked against L1.
    #[arg(long = "nodekit.sequencer-address", env = "KONA_NODE_NODEKIT_SEQUENCER_ADDRESS")]
    pub sequencer_address: Option<Address>,
    /// Rejects header-window anomalies instead of accepting them under the lenient policy.
    #[arg(long = "nodekit.strict", default_value = "false", env = "KONA_NODE_NODEKIT_STRICT")]
    pub strict_mode: bool,
}

impl NodeKitArgs {
    /// Builds a [`DaSequencerConfig`] from these flags, if a DA endpoint was supplied.
    pub fn config(&self) -> Option<DaSequencerConfig> {
        let da_endpoint = self.da_endpoint.clone()?;
        Some(DaSequencerConfig {
            da_endpoint,
            rollup_namespace: self.namespace,
            sequencer_address: self.sequencer_address.unwrap_or(Address::ZERO),
            strict_mode: self.strict_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser, Debug, Clone)]
    #[command(about = "Mock command")]
    struct MockCommand {
        #[clap(flatten)]
        pub nodekit: NodeKitArgs,
    }

    #[test]
    fn no_endpoint_means_no_config() {
        let args = MockCommand::parse_from(["test"]);
        assert!(args.nodekit.config().is_none());
    }

    #[test]
    fn endpoint_present_builds_config() {
        let args = MockCommand::parse_from([
            "test",
            "--nodekit.da-endpoint",
            "http://localhost:9999",
            "--nodekit.namespace",
            "7",
            "--nodekit.strict",
        ]);
        let cfg = args.nodekit.config().unwrap();
        assert_eq!(cfg.rollup_namespace, 7);
        assert!(cfg.strict_mode);
    }
}
