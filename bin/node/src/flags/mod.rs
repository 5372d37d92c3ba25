//! CLI Flags

mod globals;
pub use globals::GlobalArgs;

mod p2p;
pub use p2p::P2PArgs;

mod rpc;
pub use rpc::RpcArgs;

mod overrides;
pub use overrides::OverrideArgs;

mod metrics;
pub use metrics::init_unified_metrics;

mod sequencer;
pub use sequencer::SequencerArgs;

mod nodekit;
pub use nodekit::NodeKitArgs;

mod signer;
pub use signer::{SignerArgs, SignerArgsParseError};
