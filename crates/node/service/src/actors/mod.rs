//! [NodeActor] services for the node.
//!
//! [NodeActor]: super::NodeActor

mod traits;
pub use traits::{CancellableContext, NodeActor};

mod engine;
pub use engine::{
    EngineActor, EngineBuilder, EngineContext, EngineError, EngineInboundData, L2Finalizer,
};

mod rpc;
pub use rpc::{RpcActor, RpcActorError, RpcContext};

mod derivation;
pub use derivation::{
    DerivationActor, DerivationBuilder, DerivationContext, DerivationError,
    DerivationInboundChannels, DerivationState, InboundDerivationMessage, PipelineBuilder,
};

mod l1_watcher_rpc;
pub use l1_watcher_rpc::{
    L1WatcherRpc, L1WatcherRpcContext, L1WatcherRpcError, L1WatcherRpcInboundChannels,
    L1WatcherRpcState,
};

mod network;
pub use network::{
    NetworkActor, NetworkActorError, NetworkBuilder, NetworkBuilderError, NetworkConfig,
    NetworkContext, NetworkDriver, NetworkDriverError, NetworkHandler, NetworkInboundData,
};

mod sequencer;
pub use sequencer::{
    AttributesBuilderConfig, ConductorClient, ConductorError, DelayedL1OriginSelectorProvider,
    L1OriginSelector, L1OriginSelectorError, L1OriginSelectorProvider, SequencerActor,
    SequencerActorError, SequencerBuilder, SequencerConfig, SequencerContext, SequencerInboundData,
};
