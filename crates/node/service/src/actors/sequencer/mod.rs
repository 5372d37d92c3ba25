//! The `SequencerActor` and its components.

mod config;
pub use config::SequencerConfig;

mod origin_selector;
pub use origin_selector::{
    DelayedL1OriginSelectorProvider, L1OriginSelector, L1OriginSelectorError,
    L1OriginSelectorProvider,
};

mod actor;
pub use actor::{
    AttributesBuilderConfig, SequencerActor, SequencerActorError, SequencerBuilder,
    SequencerContext, SequencerInboundData,
};

mod rpc;

mod conductor;
pub use conductor::{ConductorClient, ConductorError};
