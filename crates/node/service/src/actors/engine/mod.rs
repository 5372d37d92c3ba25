//! The [`EngineActor`] and its components.

mod actor;
pub use actor::{EngineActor, EngineBuilder, EngineContext, EngineInboundData};

mod error;
pub use error::EngineError;

mod finalizer;
pub use finalizer::L2Finalizer;
