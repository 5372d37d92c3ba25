#![doc = include_str!("../README.md")]

pub mod batch;
pub mod cb58;
pub mod client;
pub mod commitment;
pub mod config;
pub mod driver;
pub mod errors;
pub mod metrics;
pub mod origin;
pub mod types;
pub mod verifier;

pub use batch::{BatchJustification, InProgressBatch};
pub use client::{DaClient, RpcDaClient, TransactionsInBlock, WindowMore, WindowStart};
pub use commitment::{Commitment, CommitmentBuilder};
pub use config::DaSequencerConfig;
pub use driver::{DaAttributesBuilder, EngineControl, L1OriginSelectorIface, Mode, SequencerDriver, SystemConfigFetcher};
pub use errors::{Cb58Error, DaClientError, DriverErrorKind, VerifierError};
pub use types::{Header, L1BlockInfo, NmtRoot, Transaction};
pub use verifier::{CommitmentVerifier, L1CommitmentFetcher};
