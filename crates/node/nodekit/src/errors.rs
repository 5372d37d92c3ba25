//! Error types for the DA-sequencer driven block production pipeline.

/// Errors produced while encoding or decoding a CB58 identifier.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Cb58Error {
    /// The input could not be base-58 decoded.
    #[error("base58 decoding failed: {0}")]
    Base58(String),
    /// The decoded payload is shorter than the 4-byte checksum it must carry.
    #[error("missing checksum: decoded payload is only {0} bytes")]
    MissingChecksum(usize),
    /// The trailing 4 bytes did not match the checksum of the payload.
    #[error("bad checksum")]
    BadChecksum,
    /// The input is too large to be checksummed.
    #[error("input too large to encode: {0} bytes")]
    InputTooLarge(usize),
}

/// Errors produced by the DA client while fetching headers or transactions.
#[derive(Debug, thiserror::Error)]
pub enum DaClientError {
    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] alloy_transport::RpcError<alloy_transport::TransportErrorKind>),
    /// The response could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// A window response is missing its `prev` header, which is required.
    #[error("window response missing required `prev` header")]
    MissingPrev,
    /// A fetched transaction's namespace did not match the requested namespace.
    #[error("namespace mismatch: expected {expected}, got {actual}")]
    NamespaceMismatch {
        /// The requested namespace, little-endian hex encoded.
        expected: String,
        /// The namespace actually reported on the transaction.
        actual: String,
    },
    /// The identifier embedded in a block could not be CB58-decoded.
    #[error(transparent)]
    Cb58(#[from] Cb58Error),
}

/// The recovery/propagation class assigned to a driver-level error.
///
/// Mirrors the `PipelineErrorKind` split already used by the attributes/derivation stack:
/// each class carries its own backoff and propagation policy (see [`crate::driver`]).
#[derive(Debug, thiserror::Error)]
pub enum DriverErrorKind {
    /// A DA-service contract violation or other unrecoverable condition. Propagated to the
    /// caller; the driver does not retry.
    #[error("critical: {0}")]
    Critical(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A derivation-pipeline invariant was broken (e.g. an inconsistent L1 origin). The driver
    /// schedules a retry after `block_time` and does not attempt to seal.
    #[error("reset: {0}")]
    Reset(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A transient I/O or transport failure. The driver retries in one second without
    /// disturbing any in-flight engine payload.
    #[error("temporary: {0}")]
    Temporary(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A malformed or invalid response from the DA sequencer: namespace mismatch, a missing
    /// required field, or a bad CB58 identifier. Not the driver's fault to retry; propagated to
    /// the caller unchanged.
    #[error("local: {0}")]
    Local(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Any other failure. The driver retries in one second and cancels any in-flight engine
    /// payload.
    #[error("unclassified: {0}")]
    Unclassified(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DriverErrorKind {
    /// Wraps `err` as a [`DriverErrorKind::Critical`].
    pub fn crit<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Critical(Box::new(err))
    }

    /// Wraps `err` as a [`DriverErrorKind::Reset`].
    pub fn reset<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Reset(Box::new(err))
    }

    /// Wraps `err` as a [`DriverErrorKind::Temporary`].
    pub fn temp<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Temporary(Box::new(err))
    }

    /// Wraps `err` as a [`DriverErrorKind::Local`].
    pub fn local<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Local(Box::new(err))
    }

    /// Wraps `err` as a [`DriverErrorKind::Unclassified`].
    pub fn unclassified<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Unclassified(Box::new(err))
    }

    /// Returns `true` if this error must be propagated to the caller rather than recovered.
    pub const fn is_critical(&self) -> bool {
        matches!(self, Self::Critical(_))
    }
}

impl From<DaClientError> for DriverErrorKind {
    /// Routes DA-client errors to their recovery class: malformed or invalid responses
    /// (namespace mismatch, bad CB58, undecodable payload) are not retried, everything else
    /// (transport, missing `prev`) is temporary.
    fn from(err: DaClientError) -> Self {
        match err {
            DaClientError::NamespaceMismatch { .. } | DaClientError::Cb58(_) | DaClientError::Decode(_) => {
                Self::local(err)
            }
            DaClientError::Transport(_) | DaClientError::MissingPrev => Self::temp(err),
        }
    }
}

/// Errors produced by the [`crate::verifier`] view.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    /// The L1 fetcher failed to return commitments.
    #[error("L1 commitment fetch failed: {0}")]
    Fetch(String),
    /// The number of fetched commitments did not match the number requested.
    #[error("fetched commitments length {fetched} does not match expected {expected}")]
    LengthMismatch {
        /// Number of commitments fetched from L1.
        fetched: usize,
        /// Number of commitments expected (the length of the input slice).
        expected: usize,
    },
}
