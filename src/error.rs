//! Failure taxonomy for catalog fetches and aggregation.
//!
//! Two layers: [`FetchError`] describes a single transport exchange and is
//! classified into an [`ErrorKind`] that drives the retry decision;
//! [`AggregateError`] is what an aggregation run reports outward, with a
//! stable status-code mapping for the HTTP surface.

use thiserror::Error;

use crate::retry::RetriesExhausted;

/// Boxed error type for sink implementations, mirroring the transport-agnostic
/// seams elsewhere in the crate.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Classification of a failed catalog exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Upstream answered with a 4xx status. Permanent, never retried.
    ClientError,
    /// Upstream answered with a 5xx (or otherwise non-success) status.
    ServerError,
    /// The request went out but no response came back (connect failure,
    /// timeout, connection reset).
    NoResponse,
    /// Anything else: request construction, body decoding, programming error.
    Unexpected,
}

impl ErrorKind {
    /// Transient kinds are worth another attempt; the rest fail fast.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::ServerError | ErrorKind::NoResponse)
    }
}

/// A single failed exchange with an upstream endpoint.
///
/// Sources are boxed trait objects so higher layers stay independent of the
/// transport crate and tests can fabricate instances from plain strings.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{context}: upstream answered status {status}")]
    Status { context: &'static str, status: u16 },

    #[error("{context}: no response from upstream")]
    NoResponse {
        context: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{context}: could not decode upstream body")]
    Decode {
        context: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{context}: request could not be built or sent")]
    Request {
        context: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Status { status, .. } if (400..500).contains(status) => {
                ErrorKind::ClientError
            }
            FetchError::Status { .. } => ErrorKind::ServerError,
            FetchError::NoResponse { .. } => ErrorKind::NoResponse,
            FetchError::Decode { .. } | FetchError::Request { .. } => ErrorKind::Unexpected,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind().is_transient()
    }

    /// The upstream status, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Outcome of a whole aggregation run, as reported to callers.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("upstream rejected the request with status {status}")]
    UpstreamRejected { status: u16 },

    #[error("upstream unavailable after {attempts} attempt(s)")]
    UpstreamUnavailable {
        attempts: u32,
        #[source]
        source: FetchError,
    },

    #[error("upstream answered with a malformed body")]
    MalformedResponse {
        #[source]
        source: FetchError,
    },

    #[error("output sink failed after {written} element(s)")]
    SinkWrite {
        written: usize,
        #[source]
        source: SinkError,
    },

    #[error("unexpected failure during aggregation")]
    Unexpected {
        #[source]
        source: FetchError,
    },
}

impl AggregateError {
    /// HTTP status this fault maps to: 4xx faults relay the upstream status,
    /// transient exhaustion reports 503, everything else 500.
    pub fn status_code(&self) -> u16 {
        match self {
            AggregateError::UpstreamRejected { status } => *status,
            AggregateError::UpstreamUnavailable { .. } => 503,
            AggregateError::MalformedResponse { .. }
            | AggregateError::SinkWrite { .. }
            | AggregateError::Unexpected { .. } => 500,
        }
    }
}

impl From<RetriesExhausted<FetchError>> for AggregateError {
    fn from(exhausted: RetriesExhausted<FetchError>) -> Self {
        let RetriesExhausted { attempts, source } = exhausted;
        match source.kind() {
            ErrorKind::ClientError => AggregateError::UpstreamRejected {
                status: source.status().unwrap_or(400),
            },
            ErrorKind::ServerError | ErrorKind::NoResponse => {
                AggregateError::UpstreamUnavailable { attempts, source }
            }
            ErrorKind::Unexpected => match source {
                FetchError::Decode { .. } => AggregateError::MalformedResponse { source },
                other => AggregateError::Unexpected { source: other },
            },
        }
    }
}
