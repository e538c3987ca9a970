use thiserror::Error;

/// Error conditions observable at the [`Endpoint`](crate::Endpoint) boundary.
///
/// Three kinds suffice for the whole crate: a write against a closed
/// destination, a read past the last byte of a closed source, and a
/// configuration that could never be satisfied. Nothing here is retried
/// internally -- a `BrokenPipe` endpoint stays broken, and a finished
/// `EndOfStream` read stays finished.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipeError {
    /// A write was attempted after this side's output was closed, or a
    /// write blocked on a full ingress queue was woken by the peer's
    /// input closing.
    #[error("broken pipe")]
    BrokenPipe,

    /// A read found the egress queue drained and the peer's output closed,
    /// or this side's input was itself closed.
    #[error("end of stream")]
    EndOfStream,

    /// Construction was attempted with a configuration that can never be
    /// satisfied (zero/negative delay magnitudes cannot be represented --
    /// see [`PipeConfig`](crate::PipeConfig) -- or `mtu` larger than either
    /// resolved buffer limit).
    #[error("invalid pipe configuration: {reason}")]
    ConfigInvalid {
        /// Human-readable explanation, safe to surface in test failure output.
        reason: String,
    },
}

impl PipeError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        PipeError::ConfigInvalid {
            reason: reason.into(),
        }
    }

    /// `true` if this is [`PipeError::BrokenPipe`].
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, PipeError::BrokenPipe)
    }

    /// `true` if this is [`PipeError::EndOfStream`].
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, PipeError::EndOfStream)
    }

    /// `true` if this is [`PipeError::ConfigInvalid`].
    pub fn is_config_invalid(&self) -> bool {
        matches!(self, PipeError::ConfigInvalid { .. })
    }
}

/// Convenience alias used throughout the crate's public API.
pub type Result<T> = std::result::Result<T, PipeError>;
