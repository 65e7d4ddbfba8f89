//! Client error type.
//!
//! All errors are explicit and typed; nothing here terminates the process.
//! [`Error::errno`] gives the POSIX-style number callers conventionally expose.

use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;
use veinfo_ipc::{RpcError, TransportError};

/// Error type for node daemon client operations.
#[derive(Debug, Error)]
pub enum Error {
    // Exchange errors
    #[error(transparent)]
    Rpc(#[from] RpcError),

    // Argument errors
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // Payload errors
    #[error("{record} payload has {actual} bytes, expected {expected}")]
    PayloadLength {
        record: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("failed to {action} {record} payload: {reason}")]
    PayloadCodec {
        record: &'static str,
        action: &'static str,
        reason: String,
    },

    // Node errors
    #[error("no online VE node")]
    NoOnlineNode,

    #[error("node daemon (v{}) is not compatible with library (v{library})", .daemon.as_deref().unwrap_or("unknown"))]
    IncompatibleVersion {
        daemon: Option<String>,
        library: String,
    },

    // Configuration errors
    #[error("failed to read config '{path}': {reason}")]
    ConfigReadFailed { path: PathBuf, reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create an invalid argument error.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a payload length error.
    pub const fn payload_length(record: &'static str, expected: usize, actual: usize) -> Self {
        Self::PayloadLength {
            record,
            expected,
            actual,
        }
    }

    /// Create a payload codec error.
    pub fn payload_codec(
        record: &'static str,
        action: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::PayloadCodec {
            record,
            action,
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether the underlying channel was severed mid-call.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Rpc(err) if err.is_fatal())
    }

    /// Whether the node daemon was not listening.
    pub const fn is_node_offline(&self) -> bool {
        matches!(self, Self::Rpc(err) if err.is_node_offline())
    }

    /// POSIX-style error number for this failure.
    pub fn errno(&self) -> Errno {
        match self {
            Self::Rpc(RpcError::Remote { status }) => Errno::from_raw(status.saturating_neg()),
            Self::Rpc(RpcError::Transport(TransportError::PathTooLong { .. })) => {
                Errno::ENAMETOOLONG
            }
            Self::Rpc(RpcError::Transport(
                TransportError::SocketCreateFailed { errno }
                | TransportError::ConnectFailed { errno, .. },
            )) => *errno,
            Self::Rpc(RpcError::Transport(TransportError::Fatal { errno, .. })) => {
                errno.unwrap_or(Errno::ECONNRESET)
            }
            Self::Rpc(RpcError::EncodeFailed { .. } | RpcError::MessageTooLarge { .. }) => {
                Errno::EMSGSIZE
            }
            Self::Rpc(RpcError::DecodeFailed { .. } | RpcError::MissingPayload)
            | Self::PayloadLength { .. }
            | Self::PayloadCodec { .. } => Errno::EPROTO,
            Self::InvalidArgument { .. } | Self::InvalidConfig { .. } => Errno::EINVAL,
            Self::NoOnlineNode => Errno::ENOENT,
            Self::IncompatibleVersion { .. } => Errno::ENOTSUP,
            Self::ConfigReadFailed { .. } => Errno::EIO,
        }
    }
}
