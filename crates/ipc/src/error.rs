//! Transport and RPC errors
//!
//! Three classes matter to callers:
//! - connection establishment failures ([`TransportError::PathTooLong`],
//!   [`TransportError::SocketCreateFailed`], [`TransportError::ConnectFailed`])
//!   are ordinary, recoverable errors; `ConnectFailed` means the node is offline
//! - [`TransportError::Fatal`] means the channel was severed after a successful
//!   connect; it must never be retried
//! - protocol and logical failures ([`RpcError::DecodeFailed`],
//!   [`RpcError::Remote`], ...) are recoverable

use std::fmt;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// Direction of the I/O that failed fatally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Send,
    Recv,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => write!(f, "send"),
            Self::Recv => write!(f, "recv"),
        }
    }
}

/// Socket-level errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Path does not fit in `sun_path`; no socket was created.
    #[error("socket path too long: {len} bytes (max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// `socket(2)` itself failed (local resource problem).
    #[error("failed to create socket: {errno}")]
    SocketCreateFailed { errno: Errno },

    /// Nobody is listening on the path; the node is offline.
    #[error("connection to '{path}' failed: {errno}")]
    ConnectFailed { path: PathBuf, errno: Errno },

    /// The channel broke mid-exchange.
    ///
    /// `errno` is `None` when the peer performed an orderly shutdown (zero-byte
    /// read) or the socket accepted zero bytes on send.
    #[error("fatal {op} failure: {}", fatal_cause(.errno))]
    Fatal { op: IoOp, errno: Option<Errno> },
}

fn fatal_cause(errno: &Option<Errno>) -> String {
    match errno {
        Some(Errno::EPIPE) => "peer closed the connection (broken pipe)".to_string(),
        Some(errno) => errno.to_string(),
        None => "peer performed an orderly shutdown".to_string(),
    }
}

impl TransportError {
    /// Create a PathTooLong error
    pub fn path_too_long(path: impl Into<PathBuf>, len: usize, max: usize) -> Self {
        Self::PathTooLong {
            path: path.into(),
            len,
            max,
        }
    }

    /// Create a ConnectFailed error
    pub fn connect_failed(path: impl Into<PathBuf>, errno: Errno) -> Self {
        Self::ConnectFailed {
            path: path.into(),
            errno,
        }
    }

    /// Create a Fatal error for a failed send
    pub const fn send_failed(errno: Option<Errno>) -> Self {
        Self::Fatal {
            op: IoOp::Send,
            errno,
        }
    }

    /// Create a Fatal error for a failed receive
    pub const fn recv_failed(errno: Option<Errno>) -> Self {
        Self::Fatal {
            op: IoOp::Recv,
            errno,
        }
    }

    /// Whether this error is the unrecoverable severed-channel class.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors of one request/response exchange.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The request did not produce a positive encoded size.
    #[error("failed to encode request: {reason}")]
    EncodeFailed { reason: String },

    /// The encoded request exceeds the wire capacity.
    #[error("message too large: {size} bytes (max {max} bytes)")]
    MessageTooLarge { size: usize, max: usize },

    /// The received bytes are not a well-formed envelope.
    #[error("failed to decode response of {bytes} bytes: {reason}")]
    DecodeFailed { reason: String, bytes: usize },

    /// A payload was expected but the response carries none.
    #[error("response carries no payload")]
    MissingPayload,

    /// The daemon answered with a non-zero status.
    #[error("node daemon returned status {status}")]
    Remote { status: i32 },
}

impl RpcError {
    /// Create an EncodeFailed error
    pub fn encode_failed(reason: impl Into<String>) -> Self {
        Self::EncodeFailed {
            reason: reason.into(),
        }
    }

    /// Create a MessageTooLarge error
    pub const fn message_too_large(size: usize, max: usize) -> Self {
        Self::MessageTooLarge { size, max }
    }

    /// Create a DecodeFailed error
    pub fn decode_failed(reason: impl Into<String>, bytes: usize) -> Self {
        Self::DecodeFailed {
            reason: reason.into(),
            bytes,
        }
    }

    /// Whether the channel was severed after connect.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_fatal())
    }

    /// Whether the daemon was not listening.
    pub const fn is_node_offline(&self) -> bool {
        matches!(self, Self::Transport(TransportError::ConnectFailed { .. }))
    }

    /// Positive error number for a remote failure (`status = -13` yields `13`).
    pub const fn remote_errno(&self) -> Option<i32> {
        match self {
            Self::Remote { status } => Some(status.saturating_neg()),
            _ => None,
        }
    }
}

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, RpcError>;
