//! JSON output structures for `--json` mode.
//!
//! Every command prints one object: a success wrapper around its result or
//! an error object with a machine-readable code.

use serde::Serialize;
use veinfo_core::{Error, TransportError};

/// Standard JSON success response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct JsonSuccess<T> {
    pub success: bool,
    pub node: u32,
    #[serde(flatten)]
    pub data: T,
}

impl<T> JsonSuccess<T> {
    pub const fn new(node: u32, data: T) -> Self {
        Self {
            success: true,
            node,
            data,
        }
    }
}

/// Standard JSON error response
#[derive(Debug, Clone, Serialize)]
pub struct JsonError {
    pub success: bool,
    pub error: ErrorDetail,
}

/// Detailed error information
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (`SCREAMING_SNAKE_CASE`)
    pub code: &'static str,
    /// Human-readable error message
    pub message: String,
    /// POSIX error number
    pub errno: i32,
    /// Process exit code
    pub exit_code: i32,
}

impl JsonError {
    pub fn from_error(error: &Error) -> Self {
        let code = ErrorCode::classify(error);
        Self {
            success: false,
            error: ErrorDetail {
                code: code.as_str(),
                message: error.to_string(),
                errno: error.errno() as i32,
                exit_code: code.exit_code(),
            },
        }
    }
}

/// Error codes for machine-readable errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NodeOffline,
    NoOnlineNode,
    ChannelSevered,
    SocketError,
    RemoteFailure,
    ProtocolError,
    IncompatibleVersion,
    InvalidArgument,
    ConfigError,
}

impl ErrorCode {
    pub const fn classify(error: &Error) -> Self {
        match error {
            Error::Rpc(rpc) if rpc.is_fatal() => Self::ChannelSevered,
            Error::Rpc(veinfo_core::RpcError::Remote { .. }) => Self::RemoteFailure,
            Error::Rpc(rpc) if rpc.is_node_offline() => Self::NodeOffline,
            Error::Rpc(veinfo_core::RpcError::Transport(TransportError::PathTooLong { .. }))
            | Error::InvalidArgument { .. } => Self::InvalidArgument,
            Error::Rpc(veinfo_core::RpcError::Transport(
                TransportError::SocketCreateFailed { .. },
            )) => Self::SocketError,
            Error::Rpc(_) | Error::PayloadLength { .. } | Error::PayloadCodec { .. } => {
                Self::ProtocolError
            }
            Error::NoOnlineNode => Self::NoOnlineNode,
            Error::IncompatibleVersion { .. } => Self::IncompatibleVersion,
            Error::ConfigReadFailed { .. } | Error::InvalidConfig { .. } => Self::ConfigError,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NodeOffline => "NODE_OFFLINE",
            Self::NoOnlineNode => "NO_ONLINE_NODE",
            Self::ChannelSevered => "CHANNEL_SEVERED",
            Self::SocketError => "SOCKET_ERROR",
            Self::RemoteFailure => "REMOTE_FAILURE",
            Self::ProtocolError => "PROTOCOL_ERROR",
            Self::IncompatibleVersion => "INCOMPATIBLE_VERSION",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }

    /// Semantic exit code.
    ///
    /// - 1: Validation errors (user input, configuration)
    /// - 2: Not found errors (node offline, no node)
    /// - 3: System errors (socket creation, severed channel, malformed data,
    ///   version mismatch)
    /// - 4: The node daemon refused the request
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InvalidArgument | Self::ConfigError => 1,
            Self::NodeOffline | Self::NoOnlineNode => 2,
            Self::ChannelSevered
            | Self::SocketError
            | Self::ProtocolError
            | Self::IncompatibleVersion => 3,
            Self::RemoteFailure => 4,
        }
    }
}
