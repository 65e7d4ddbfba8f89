//! veinfo IPC - one-shot request/response transport for the VE node daemon
//!
//! Every call opens a fresh Unix-domain stream socket to the daemon of one
//! node, sends exactly one protobuf envelope, receives exactly one envelope
//! back and closes the socket. There is no pooling, no pipelining and no
//! retry across failures.
//!
//! # Layers
//!
//! ```text
//! RpcCall      build envelope -> encode -> send_all -> recv_once -> decode -> map status
//!   |
//! envelope     RequestEnvelope / ResponseEnvelope <-> bytes (<= 4096)
//!   |
//! transport    Connection (socket + connect), send_all, recv_once
//! ```
//!
//! # Constraints
//!
//! - Maximum wire message size: 4096 bytes in both directions
//! - One `send` on the peer maps to one `recv` here; the receive path never
//!   gathers a message across several reads
//! - Socket paths longer than the platform `sun_path` capacity minus the
//!   terminator are rejected before any socket is created
//! - A severed channel after connect is reported as a fatal error
//!   ([`RpcError::is_fatal`]); the embedding application decides whether to
//!   terminate
//!
//! # Example
//!
//! ```rust,no_run
//! use veinfo_ipc::{Command, RpcCall};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let payload = RpcCall::new(Command::QueryCompat)
//!     .subcommand(3)
//!     .requester_pid(1234)
//!     .expect_payload(40)
//!     .invoke("/var/opt/nec/ve/veos/veos0.sock")?;
//! assert!(payload.is_some());
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

mod envelope;
mod error;
mod rpc;
mod transport;

pub use envelope::{
    Command, RequestEnvelope, ResponseEnvelope, SubCommand, decode_request, decode_response,
    encode,
};
pub use error::{IoOp, RpcError, RpcResult, TransportError, TransportResult};
pub use rpc::{Reply, RpcCall};
pub use transport::{Connection, SocketIo, recv_once, send_all};

/// Maximum size of one encoded envelope on the wire, in either direction.
pub const MAX_MESSAGE_SIZE: usize = 4096;

/// Capacity of `sockaddr_un.sun_path`, including the NUL terminator.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const SUN_PATH_CAPACITY: usize = 108;

/// Capacity of `sockaddr_un.sun_path`, including the NUL terminator.
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const SUN_PATH_CAPACITY: usize = 104;

/// Longest socket path accepted by [`Connection::open`].
pub const MAX_SOCKET_PATH_LEN: usize = SUN_PATH_CAPACITY - 1;
