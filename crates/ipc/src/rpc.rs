//! One-shot request/response exchange
//!
//! [`RpcCall`] is the only operation callers need: it builds the request
//! envelope, encodes it, opens a fresh connection, sends, receives one
//! envelope, decodes it, closes the connection and maps the status.

use std::path::Path;

use tracing::{debug, error, trace, warn};

use crate::envelope::{self, Command, RequestEnvelope};
use crate::transport::{self, Connection, SocketIo};
use crate::{MAX_MESSAGE_SIZE, RpcError, RpcResult};

/// Decoded response of one exchange, before status mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: i32,
    pub payload: Option<Vec<u8>>,
    pub version: Option<Vec<u8>>,
}

impl Reply {
    /// Map the status and extract the payload.
    ///
    /// # Postconditions
    /// - `status != 0` returns Err(RpcError::Remote)
    /// - `max_len == None` returns Ok(None) regardless of any payload
    /// - `max_len == Some(n)` returns at most `n` payload bytes, or
    ///   Err(RpcError::MissingPayload) when the response has none
    ///
    /// # Errors
    /// See postconditions.
    pub fn into_payload(self, max_len: Option<usize>) -> RpcResult<Option<Vec<u8>>> {
        if self.status != 0 {
            debug!(status = self.status, "node daemon reported failure");
            return Err(RpcError::Remote {
                status: self.status,
            });
        }

        let Some(max_len) = max_len else {
            return Ok(None);
        };

        let mut payload = self.payload.ok_or_else(|| {
            error!("no data in the received message");
            RpcError::MissingPayload
        })?;
        if payload.len() > max_len {
            warn!(
                len = payload.len(),
                max_len, "response payload longer than expected, truncating"
            );
            payload.truncate(max_len);
        }
        Ok(Some(payload))
    }
}

/// Builder for one request/response exchange.
///
/// Each optional field is sent only if its setter was called.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcCall {
    request: RequestEnvelope,
    max_response_len: Option<usize>,
}

impl RpcCall {
    /// Start a call for `command` with every optional field absent.
    pub fn new(command: Command) -> Self {
        Self {
            request: RequestEnvelope {
                command: command.into(),
                ..RequestEnvelope::default()
            },
            max_response_len: None,
        }
    }

    /// Set the sub-command.
    #[must_use]
    pub fn subcommand(mut self, subcommand: impl Into<i32>) -> Self {
        self.request.subcommand = Some(subcommand.into());
        self
    }

    /// Set the pid of the calling process.
    #[must_use]
    pub const fn requester_pid(mut self, pid: i32) -> Self {
        self.request.requester_pid = Some(pid);
        self
    }

    /// Set the pid of the process the command is about.
    #[must_use]
    pub const fn target_pid(mut self, pid: i32) -> Self {
        self.request.target_pid = Some(pid);
        self
    }

    /// Attach an opaque request payload.
    #[must_use]
    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.request.payload = Some(payload.into());
        self
    }

    /// Attach a version string (handshake only).
    #[must_use]
    pub fn version(mut self, version: impl Into<Vec<u8>>) -> Self {
        self.request.version = Some(version.into());
        self
    }

    /// Require a response payload and keep at most `max_len` bytes of it.
    #[must_use]
    pub const fn expect_payload(mut self, max_len: usize) -> Self {
        self.max_response_len = Some(max_len);
        self
    }

    /// The envelope that will be sent.
    pub const fn request(&self) -> &RequestEnvelope {
        &self.request
    }

    /// Run the exchange and map the status.
    ///
    /// # Postconditions
    /// - Returns Ok(Some(payload)) on status 0 when a payload was expected
    /// - Returns Ok(None) on status 0 otherwise
    /// - Returns Err(RpcError::Remote) on a non-zero status
    /// - Connection errors are returned unconverted as RpcError::Transport
    ///
    /// # Errors
    /// Everything [`RpcCall::exchange`] and [`Reply::into_payload`] report.
    pub fn invoke(&self, socket_path: impl AsRef<Path>) -> RpcResult<Option<Vec<u8>>> {
        self.exchange(socket_path)?
            .into_payload(self.max_response_len)
    }

    /// Run the exchange and return the decoded response without status mapping.
    ///
    /// The request is encoded before the socket is opened, so an oversized
    /// request never touches the network. The connection is closed on every
    /// path out of this function.
    ///
    /// # Errors
    /// - RpcError::EncodeFailed / RpcError::MessageTooLarge from encoding
    /// - RpcError::Transport for connection and fatal I/O failures
    /// - RpcError::DecodeFailed if the reply is malformed
    pub fn exchange(&self, socket_path: impl AsRef<Path>) -> RpcResult<Reply> {
        let socket_path = socket_path.as_ref();
        let encoded = envelope::encode(&self.request)?;
        debug!(
            path = %socket_path.display(),
            command = self.request.command,
            subcommand = ?self.request.subcommand,
            len = encoded.len(),
            "sending request"
        );

        let mut conn = Connection::open(socket_path)?;
        let result = exchange_on(&mut conn, &encoded);
        conn.close();
        result
    }
}

/// Send an encoded request and decode the single reply over `io`.
///
/// # Errors
/// Fatal transport errors, or RpcError::DecodeFailed for a malformed reply.
pub(crate) fn exchange_on<S: SocketIo + ?Sized>(io: &mut S, encoded: &[u8]) -> RpcResult<Reply> {
    transport::send_all(io, encoded)?;
    trace!("sent request, waiting to receive");

    let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
    let read = transport::recv_once(io, &mut buf)?;
    let received = buf
        .get(..read)
        .ok_or_else(|| RpcError::decode_failed("read past receive buffer", read))?;

    let response = envelope::decode_response(received).inspect_err(|e| {
        error!(error = %e, "failed to unpack message");
    })?;
    debug!(
        status = response.status,
        payload_len = response.payload.as_ref().map(Vec::len),
        "received response"
    );

    Ok(Reply {
        status: response.status,
        payload: response.payload,
        version: response.version,
    })
}
