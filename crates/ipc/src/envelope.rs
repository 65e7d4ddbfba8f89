//! Request/response envelopes exchanged with the node daemon.
//!
//! Both directions use the same protobuf (proto2) message on the peer side;
//! they are split into two Rust types here so that each direction only exposes
//! the fields it uses. Wire tags:
//!
//! | tag | field           | type            | direction |
//! |-----|-----------------|-----------------|-----------|
//! | 1   | `command`       | required int32  | request   |
//! | 2   | `subcommand`    | optional int32  | request   |
//! | 3   | `requester_pid` | optional int32  | request   |
//! | 4   | `target_pid`    | optional int32  | request   |
//! | 5   | `status`        | required int32  | response  |
//! | 6   | `payload`       | optional bytes  | both      |
//! | 7   | `version`       | optional bytes  | both      |
//!
//! Optional fields are omitted from the wire entirely when `None`; a present
//! zero and an absent field are distinct after decoding.

use prost::Message;

use crate::{MAX_MESSAGE_SIZE, RpcError, RpcResult};

/// Request family selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Command {
    Query = 0,
    QueryCompat = 56,
}

impl From<Command> for i32 {
    fn from(command: Command) -> Self {
        command as Self
    }
}

impl TryFrom<i32> for Command {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Query),
            56 => Ok(Self::QueryCompat),
            other => Err(other),
        }
    }
}

/// Operation selector carried in the request's `subcommand` field.
///
/// The wire value is an opaque `int32`; [`RpcCall::subcommand`](crate::RpcCall::subcommand)
/// accepts either this enum or a raw integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SubCommand {
    /// Sentinel sent with the version handshake.
    Handshake = -1,
    GetPriority = 0,
    SetPriority,
    CheckPid,
    MemInfo,
    MapInfo,
    PidStatInfo,
    PidStatmInfo,
    PidStatusInfo,
    LoadInfo,
    StatInfo,
    GetRusage,
    SchedGetScheduler,
    SchedSetScheduler,
    SchedGetParam,
    GetPriorityMax,
    GetPriorityMin,
    SetAffinity,
    GetAffinity,
    PrLimit,
    AcctInfo,
    CreateProcess,
    ShmInfo,
    GetRegVals,
    NumaInfo,
    DelDummyTask,
    SwapStatusInfo,
    SwapInfo,
    SwapNodeInfo,
    SwapOut,
    SwapIn,
    SwapGetCns,
    VeosctlGetParam,
    VeosctlSetParam,
}

impl From<SubCommand> for i32 {
    fn from(subcommand: SubCommand) -> Self {
        subcommand as Self
    }
}

/// Outbound envelope.
#[derive(Clone, PartialEq, Message)]
pub struct RequestEnvelope {
    #[prost(int32, required, tag = "1")]
    pub command: i32,
    #[prost(int32, optional, tag = "2")]
    pub subcommand: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    pub requester_pid: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub target_pid: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "6")]
    pub payload: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "7")]
    pub version: Option<Vec<u8>>,
}

/// Inbound envelope. `status == 0` is success, otherwise a negated errno.
#[derive(Clone, PartialEq, Message)]
pub struct ResponseEnvelope {
    #[prost(int32, required, tag = "5")]
    pub status: i32,
    #[prost(bytes = "vec", optional, tag = "6")]
    pub payload: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "7")]
    pub version: Option<Vec<u8>>,
}

// prost fills an absent `required` scalar with its default, so decoding goes
// through these mirrors where the required fields are optional and presence
// is checked explicitly.
#[derive(Clone, PartialEq, Message)]
struct RequestWire {
    #[prost(int32, optional, tag = "1")]
    command: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    subcommand: Option<i32>,
    #[prost(int32, optional, tag = "3")]
    requester_pid: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    target_pid: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "6")]
    payload: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "7")]
    version: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, Message)]
struct ResponseWire {
    #[prost(int32, optional, tag = "5")]
    status: Option<i32>,
    #[prost(bytes = "vec", optional, tag = "6")]
    payload: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "7")]
    version: Option<Vec<u8>>,
}

/// Encode an envelope into a buffer of exactly its encoded size.
///
/// The size is computed before anything is written. A size of zero is an
/// encoding failure; a size above [`MAX_MESSAGE_SIZE`] is rejected with
/// [`RpcError::MessageTooLarge`].
///
/// # Errors
/// - [`RpcError::EncodeFailed`] if the computed size is zero or prost fails
/// - [`RpcError::MessageTooLarge`] if the size exceeds the wire capacity
pub fn encode<M: Message>(envelope: &M) -> RpcResult<Vec<u8>> {
    let size = envelope.encoded_len();
    if size == 0 {
        return Err(RpcError::encode_failed("encoded size is zero"));
    }
    if size > MAX_MESSAGE_SIZE {
        return Err(RpcError::message_too_large(size, MAX_MESSAGE_SIZE));
    }

    let mut buf = Vec::with_capacity(size);
    envelope
        .encode(&mut buf)
        .map_err(|e| RpcError::encode_failed(e.to_string()))?;

    if buf.len() != size {
        return Err(RpcError::encode_failed(format!(
            "wrote {} bytes, expected {size}",
            buf.len()
        )));
    }
    Ok(buf)
}

/// Decode a response envelope from exactly the received bytes.
///
/// # Errors
/// Returns [`RpcError::DecodeFailed`] if the bytes are not a well-formed envelope.
pub fn decode_response(bytes: &[u8]) -> RpcResult<ResponseEnvelope> {
    let wire = ResponseWire::decode(bytes)
        .map_err(|e| RpcError::decode_failed(e.to_string(), bytes.len()))?;
    let status = wire
        .status
        .ok_or_else(|| RpcError::decode_failed("missing required field 'status'", bytes.len()))?;
    Ok(ResponseEnvelope {
        status,
        payload: wire.payload,
        version: wire.version,
    })
}

/// Decode a request envelope; the daemon side of the exchange.
///
/// # Errors
/// Returns [`RpcError::DecodeFailed`] if the bytes are not a well-formed envelope.
pub fn decode_request(bytes: &[u8]) -> RpcResult<RequestEnvelope> {
    let wire = RequestWire::decode(bytes)
        .map_err(|e| RpcError::decode_failed(e.to_string(), bytes.len()))?;
    let command = wire
        .command
        .ok_or_else(|| RpcError::decode_failed("missing required field 'command'", bytes.len()))?;
    Ok(RequestEnvelope {
        command,
        subcommand: wire.subcommand,
        requester_pid: wire.requester_pid,
        target_pid: wire.target_pid,
        payload: wire.payload,
        version: wire.version,
    })
}
