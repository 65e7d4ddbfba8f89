//! Happy path tests for the one-shot RPC call
//!
//! Each test runs a mock node daemon on a temporary socket.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use common::{MockDaemon, reply};
use veinfo_ipc::{Command, RpcCall, SubCommand};

#[test]
fn test_query_returns_payload_unchanged() {
    let daemon = MockDaemon::spawn(reply(0, Some(&b"\x10\x00\x00\x00"[..])));

    let payload = RpcCall::new(Command::Query)
        .subcommand(7)
        .requester_pid(1234)
        .expect_payload(4)
        .invoke(&daemon.path)
        .expect("call should succeed");

    assert_eq!(payload.as_deref(), Some(&b"\x10\x00\x00\x00"[..]));

    let request = daemon.received();
    assert_eq!(request.command, 0);
    assert_eq!(request.subcommand, Some(7));
    assert_eq!(request.requester_pid, Some(1234));
    assert_eq!(request.target_pid, None);
    assert_eq!(request.payload, None);
}

#[test]
fn test_request_payload_and_target_pid_reach_daemon() {
    let daemon = MockDaemon::spawn(reply(0, None));

    let payload = RpcCall::new(Command::QueryCompat)
        .subcommand(SubCommand::SwapOut)
        .requester_pid(1)
        .target_pid(4321)
        .payload(vec![1, 2, 3, 4, 5])
        .invoke(&daemon.path)
        .expect("call should succeed");

    assert_eq!(payload, None);

    let request = daemon.received();
    assert_eq!(request.command, 56);
    assert_eq!(request.subcommand, Some(28));
    assert_eq!(request.target_pid, Some(4321));
    assert_eq!(request.payload, Some(vec![1, 2, 3, 4, 5]));
}

#[test]
fn test_exchange_exposes_raw_status_and_version() {
    let daemon = MockDaemon::spawn(common::Behavior::Reply(veinfo_ipc::ResponseEnvelope {
        status: -22,
        payload: None,
        version: Some(b"3.1.0".to_vec()),
    }));

    let reply = RpcCall::new(Command::QueryCompat)
        .subcommand(SubCommand::Handshake)
        .version("3.0.0")
        .exchange(&daemon.path)
        .expect("exchange should succeed");

    assert_eq!(reply.status, -22);
    assert_eq!(reply.version.as_deref(), Some(&b"3.1.0"[..]));
    assert_eq!(daemon.received().version, Some(b"3.0.0".to_vec()));
}

#[test]
fn test_empty_payload_is_present() {
    let daemon = MockDaemon::spawn(reply(0, Some(&b""[..])));

    let payload = RpcCall::new(Command::QueryCompat)
        .subcommand(SubCommand::SwapNodeInfo)
        .expect_payload(16)
        .invoke(&daemon.path)
        .expect("call should succeed");

    assert_eq!(payload, Some(Vec::new()));
    daemon.received();
}
