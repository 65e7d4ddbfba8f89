//! NodeClient against a mock node daemon.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use common::{MockDaemon, failed, ok};
use nix::errno::Errno;
use veinfo_core::{
    Affinity, ClientConfig, CpuSet, Error, LoadAvg, MemInfo, NodeClient, NodeId, PrLimit, RLimit,
    RpcError, SubCommand, WireRecord,
};
use veinfo_ipc::ResponseEnvelope;

fn own_pid() -> i32 {
    i32::try_from(std::process::id()).unwrap()
}

#[test]
fn test_mem_info_converts_to_kib() {
    let image = MemInfo {
        total: 48 * 1024 * 1024 * 1024,
        used: 1024 * 1024,
        free: 2048,
        shared: 0,
        hugepage_used: 4096,
    }
    .to_payload()
    .unwrap();
    let daemon = MockDaemon::reply(ok(Some(image)));

    let info = daemon.client().mem_info().unwrap();

    assert_eq!(info.total, 48 * 1024 * 1024);
    assert_eq!(info.used, 1024);
    assert_eq!(info.free, 2);
    assert_eq!(info.hugepage_used, 4);

    let request = daemon.received();
    assert_eq!(request.command, 56);
    assert_eq!(request.subcommand, Some(i32::from(SubCommand::MemInfo)));
    assert_eq!(request.requester_pid, Some(own_pid()));
    assert_eq!(request.target_pid, None);
    assert_eq!(request.payload, None);
}

#[test]
fn test_load_avg() {
    let image = LoadAvg {
        av_1: 0.25,
        av_5: 0.5,
        av_15: 1.0,
        runnable: 2,
        total_proc: 17,
    }
    .to_payload()
    .unwrap();
    let daemon = MockDaemon::reply(ok(Some(image)));

    let load = daemon.client().load_avg().unwrap();

    assert_eq!(load.runnable, 2);
    assert_eq!(load.total_proc, 17);
    assert_eq!(
        daemon.received().subcommand,
        Some(i32::from(SubCommand::LoadInfo))
    );
}

#[test]
fn test_short_payload_rejected() {
    let daemon = MockDaemon::reply(ok(Some(vec![0u8; 12])));

    let err = daemon.client().mem_info().unwrap_err();

    assert!(matches!(
        err,
        Error::PayloadLength {
            expected: 40,
            actual: 12,
            ..
        }
    ));
    assert_eq!(err.errno(), Errno::EPROTO);
}

#[test]
fn test_check_pid_alive() {
    let daemon = MockDaemon::reply(ok(None));

    assert!(daemon.client().check_pid(4321).unwrap());

    let request = daemon.received();
    assert_eq!(request.subcommand, Some(i32::from(SubCommand::CheckPid)));
    assert_eq!(request.target_pid, Some(4321));
}

#[test]
fn test_check_pid_no_such_process() {
    let daemon = MockDaemon::reply(failed(-(Errno::ESRCH as i32)));
    assert!(!daemon.client().check_pid(4321).unwrap());
}

#[test]
fn test_check_pid_other_failure_is_error() {
    let daemon = MockDaemon::reply(failed(-(Errno::EACCES as i32)));

    let err = daemon.client().check_pid(4321).unwrap_err();

    assert!(matches!(err, Error::Rpc(RpcError::Remote { status: -13 })));
    assert_eq!(err.errno(), Errno::EACCES);
}

#[test]
fn test_set_affinity_sends_mask() {
    let daemon = MockDaemon::reply(ok(None));
    let mask = CpuSet::from_cpus([0, 2, 7]).unwrap();

    daemon.client().set_affinity(99, &mask).unwrap();

    let request = daemon.received();
    assert_eq!(request.subcommand, Some(i32::from(SubCommand::SetAffinity)));
    assert_eq!(request.target_pid, Some(99));
    let sent = Affinity::from_payload(request.payload.as_deref().unwrap()).unwrap();
    assert_eq!(sent.cpusetsize, Affinity::MASK_BYTES);
    assert_eq!(sent.mask, mask);
}

#[test]
fn test_set_affinity_rejects_empty_mask_without_io() {
    let client = NodeClient::new(ClientConfig::with_socket_dir("/nonexistent"), NodeId(0));

    let err = client.set_affinity(1, &CpuSet::new()).unwrap_err();

    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert_eq!(err.errno(), Errno::EINVAL);
}

#[test]
fn test_get_affinity() {
    let mask = CpuSet::from_cpus([1, 3]).unwrap();
    let daemon = MockDaemon::reply(ok(Some(Affinity::new(mask).to_payload().unwrap())));

    assert_eq!(daemon.client().get_affinity(5).unwrap(), mask);

    let request = daemon.received();
    assert_eq!(request.subcommand, Some(i32::from(SubCommand::GetAffinity)));
    assert_eq!(request.payload.map(|p| p.len()), Some(Affinity::SIZE));
}

#[test]
fn test_set_rlimit_sends_update() {
    let daemon = MockDaemon::reply(ok(None));
    let limit = RLimit {
        soft: 2048,
        hard: 4096,
    };

    daemon.client().set_rlimit(10, 7, limit).unwrap();

    let request = daemon.received();
    assert_eq!(request.subcommand, Some(i32::from(SubCommand::PrLimit)));
    assert_eq!(request.target_pid, Some(10));
    let sent = PrLimit::from_payload(request.payload.as_deref().unwrap()).unwrap();
    assert_eq!(sent, PrLimit::update(7, limit));
    assert!(sent.is_new_limit);
}

#[test]
fn test_set_rlimit_ignores_reply_payload() {
    let mut reply = PrLimit::query(7);
    reply.old_limit = RLimit {
        soft: 1024,
        hard: 4096,
    };
    let daemon = MockDaemon::reply(ok(Some(reply.to_payload().unwrap())));

    let result = daemon.client().set_rlimit(10, 7, RLimit { soft: 1, hard: 2 });

    assert!(result.is_ok());
    daemon.received();
}

#[test]
fn test_set_rlimit_remote_failure() {
    let daemon = MockDaemon::reply(failed(-1));
    let result = daemon.client().set_rlimit(10, 7, RLimit { soft: 1, hard: 2 });
    assert!(result.is_err());
    daemon.received();
}

#[test]
fn test_set_rlimit_rejects_soft_above_hard() {
    let client = NodeClient::new(ClientConfig::with_socket_dir("/nonexistent"), NodeId(0));
    let result = client.set_rlimit(10, 7, RLimit { soft: 2, hard: 1 });
    assert!(matches!(result, Err(Error::InvalidArgument { .. })));
}

#[test]
fn test_delete_dummy_task() {
    let daemon = MockDaemon::reply(ok(None));

    daemon.client().delete_dummy_task(77).unwrap();

    let request = daemon.received();
    assert_eq!(request.subcommand, Some(i32::from(SubCommand::DelDummyTask)));
    assert_eq!(request.target_pid, Some(77));
}

#[test]
fn test_raw_passes_fields_through() {
    let daemon = MockDaemon::reply(ok(Some(vec![1, 2, 3, 4, 5])));

    let payload = daemon
        .client()
        .raw(30, Some(12), Some(vec![9, 9]), Some(3))
        .unwrap();

    assert_eq!(payload, Some(vec![1, 2, 3]));
    let request = daemon.received();
    assert_eq!(request.subcommand, Some(30));
    assert_eq!(request.target_pid, Some(12));
    assert_eq!(request.payload, Some(vec![9, 9]));
}

#[test]
fn test_verify_version_accepts_newer_daemon() {
    let daemon = MockDaemon::reply(ResponseEnvelope {
        status: 0,
        payload: None,
        version: Some(b"3.4.0".to_vec()),
    });
    let config = ClientConfig::with_socket_dir(daemon.dir.path()).library_version("3.2.1");

    let version = NodeClient::new(config, NodeId(0)).verify_version().unwrap();

    assert_eq!(version, "3.4.0");
    let request = daemon.received();
    assert_eq!(request.command, 56);
    assert_eq!(request.subcommand, Some(-1));
    assert_eq!(request.version, Some(b"3.2.1".to_vec()));
}

#[test]
fn test_verify_version_rejects_older_daemon() {
    let daemon = MockDaemon::reply(ResponseEnvelope {
        status: 0,
        payload: None,
        version: Some(b"2.5.9".to_vec()),
    });
    let config = ClientConfig::with_socket_dir(daemon.dir.path()).library_version("2.6.0");

    let err = NodeClient::new(config, NodeId(0))
        .verify_version()
        .unwrap_err();

    assert!(matches!(
        err,
        Error::IncompatibleVersion { daemon: Some(ref v), .. } if v == "2.5.9"
    ));
    assert_eq!(err.errno(), Errno::ENOTSUP);
}

#[test]
fn test_verify_version_requires_version() {
    let daemon = MockDaemon::reply(ok(None));

    let err = daemon.client().verify_version().unwrap_err();

    assert!(matches!(err, Error::IncompatibleVersion { daemon: None, .. }));
}

#[test]
fn test_verify_version_rejects_any_failed_status() {
    let daemon = MockDaemon::reply(ResponseEnvelope {
        status: -(Errno::EPERM as i32),
        payload: None,
        version: Some(b"9.9.9".to_vec()),
    });

    let err = daemon.client().verify_version().unwrap_err();

    assert!(matches!(err, Error::Rpc(RpcError::Remote { status: -1 })));
    assert_eq!(err.errno(), Errno::EPERM);
}

#[test]
fn test_offline_node() {
    let dir = tempfile::tempdir().unwrap();
    let client = NodeClient::new(ClientConfig::with_socket_dir(dir.path()), NodeId(3));

    let err = client.mem_info().unwrap_err();

    assert!(err.is_node_offline());
    assert!(!err.is_fatal());
    assert_eq!(err.errno(), Errno::ENOENT);
    assert!(client.check_status().is_err());
}

#[test]
fn test_hangup_propagates_under_default_policy() {
    let daemon = MockDaemon::hangup();

    let err = daemon.client().load_avg().unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(err.errno(), Errno::ECONNRESET);
}
