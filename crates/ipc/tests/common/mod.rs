//! Mock node daemon serving a single connection from a background thread.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

use std::io::{Read, Write};
use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::thread::JoinHandle;

use tempfile::TempDir;
use veinfo_ipc::{MAX_MESSAGE_SIZE, RequestEnvelope, ResponseEnvelope, decode_request, encode};

/// What the mock daemon does after reading the request.
pub enum Behavior {
    /// Reply with this envelope.
    Reply(ResponseEnvelope),
    /// Reply with raw bytes.
    Raw(Vec<u8>),
    /// Close the connection without replying.
    Hangup,
}

pub struct MockDaemon {
    pub dir: TempDir,
    pub path: PathBuf,
    handle: JoinHandle<RequestEnvelope>,
}

impl MockDaemon {
    pub fn spawn(behavior: Behavior) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("veos0.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
            let read = stream.read(&mut buf).unwrap();
            let request = decode_request(&buf[..read]).unwrap();

            match behavior {
                Behavior::Reply(response) => {
                    stream.write_all(&encode(&response).unwrap()).unwrap();
                }
                Behavior::Raw(bytes) => stream.write_all(&bytes).unwrap(),
                Behavior::Hangup => {}
            }
            request
        });

        Self { dir, path, handle }
    }

    /// Wait for the daemon thread and return the request it decoded.
    pub fn received(self) -> RequestEnvelope {
        self.handle.join().unwrap()
    }
}

pub fn reply(status: i32, payload: Option<&[u8]>) -> Behavior {
    Behavior::Reply(ResponseEnvelope {
        status,
        payload: payload.map(<[u8]>::to_vec),
        version: None,
    })
}
