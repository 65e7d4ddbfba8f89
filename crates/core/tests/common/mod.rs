//! Mock node daemon bound at `<tempdir>/veos0.sock`.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

use std::io::{Read, Write};
use std::os::unix::net::UnixListener;
use std::thread::JoinHandle;

use tempfile::TempDir;
use veinfo_core::{ClientConfig, NodeClient, NodeId};
use veinfo_ipc::{MAX_MESSAGE_SIZE, RequestEnvelope, ResponseEnvelope, decode_request, encode};

pub struct MockDaemon {
    pub dir: TempDir,
    handle: JoinHandle<RequestEnvelope>,
}

impl MockDaemon {
    /// Serve one connection, answering with `response`.
    pub fn reply(response: ResponseEnvelope) -> Self {
        Self::spawn(Some(response))
    }

    /// Serve one connection and close it without answering.
    pub fn hangup() -> Self {
        Self::spawn(None)
    }

    fn spawn(response: Option<ResponseEnvelope>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let listener = UnixListener::bind(dir.path().join("veos0.sock")).unwrap();

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = vec![0u8; MAX_MESSAGE_SIZE];
            let read = stream.read(&mut buf).unwrap();
            let request = decode_request(&buf[..read]).unwrap();
            if let Some(response) = response {
                stream.write_all(&encode(&response).unwrap()).unwrap();
            }
            request
        });

        Self { dir, handle }
    }

    pub fn client(&self) -> NodeClient {
        NodeClient::new(ClientConfig::with_socket_dir(self.dir.path()), NodeId(0))
    }

    /// Wait for the daemon thread and return the request it decoded.
    pub fn received(self) -> RequestEnvelope {
        self.handle.join().unwrap()
    }
}

pub fn ok(payload: Option<Vec<u8>>) -> ResponseEnvelope {
    ResponseEnvelope {
        status: 0,
        payload,
        version: None,
    }
}

pub fn failed(status: i32) -> ResponseEnvelope {
    ResponseEnvelope {
        status,
        payload: None,
        version: None,
    }
}
