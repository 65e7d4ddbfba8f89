//! Unix-domain stream transport
//!
//! A [`Connection`] lives for exactly one exchange: it is opened, used for one
//! [`send_all`] and one [`recv_once`], and closed (dropped) on every exit path.
//!
//! # Retry policy
//! - `EINTR` and `EAGAIN` are retried immediately, without sleeping
//! - any other send/recv error, a zero-byte send, and a zero-byte read
//!   (orderly peer shutdown) are [`TransportError::Fatal`]
//!
//! # Thread Safety
//! - `Connection` is `Send` but not shared; independent calls open
//!   independent sockets and need no synchronization

use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::socket::{self, AddressFamily, MsgFlags, SockFlag, SockType, UnixAddr};
use tracing::{debug, error, trace};

use crate::{MAX_SOCKET_PATH_LEN, TransportError, TransportResult};

/// Suppress SIGPIPE on a severed connection; the error surfaces as `EPIPE`.
#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
const SEND_FLAGS: MsgFlags = MsgFlags::MSG_NOSIGNAL;

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
const SEND_FLAGS: MsgFlags = MsgFlags::empty();

/// Raw single-call socket I/O.
///
/// Implemented by [`Connection`]; tests substitute scripted implementations to
/// exercise partial writes and interrupted calls.
pub trait SocketIo {
    /// One `send(2)` call. Returns the number of bytes accepted.
    ///
    /// # Errors
    /// The `errno` reported by the call.
    fn send_some(&mut self, buf: &[u8]) -> nix::Result<usize>;

    /// One `recv(2)` call. Returns the number of bytes read; `0` is EOF.
    ///
    /// # Errors
    /// The `errno` reported by the call.
    fn recv_some(&mut self, buf: &mut [u8]) -> nix::Result<usize>;
}

/// Connected stream socket to one node daemon.
#[derive(Debug)]
pub struct Connection {
    fd: OwnedFd,
    path: PathBuf,
}

impl Connection {
    /// Create a stream socket and connect it to `path`.
    ///
    /// # Preconditions
    /// - `path` is at most [`MAX_SOCKET_PATH_LEN`] bytes
    ///
    /// # Postconditions
    /// - Returns a connected socket on success
    /// - Returns Err(TransportError::PathTooLong) before any socket is created
    /// - Returns Err(TransportError::SocketCreateFailed) if `socket(2)` fails
    /// - Returns Err(TransportError::ConnectFailed) if nobody listens on `path`;
    ///   the half-created socket is closed before returning
    ///
    /// # Errors
    /// See postconditions.
    pub fn open(path: impl AsRef<Path>) -> TransportResult<Self> {
        let path = path.as_ref();
        let len = path.as_os_str().as_bytes().len();
        if len > MAX_SOCKET_PATH_LEN {
            error!(path = %path.display(), len, "socket path is too long");
            return Err(TransportError::path_too_long(path, len, MAX_SOCKET_PATH_LEN));
        }

        let fd = socket::socket(
            AddressFamily::Unix,
            SockType::Stream,
            SockFlag::empty(),
            None,
        )
        .map_err(|errno| {
            error!(path = %path.display(), %errno, "failed to create socket");
            TransportError::SocketCreateFailed { errno }
        })?;
        debug!(fd = fd.as_raw_fd(), "socket created");

        let addr = UnixAddr::new(path)
            .map_err(|errno| TransportError::connect_failed(path, errno))?;
        socket::connect(fd.as_raw_fd(), &addr).map_err(|errno| {
            debug!(path = %path.display(), %errno, "connection to socket failed");
            TransportError::connect_failed(path, errno)
        })?;

        Ok(Self {
            fd,
            path: path.to_path_buf(),
        })
    }

    /// Socket path this connection was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the descriptor. Dropping the connection has the same effect.
    pub fn close(self) {
        trace!(fd = self.fd.as_raw_fd(), "closing connection");
        drop(self.fd);
    }
}

impl AsFd for Connection {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl SocketIo for Connection {
    fn send_some(&mut self, buf: &[u8]) -> nix::Result<usize> {
        socket::send(self.fd.as_raw_fd(), buf, SEND_FLAGS)
    }

    fn recv_some(&mut self, buf: &mut [u8]) -> nix::Result<usize> {
        socket::recv(self.fd.as_raw_fd(), buf, MsgFlags::empty())
    }
}

/// Write the whole of `buf`, looping over partial sends.
///
/// # Postconditions
/// - Returns Ok(buf.len()) once every byte was accepted, in order
/// - Returns Err(TransportError::Fatal) on any error other than EINTR/EAGAIN,
///   or if the socket accepts zero bytes
///
/// # Errors
/// See postconditions.
pub fn send_all<S: SocketIo + ?Sized>(io: &mut S, buf: &[u8]) -> TransportResult<usize> {
    let mut transferred = 0usize;

    while let Some(remaining) = buf.get(transferred..).filter(|rest| !rest.is_empty()) {
        match io.send_some(remaining) {
            Ok(0) => {
                error!(transferred, "socket accepted zero bytes");
                return Err(TransportError::send_failed(None));
            }
            Ok(written) => {
                transferred = transferred.saturating_add(written.min(remaining.len()));
                trace!(
                    transferred,
                    remaining = buf.len().saturating_sub(transferred),
                    "partial send"
                );
            }
            Err(Errno::EINTR | Errno::EAGAIN) => {}
            Err(errno) => {
                error!(%errno, transferred, "writing on socket failed");
                return Err(TransportError::send_failed(Some(errno)));
            }
        }
    }

    debug!(transferred, "send complete");
    Ok(transferred)
}

/// Perform exactly one successful receive into `buf`.
///
/// The peer answers every request with a single send no larger than the
/// buffer, so one read holds the whole envelope.
///
/// # Postconditions
/// - Returns Ok(n) with `n > 0` bytes written to the front of `buf`
/// - Returns Err(TransportError::Fatal) on EOF or any error other than
///   EINTR/EAGAIN
///
/// # Errors
/// See postconditions.
pub fn recv_once<S: SocketIo + ?Sized>(io: &mut S, buf: &mut [u8]) -> TransportResult<usize> {
    loop {
        match io.recv_some(buf) {
            Ok(0) => {
                error!("peer has performed an orderly shutdown");
                return Err(TransportError::recv_failed(None));
            }
            Ok(read) => {
                debug!(read, "received");
                return Ok(read);
            }
            Err(errno @ (Errno::EINTR | Errno::EAGAIN)) => {
                trace!(%errno, "recv interrupted, retrying");
            }
            Err(errno) => {
                error!(%errno, "reading from socket failed");
                return Err(TransportError::recv_failed(Some(errno)));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    //! Scripted [`SocketIo`] for exercising the retry rules.

    use std::collections::VecDeque;

    use nix::errno::Errno;

    use super::SocketIo;

    /// One scripted outcome of a `recv` call.
    #[derive(Debug, Clone)]
    pub enum RecvStep {
        Data(Vec<u8>),
        Fail(Errno),
    }

    #[derive(Debug, Default)]
    pub struct ScriptedIo {
        pub sends: VecDeque<nix::Result<usize>>,
        pub recvs: VecDeque<RecvStep>,
        pub written: Vec<u8>,
        pub send_calls: usize,
    }

    impl ScriptedIo {
        pub fn with_sends(sends: impl IntoIterator<Item = nix::Result<usize>>) -> Self {
            Self {
                sends: sends.into_iter().collect(),
                ..Self::default()
            }
        }

        pub fn with_recvs(recvs: impl IntoIterator<Item = RecvStep>) -> Self {
            Self {
                recvs: recvs.into_iter().collect(),
                ..Self::default()
            }
        }
    }

    impl SocketIo for ScriptedIo {
        fn send_some(&mut self, buf: &[u8]) -> nix::Result<usize> {
            self.send_calls += 1;
            // An exhausted script accepts everything
            let step = self.sends.pop_front().unwrap_or(Ok(buf.len()));
            let accepted = step?.min(buf.len());
            self.written.extend_from_slice(&buf[..accepted]);
            Ok(accepted)
        }

        fn recv_some(&mut self, buf: &mut [u8]) -> nix::Result<usize> {
            match self.recvs.pop_front() {
                Some(RecvStep::Data(data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                Some(RecvStep::Fail(errno)) => Err(errno),
                None => Ok(0),
            }
        }
    }
}
