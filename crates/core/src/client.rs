//! Typed command dispatch over one-shot RPC calls.
//!
//! Every method is a single [`RpcCall`] with [`Command::QueryCompat`], one
//! sub-command and the caller's pid. Fixed-layout request and reply bodies
//! go through [`WireRecord`].

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use tracing::{Span, debug, debug_span, error, warn};
use veinfo_ipc::{Command, RpcCall, RpcError, SubCommand};

use crate::config::{ClientConfig, FatalPolicy};
use crate::error::Error;
use crate::result::Result;
use crate::node::{self, NodeId};
use crate::record::{
    Affinity, CpuSet, LoadAvg, MemInfo, PidStatm, PrLimit, RLimit, RusageInfo, WireRecord,
};
use crate::version::compare_versions;

/// Client bound to the daemon of one node.
#[derive(Debug, Clone)]
pub struct NodeClient {
    config: ClientConfig,
    node: NodeId,
    span: Span,
}

impl NodeClient {
    /// Create a client for `node`.
    ///
    /// No connection is made here; every call opens its own.
    pub fn new(config: ClientConfig, node: NodeId) -> Self {
        let span = debug_span!("veinfo.node", node = node.0);
        Self { config, node, span }
    }

    pub const fn node(&self) -> NodeId {
        self.node
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Span every call of this client runs inside.
    pub const fn span(&self) -> &Span {
        &self.span
    }

    /// Socket path of this client's node, rebuilt on every call.
    pub fn socket_path(&self) -> PathBuf {
        node::socket_path(&self.config, self.node)
    }

    /// Whether the daemon accepts connections.
    ///
    /// # Errors
    /// The connection error; [`Error::is_node_offline`] is true when nobody
    /// listens.
    pub fn check_status(&self) -> Result<()> {
        self.run("check_status", |_| {
            node::check_node_status(&self.config, self.node)
        })
    }

    /// Handshake with the daemon and return its version.
    ///
    /// The daemon must report a version no older than
    /// [`ClientConfig::library_version`].
    ///
    /// # Errors
    /// - [`Error::IncompatibleVersion`] if the daemon sends no version or an
    ///   older one
    /// - A remote error for any non-zero status, not only an invalid device
    pub fn verify_version(&self) -> Result<String> {
        let library = self.config.library_version.clone();
        self.run("verify_version", |path| {
            let reply = self
                .call(SubCommand::Handshake)?
                .version(library.as_bytes())
                .exchange(path)?;

            let Some(daemon) = reply.version.as_deref() else {
                error!(library = %library, "node daemon sent no version");
                return Err(Error::IncompatibleVersion {
                    daemon: None,
                    library,
                });
            };
            let daemon = String::from_utf8_lossy(daemon)
                .trim_end_matches('\0')
                .to_string();

            if compare_versions(&daemon, &library) == Ordering::Less {
                error!(daemon = %daemon, library = %library, "node daemon is older than library");
                return Err(Error::IncompatibleVersion {
                    daemon: Some(daemon),
                    library,
                });
            }

            reply.into_payload(None)?;
            debug!(daemon = %daemon, "node daemon version accepted");
            Ok(daemon)
        })
    }

    /// Whether `pid` is a live VE process.
    ///
    /// The daemon reports a live thread as status 0 and a process it does not
    /// track (including one that only exists on the host) as `-ESRCH`.
    ///
    /// # Errors
    /// A remote error for any non-zero status other than `-ESRCH`.
    pub fn check_pid(&self, pid: i32) -> Result<bool> {
        self.run("check_pid", |path| {
            let result = self
                .call(SubCommand::CheckPid)?
                .target_pid(pid)
                .invoke(path);
            match result {
                Ok(_) => Ok(true),
                Err(RpcError::Remote { status }) if status.saturating_neg() == Errno::ESRCH as i32 => {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Memory usage of the node, in KiB.
    ///
    /// # Errors
    /// Exchange errors, or a payload of the wrong size.
    pub fn mem_info(&self) -> Result<MemInfo> {
        self.run("mem_info", |path| {
            let info: MemInfo = query(self.call(SubCommand::MemInfo)?, path)?;
            Ok(info.to_kib())
        })
    }

    /// Load averages of the node.
    ///
    /// # Errors
    /// Exchange errors, or a payload of the wrong size.
    pub fn load_avg(&self) -> Result<LoadAvg> {
        self.run("load_avg", |path| {
            query(self.call(SubCommand::LoadInfo)?, path)
        })
    }

    /// Memory counters of `pid`, in KiB.
    ///
    /// # Errors
    /// Exchange errors, or a payload of the wrong size.
    pub fn pid_statm(&self, pid: i32) -> Result<PidStatm> {
        self.run("pid_statm", |path| {
            let statm: PidStatm =
                query(self.call(SubCommand::PidStatmInfo)?.target_pid(pid), path)?;
            Ok(statm.to_kib())
        })
    }

    /// Resource usage of `pid`.
    ///
    /// # Errors
    /// Exchange errors, or a payload of the wrong size.
    pub fn rusage(&self, pid: i32) -> Result<RusageInfo> {
        self.run("rusage", |path| {
            query(self.call(SubCommand::GetRusage)?.target_pid(pid), path)
        })
    }

    /// Cores `pid` may run on.
    ///
    /// # Errors
    /// Exchange errors, or a payload of the wrong size.
    pub fn get_affinity(&self, pid: i32) -> Result<CpuSet> {
        self.run("get_affinity", |path| {
            let request = Affinity::new(CpuSet::new()).to_payload()?;
            let affinity: Affinity = query(
                self.call(SubCommand::GetAffinity)?
                    .target_pid(pid)
                    .payload(request),
                path,
            )?;
            Ok(affinity.mask)
        })
    }

    /// Restrict `pid` to the cores in `mask`.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] for an empty mask, or exchange errors.
    pub fn set_affinity(&self, pid: i32, mask: &CpuSet) -> Result<()> {
        if mask.is_empty() {
            return Err(Error::invalid_argument("affinity mask is empty"));
        }
        self.run("set_affinity", |path| {
            let request = Affinity::new(*mask).to_payload()?;
            self.call(SubCommand::SetAffinity)?
                .target_pid(pid)
                .payload(request)
                .invoke(path)?;
            Ok(())
        })
    }

    /// Current limit of `resource` for `pid`.
    ///
    /// # Errors
    /// Exchange errors, or a payload of the wrong size.
    pub fn get_rlimit(&self, pid: i32, resource: i32) -> Result<RLimit> {
        self.run("get_rlimit", |path| {
            let reply: PrLimit = query(
                self.call(SubCommand::PrLimit)?
                    .target_pid(pid)
                    .payload(PrLimit::query(resource).to_payload()?),
                path,
            )?;
            Ok(reply.old_limit)
        })
    }

    /// Replace the limit of `resource` for `pid`.
    ///
    /// The daemon answers an update with a bare status; any payload it sends
    /// back is ignored.
    ///
    /// # Errors
    /// [`Error::InvalidArgument`] if the soft limit exceeds the hard limit,
    /// or exchange errors.
    pub fn set_rlimit(&self, pid: i32, resource: i32, limit: RLimit) -> Result<()> {
        if limit.soft > limit.hard {
            return Err(Error::invalid_argument(format!(
                "soft limit {} exceeds hard limit {}",
                limit.soft, limit.hard
            )));
        }
        self.run("set_rlimit", |path| {
            self.call(SubCommand::PrLimit)?
                .target_pid(pid)
                .payload(PrLimit::update(resource, limit).to_payload()?)
                .invoke(path)?;
            Ok(())
        })
    }

    /// Remove the placeholder task the daemon keeps for `pid`.
    ///
    /// # Errors
    /// Exchange errors.
    pub fn delete_dummy_task(&self, pid: i32) -> Result<()> {
        self.run("delete_dummy_task", |path| {
            self.call(SubCommand::DelDummyTask)?
                .target_pid(pid)
                .invoke(path)?;
            Ok(())
        })
    }

    /// Send any sub-command with an opaque payload.
    ///
    /// With `max_response == Some(n)` the reply must carry a payload, of which
    /// at most `n` bytes are returned.
    ///
    /// # Errors
    /// Exchange errors.
    pub fn raw(
        &self,
        subcommand: i32,
        target_pid: Option<i32>,
        payload: Option<Vec<u8>>,
        max_response: Option<usize>,
    ) -> Result<Option<Vec<u8>>> {
        self.run("raw", |path| {
            let mut call = self.call(subcommand)?;
            if let Some(pid) = target_pid {
                call = call.target_pid(pid);
            }
            if let Some(payload) = payload {
                call = call.payload(payload);
            }
            if let Some(max_len) = max_response {
                call = call.expect_payload(max_len);
            }
            Ok(call.invoke(path)?)
        })
    }

    fn call(&self, subcommand: impl Into<i32>) -> Result<RpcCall> {
        Ok(RpcCall::new(Command::QueryCompat)
            .subcommand(subcommand)
            .requester_pid(requester_pid()?))
    }

    /// Run `op` inside this client's span and apply the fatal policy to its
    /// result.
    fn run<T>(&self, op: &'static str, f: impl FnOnce(&Path) -> Result<T>) -> Result<T> {
        let _entered = self.span.enter();
        let path = self.socket_path();
        let result = f(&path);

        if let Err(err) = &result {
            if err.is_fatal() {
                error!(operation = op, error = %err, "connection to node daemon severed");
                if self.config.fatal_policy == FatalPolicy::Abort {
                    std::process::abort();
                }
            } else {
                debug!(operation = op, error = %err, "call failed");
            }
        }
        result
    }
}

/// Run `call` and decode its reply as `R`.
fn query<R: WireRecord>(call: RpcCall, path: &Path) -> Result<R> {
    let payload = call
        .expect_payload(R::SIZE)
        .invoke(path)?
        .ok_or(RpcError::MissingPayload)?;
    R::from_payload(&payload)
}

fn requester_pid() -> Result<i32> {
    let pid = std::process::id();
    i32::try_from(pid).map_err(|_| {
        warn!(pid, "process id does not fit the wire field");
        Error::invalid_argument(format!("process id {pid} out of range"))
    })
}
