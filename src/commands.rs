//! CLI command handlers.
//!
//! Each handler runs one client call and renders the result as text or JSON.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::fmt::Write as _;

use serde::Serialize;
use tracing::debug;
use veinfo_core::{CpuSet, Error, NodeClient, NodeId, RLimit, online_nodes};

use crate::cli::Commands;
use crate::json::JsonSuccess;

/// Output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

/// Execute a CLI command and return what to print on stdout.
///
/// # Errors
/// The client error of the underlying call.
pub fn execute_command(
    client: &NodeClient,
    command: Commands,
    format: Format,
) -> Result<String, Error> {
    debug!(?command, node = %client.node(), "executing command");
    match command {
        Commands::Status => cmd_status(client, format),
        Commands::Online { max_nodes } => cmd_online(client, max_nodes, format),
        Commands::VersionCheck => cmd_version_check(client, format),
        Commands::MemInfo => render(client, format, &client.mem_info()?, |m| {
            format!(
                "total: {} KiB\nused: {} KiB\nfree: {} KiB\nshared: {} KiB\nhugepage used: {} KiB",
                m.total, m.used, m.free, m.shared, m.hugepage_used
            )
        }),
        Commands::LoadAvg => render(client, format, &client.load_avg()?, |l| {
            format!(
                "load average: {:.2} {:.2} {:.2}\nprocesses: {} runnable / {} total",
                l.av_1, l.av_5, l.av_15, l.runnable, l.total_proc
            )
        }),
        Commands::PidStatm { pid } => render(client, format, &client.pid_statm(pid)?, |s| {
            format!(
                "size: {} KiB\nresident: {} KiB\nshare: {} KiB\ntext: {} KiB\ndata: {} KiB",
                s.size, s.resident, s.share, s.trs, s.drs
            )
        }),
        Commands::Rusage { pid } => render(client, format, &client.rusage(pid)?, |r| {
            format!(
                "user time: {}.{:06}s\nelapsed: {}.{:06}s\nmax rss: {} KiB\nvoluntary switches: {}\ninvoluntary switches: {}\npage size: {}",
                r.utime.sec,
                r.utime.usec,
                r.elapsed.sec,
                r.elapsed.usec,
                r.max_rss,
                r.nvcsw,
                r.nivcsw,
                r.page_size
            )
        }),
        Commands::CheckPid { pid } => cmd_check_pid(client, pid, format),
        Commands::Affinity { pid, set } => cmd_affinity(client, pid, set.as_deref(), format),
        Commands::Rlimit {
            pid,
            resource,
            soft,
            hard,
        } => cmd_rlimit(client, pid, resource, soft.zip(hard), format),
        Commands::DeleteDummy { pid } => {
            client.delete_dummy_task(pid)?;
            render(client, format, &Done { pid }, |d| {
                format!("dummy task of {} deleted", d.pid)
            })
        }
    }
}

#[derive(Serialize)]
struct Done {
    pid: i32,
}

#[derive(Serialize)]
struct Online {
    online: bool,
}

#[derive(Serialize)]
struct OnlineNodes {
    nodes: Vec<u32>,
}

#[derive(Serialize)]
struct Version {
    daemon_version: String,
    library_version: String,
}

#[derive(Serialize)]
struct PidAlive {
    pid: i32,
    alive: bool,
}

#[derive(Serialize)]
struct AffinityOutput {
    pid: i32,
    cpus: Vec<usize>,
}

#[derive(Serialize)]
struct RlimitOutput {
    pid: i32,
    resource: i32,
    soft: u64,
    hard: u64,
    updated: bool,
}

fn cmd_status(client: &NodeClient, format: Format) -> Result<String, Error> {
    client.check_status()?;
    render(client, format, &Online { online: true }, |_| {
        format!("node {} is online", client.node())
    })
}

fn cmd_online(client: &NodeClient, max_nodes: u32, format: Format) -> Result<String, Error> {
    let nodes = online_nodes(client.config(), (0..max_nodes).map(NodeId))?;
    let output = OnlineNodes {
        nodes: nodes.into_iter().map(|n| n.0).collect(),
    };
    render(client, format, &output, |o| {
        o.nodes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    })
}

fn cmd_version_check(client: &NodeClient, format: Format) -> Result<String, Error> {
    let daemon_version = client.verify_version()?;
    let output = Version {
        daemon_version,
        library_version: client.config().library_version.clone(),
    };
    render(client, format, &output, |v| {
        format!(
            "node daemon v{} is compatible with library v{}",
            v.daemon_version, v.library_version
        )
    })
}

fn cmd_check_pid(client: &NodeClient, pid: i32, format: Format) -> Result<String, Error> {
    let alive = client.check_pid(pid)?;
    render(client, format, &PidAlive { pid, alive }, |p| {
        if p.alive {
            format!("{} is a VE process", p.pid)
        } else {
            format!("{} does not exist", p.pid)
        }
    })
}

fn cmd_affinity(
    client: &NodeClient,
    pid: i32,
    set: Option<&str>,
    format: Format,
) -> Result<String, Error> {
    let mask = match set {
        Some(list) => {
            let mask = parse_cpu_list(list)?;
            client.set_affinity(pid, &mask)?;
            mask
        }
        None => client.get_affinity(pid)?,
    };
    let output = AffinityOutput {
        pid,
        cpus: mask.cpus().collect(),
    };
    render(client, format, &output, |a| {
        format!("affinity of {}: {}", a.pid, format_cpu_list(&a.cpus))
    })
}

fn cmd_rlimit(
    client: &NodeClient,
    pid: i32,
    resource: i32,
    new_limit: Option<(u64, u64)>,
    format: Format,
) -> Result<String, Error> {
    let (limit, updated) = match new_limit {
        Some((soft, hard)) => {
            let limit = RLimit { soft, hard };
            client.set_rlimit(pid, resource, limit)?;
            (limit, true)
        }
        None => (client.get_rlimit(pid, resource)?, false),
    };
    let output = RlimitOutput {
        pid,
        resource,
        soft: limit.soft,
        hard: limit.hard,
        updated,
    };
    render(client, format, &output, rlimit_text)
}

/// The daemon does not report the replaced limit, so an update echoes the
/// limit that was applied.
fn rlimit_text(r: &RlimitOutput) -> String {
    let verb = if r.updated { "set to" } else { "is" };
    format!(
        "resource {} of {} {verb}: soft {} hard {}",
        r.resource,
        r.pid,
        format_limit(r.soft),
        format_limit(r.hard)
    )
}

fn render<T: Serialize>(
    client: &NodeClient,
    format: Format,
    data: &T,
    text: impl FnOnce(&T) -> String,
) -> Result<String, Error> {
    match format {
        Format::Text => Ok(text(data)),
        Format::Json => serde_json::to_string_pretty(&JsonSuccess::new(client.node().0, data))
            .map_err(|e| Error::invalid_argument(format!("failed to serialize output: {e}"))),
    }
}

/// Parse `0-3,6,8-9` into a core set.
///
/// # Errors
/// [`Error::InvalidArgument`] for a malformed list or out-of-range core.
pub fn parse_cpu_list(list: &str) -> Result<CpuSet, Error> {
    let invalid = |part: &str| Error::invalid_argument(format!("invalid cpu list entry '{part}'"));

    list.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .try_fold(CpuSet::new(), |mut set, part| {
            let (first, last) = match part.split_once('-') {
                Some((a, b)) => (a.trim(), b.trim()),
                None => (part, part),
            };
            let first: usize = first.parse().map_err(|_| invalid(part))?;
            let last: usize = last.parse().map_err(|_| invalid(part))?;
            if first > last {
                return Err(invalid(part));
            }
            (first..=last).try_for_each(|cpu| set.insert(cpu))?;
            Ok(set)
        })
        .and_then(|set| {
            if set.is_empty() {
                Err(Error::invalid_argument("cpu list is empty"))
            } else {
                Ok(set)
            }
        })
}

fn format_cpu_list(cpus: &[usize]) -> String {
    let mut out = String::new();
    let mut iter = cpus.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == end.checked_add(1).as_ref() {
            end = iter.next().unwrap_or(end);
        }
        if !out.is_empty() {
            out.push(',');
        }
        if start == end {
            let _ = write!(out, "{start}");
        } else {
            let _ = write!(out, "{start}-{end}");
        }
    }
    out
}

fn format_limit(value: u64) -> String {
    if value == RLimit::INFINITY {
        "unlimited".to_string()
    } else {
        value.to_string()
    }
}
