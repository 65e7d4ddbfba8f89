//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// veinfo - VE node daemon client
#[derive(Parser, Debug)]
#[command(name = "veinfo")]
#[command(version)]
#[command(about = "Query and control VE nodes through their node daemon")]
#[command(
    long_about = "veinfo talks to the per-node VE daemon over its Unix socket. Every command is one request/response exchange on a fresh connection."
)]
pub struct Cli {
    /// VE node number
    #[arg(short, long, global = true, env = "VE_NODE_NUMBER", default_value_t = 0)]
    pub node: u32,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the node daemon accepts connections
    Status,

    /// List nodes whose daemon is listening
    Online {
        /// Probe nodes 0..max-nodes
        #[arg(long, default_value_t = 8)]
        max_nodes: u32,
    },

    /// Handshake with the node daemon and compare versions
    VersionCheck,

    /// Node memory usage in KiB
    MemInfo,

    /// Node load averages
    LoadAvg,

    /// Memory counters of a VE process in KiB
    PidStatm {
        /// VE process id
        #[arg(short, long)]
        pid: i32,
    },

    /// Resource usage of a VE process
    Rusage {
        /// VE process id
        #[arg(short, long)]
        pid: i32,
    },

    /// Check whether a VE process exists
    CheckPid {
        /// VE process id
        #[arg(short, long)]
        pid: i32,
    },

    /// Show or set the core affinity of a VE process
    Affinity {
        /// VE process id
        #[arg(short, long)]
        pid: i32,

        /// Comma separated cores or ranges to pin to (e.g. 0-3,6)
        #[arg(long)]
        set: Option<String>,
    },

    /// Show or set a resource limit of a VE process
    Rlimit {
        /// VE process id
        #[arg(short, long)]
        pid: i32,

        /// Resource number (as in getrlimit(2))
        #[arg(short, long)]
        resource: i32,

        /// New soft limit (requires --hard)
        #[arg(long, requires = "hard")]
        soft: Option<u64>,

        /// New hard limit (requires --soft)
        #[arg(long, requires = "soft")]
        hard: Option<u64>,
    },

    /// Remove the placeholder task kept for a VE process
    DeleteDummy {
        /// VE process id
        #[arg(short, long)]
        pid: i32,
    },
}
