//! veinfo core - typed client for the VE node daemon
//!
//! Builds on [`veinfo_ipc`] with per-node socket discovery, configuration,
//! fixed-layout payload records and one method per daemon command.
//!
//! # Example
//!
//! ```rust,no_run
//! use veinfo_core::{ClientConfig, NodeClient, NodeId};
//!
//! # fn main() -> veinfo_core::Result<()> {
//! let client = NodeClient::new(ClientConfig::from_env()?, NodeId(0));
//! client.verify_version()?;
//! let mem = client.mem_info()?;
//! println!("{} KiB free", mem.free);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

mod client;
mod config;
mod error;
mod node;
mod record;
mod result;
mod version;

pub use client::NodeClient;
pub use config::{ClientConfig, FatalPolicy};
pub use error::Error;
pub use node::{NodeId, check_node_status, online_nodes, socket_path};
pub use record::{
    Affinity, CPU_MASK_WORDS, CpuSet, LAYOUT_REVISION, LoadAvg, MAX_CPUS, MemInfo, PidStatm,
    PrLimit, RLimit, RusageInfo, TimeVal, WireRecord,
};
pub use result::{Result, ResultExt};
pub use version::compare_versions;
pub use veinfo_ipc::{RpcError, SubCommand, TransportError};
