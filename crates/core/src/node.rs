//! Node identity, socket paths and liveness probing.

use std::fmt;
use std::path::PathBuf;

use tracing::debug;
use veinfo_ipc::Connection;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::result::{Result, ResultExt};

/// Index of a VE node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Socket path of the daemon for `node`: `<socket_dir>/<prefix><node>.sock`.
///
/// Built on every call; nothing is cached.
pub fn socket_path(config: &ClientConfig, node: NodeId) -> PathBuf {
    let path = config
        .socket_dir
        .join(format!("{}{}.sock", config.socket_prefix, node.0));
    debug!(%node, path = %path.display(), "socket path for node");
    path
}

/// Check that the daemon of `node` accepts connections.
///
/// # Errors
/// The connection error, wrapped; [`Error::is_node_offline`] is true when
/// nobody listens.
pub fn check_node_status(config: &ClientConfig, node: NodeId) -> Result<()> {
    let conn = Connection::open(socket_path(config, node)).map_err(veinfo_ipc::RpcError::from)?;
    conn.close();
    Ok(())
}

/// Probe `candidates` and return the nodes whose daemon is listening.
///
/// # Errors
/// Returns [`Error::NoOnlineNode`] if none of them answers.
pub fn online_nodes(
    config: &ClientConfig,
    candidates: impl IntoIterator<Item = NodeId>,
) -> Result<Vec<NodeId>> {
    let online: Vec<NodeId> = candidates
        .into_iter()
        .filter(|&node| {
            let online = check_node_status(config, node).ok_logged().is_some();
            debug!(%node, online, "node status checked");
            online
        })
        .collect();

    if online.is_empty() {
        return Err(Error::NoOnlineNode);
    }
    Ok(online)
}
