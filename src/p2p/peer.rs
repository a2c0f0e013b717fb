//! Peer model
//!
//! Peers are learned from the discovery service and from ping announcements.
//! A peer's `name` is its identity; ip and port may change between
//! announcements.

use serde::{Deserialize, Serialize};

fn default_scheme() -> String {
    "http".to_string()
}

/// A node of the network as known to the discovery service and to peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub ip: String,
    pub port: u16,
}

impl Node {
    /// Create a node reachable over plain http
    pub fn new(name: impl Into<String>, ip: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            scheme: default_scheme(),
            ip: ip.into(),
            port,
        }
    }

    /// Base url, `scheme://ip:port`
    pub fn host(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.ip, self.port)
    }

    /// Take the address of a later announcement with the same name
    pub fn refresh(&mut self, announced: &Node) {
        self.ip = announced.ip.clone();
        self.port = announced.port;
    }
}

/// Insert `node`, or refresh the address of the entry with the same name
pub fn upsert_node(nodes: &mut Vec<Node>, node: Node) {
    match nodes.iter_mut().find(|n| n.name == node.name) {
        Some(existing) => existing.refresh(&node),
        None => nodes.push(node),
    }
}
