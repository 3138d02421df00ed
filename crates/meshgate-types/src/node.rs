//! node type representing a mesh participant.
//!
//! the access core only looks at a node's addresses; identity and
//! hostname are carried so callers can key peer maps and log usefully.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::addresses::NodeAddresses;

/// unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// get the raw u64 value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a mesh node as seen by the access core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) hostname: String,
    #[serde(default)]
    pub(crate) addresses: NodeAddresses,
}

impl Node {
    /// create a node.
    pub fn new(id: NodeId, hostname: impl Into<String>, addresses: NodeAddresses) -> Self {
        Self {
            id,
            hostname: hostname.into(),
            addresses,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// the node's addresses in stored order.
    pub fn addresses(&self) -> &NodeAddresses {
        &self.addresses
    }

    /// mutable access for callers that re-address a node.
    pub fn addresses_mut(&mut self) -> &mut NodeAddresses {
        &mut self.addresses
    }

    /// the node's addresses in canonical order.
    pub fn ips(&self) -> Vec<IpAddr> {
        self.addresses.canonical()
    }

    /// true if the node has at least one address.
    pub fn has_addresses(&self) -> bool {
        !self.addresses.is_empty()
    }
}

/// builder for constructing [`Node`] values.
///
/// only the id is required; the hostname defaults to `node-{id}`.
pub struct NodeBuilder {
    node: Node,
}

impl NodeBuilder {
    pub fn new(id: NodeId) -> Self {
        Self {
            node: Node {
                id,
                hostname: format!("node-{id}"),
                addresses: NodeAddresses::empty(),
            },
        }
    }

    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.node.hostname = hostname.into();
        self
    }

    pub fn address(mut self, addr: IpAddr) -> Self {
        self.node.addresses.push(addr);
        self
    }

    pub fn addresses(mut self, addresses: NodeAddresses) -> Self {
        self.node.addresses = addresses;
        self
    }

    pub fn build(self) -> Node {
        self.node
    }
}
