//! test utilities for creating test nodes.
//!
//! builds [`Node`] values from address strings so tests can read like the
//! scenarios they describe.

use std::net::IpAddr;

use crate::{Node, NodeAddresses, NodeId};

/// builder for creating test [`Node`] instances.
///
/// # example
/// ```
/// use meshgate_types::test_utils::TestNodeBuilder;
///
/// let node = TestNodeBuilder::new(1).with_ip("100.64.0.1").build();
/// assert_eq!(node.addresses().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct TestNodeBuilder {
    id: u64,
    hostname: Option<String>,
    addresses: Vec<IpAddr>,
}

impl TestNodeBuilder {
    /// create a new builder with the given node id and no addresses.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            hostname: None,
            addresses: vec![],
        }
    }

    /// set a custom hostname.
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// add an address.
    ///
    /// # panics
    /// if `ip` is not a valid address literal.
    pub fn with_ip(mut self, ip: &str) -> Self {
        self.addresses
            .push(ip.parse().unwrap_or_else(|_| panic!("invalid test address: {ip}")));
        self
    }

    /// add several addresses, in the given order.
    pub fn with_ips(self, ips: &[&str]) -> Self {
        ips.iter().fold(self, |b, ip| b.with_ip(ip))
    }

    /// build the [`Node`].
    pub fn build(self) -> Node {
        let hostname = self.hostname.unwrap_or_else(|| format!("node-{}", self.id));
        Node::new(NodeId(self.id), hostname, NodeAddresses::new(self.addresses))
    }
}

/// shorthand for a node with the given id and addresses.
pub fn node(id: u64, ips: &[&str]) -> Node {
    TestNodeBuilder::new(id).with_ips(ips).build()
}
