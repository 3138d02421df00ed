//! in-memory node store with copy-on-write semantics.
//!
//! nodestore provides fast, thread-safe access to node data and to each
//! node's peer list. both maps live behind `RwLock<Arc<..>>`: writers build
//! a new map and swap it in, readers clone the `Arc` and never block on a
//! rebuild in progress.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use meshgate_filter::PolicyHandle;
use meshgate_proto::FilterRule;
use meshgate_types::{Config, DuplicateAddresses, Node, NodeId};
use tracing::debug;

use crate::{Error, Result};

/// a peer as presented in another node's network map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerView {
    pub id: NodeId,
    pub hostname: String,
    /// the peer's addresses in canonical order.
    pub addresses: Vec<String>,
}

impl PeerView {
    fn from_node(node: &Node) -> Self {
        Self {
            id: node.id(),
            hostname: node.hostname().to_string(),
            addresses: node.addresses().to_strings(),
        }
    }
}

/// in-memory cache for nodes with copy-on-write semantics.
///
/// peer lists are precomputed from the active policy after every node
/// update, node removal and policy reload.
pub struct NodeStore {
    policy: PolicyHandle,
    duplicate_addresses: DuplicateAddresses,
    log_empty_addresses: bool,
    policy_path: Option<PathBuf>,
    max_policy_size: usize,
    /// the actual node data, wrapped in arc for copy-on-write.
    nodes: RwLock<Arc<HashMap<NodeId, Node>>>,
    /// precomputed peer maps for each node.
    peers: RwLock<Arc<HashMap<NodeId, Vec<PeerView>>>>,
    /// serialises rebuilds so an older result never overwrites a newer one.
    rebuild: Mutex<()>,
}

impl NodeStore {
    /// create a new nodestore with initial nodes.
    pub fn new(config: &Config, policy: PolicyHandle, initial_nodes: Vec<Node>) -> Result<Self> {
        let store = Self {
            policy,
            duplicate_addresses: config.duplicate_addresses,
            log_empty_addresses: config.log_empty_addresses,
            policy_path: config.policy_path.clone(),
            max_policy_size: config.max_policy_size,
            nodes: RwLock::new(Arc::new(HashMap::new())),
            peers: RwLock::new(Arc::new(HashMap::new())),
            rebuild: Mutex::new(()),
        };

        let mut nodes = HashMap::new();
        for node in initial_nodes {
            let node = store.admit(node)?;
            nodes.insert(node.id(), node);
        }
        *store.nodes.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(nodes);

        store.rebuild_peers();
        Ok(store)
    }

    /// the policy handle peer maps are computed from.
    pub fn policy(&self) -> &PolicyHandle {
        &self.policy
    }

    /// get a node by id.
    pub fn get(&self, id: NodeId) -> Option<Node> {
        self.nodes_snapshot().get(&id).cloned()
    }

    /// get all nodes, ordered by id.
    pub fn get_all(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.nodes_snapshot().values().cloned().collect();
        nodes.sort_by_key(Node::id);
        nodes
    }

    /// get peers for a node.
    ///
    /// returns every node that may exchange traffic with the given node in
    /// at least one direction, ordered by id.
    pub fn get_peers(&self, node_id: NodeId) -> Vec<PeerView> {
        let peers = self.peers.read().unwrap_or_else(PoisonError::into_inner);
        peers.get(&node_id).cloned().unwrap_or_default()
    }

    /// check if `src` may reach `dst` under the active policy.
    pub fn can_access(&self, src: NodeId, dst: NodeId) -> Result<bool> {
        let nodes = self.nodes_snapshot();
        let src = nodes.get(&src).ok_or(Error::NodeNotFound(src))?;
        let dst = nodes.get(&dst).ok_or(Error::NodeNotFound(dst))?;
        Ok(self.evaluator().can_access(src, dst))
    }

    /// insert or replace a node in the store.
    ///
    /// this uses copy-on-write: it creates a new hashmap with the updated
    /// node and atomically swaps it in.
    pub fn update(&self, node: Node) -> Result<Node> {
        let node = self.admit(node)?;

        {
            let mut nodes_guard = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
            let mut new_nodes = (**nodes_guard).clone();
            new_nodes.insert(node.id(), node.clone());
            *nodes_guard = Arc::new(new_nodes);
        }

        self.rebuild_peers();
        Ok(node)
    }

    /// remove a node from the store, returning it if it was present.
    pub fn remove(&self, id: NodeId) -> Option<Node> {
        let removed = {
            let mut nodes_guard = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
            let mut new_nodes = (**nodes_guard).clone();
            let removed = new_nodes.remove(&id);
            *nodes_guard = Arc::new(new_nodes);
            removed
        };

        if removed.is_some() {
            self.rebuild_peers();
        }
        removed
    }

    /// compile and activate a new rule list, then rebuild peer maps.
    ///
    /// a rejected list leaves both the policy and the peer maps untouched.
    pub fn reload_policy(&self, rules: Vec<FilterRule>) -> Result<u64> {
        let version = self.policy.reload(rules)?;
        self.rebuild_peers();
        Ok(version)
    }

    /// re-read the configured policy file and activate it.
    pub fn reload_policy_from_file(&self) -> Result<u64> {
        let Some(ref path) = self.policy_path else {
            return Err(Error::NoPolicyPath);
        };
        let version = self.policy.reload_from_file(path, self.max_policy_size)?;
        self.rebuild_peers();
        Ok(version)
    }

    fn evaluator(&self) -> meshgate_filter::AccessEvaluator {
        self.policy
            .evaluator()
            .with_empty_address_logging(self.log_empty_addresses)
    }

    fn nodes_snapshot(&self) -> Arc<HashMap<NodeId, Node>> {
        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*nodes)
    }

    /// apply the configured address checks to an incoming node.
    fn admit(&self, mut node: Node) -> Result<Node> {
        if let Some(dup) = node.addresses().first_duplicate() {
            match self.duplicate_addresses {
                DuplicateAddresses::Reject => {
                    return Err(meshgate_types::Error::DuplicateAddress(dup).into());
                }
                DuplicateAddresses::Dedup => {
                    debug!(node_id = node.id().as_u64(), address = %dup, "collapsing duplicate node address");
                    node.addresses_mut().canonicalize();
                }
            }
        }
        if self.log_empty_addresses && !node.has_addresses() {
            debug!(
                node_id = node.id().as_u64(),
                hostname = node.hostname(),
                "storing node without addresses"
            );
        }
        Ok(node)
    }

    /// rebuild peer maps based on policy.
    ///
    /// this is called after node or policy changes to recalculate which
    /// nodes can see which other nodes.
    fn rebuild_peers(&self) {
        let _rebuild = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        let started = Instant::now();

        let snapshot = self.policy.snapshot();
        let nodes = self.nodes_snapshot();
        let mut ordered: Vec<Node> = nodes.values().cloned().collect();
        ordered.sort_by_key(Node::id);

        let evaluator = snapshot
            .evaluator()
            .with_empty_address_logging(self.log_empty_addresses);
        let peer_ids = evaluator.peer_map(&ordered);

        let new_peers: HashMap<NodeId, Vec<PeerView>> = peer_ids
            .into_iter()
            .map(|(id, peers)| {
                let views: Vec<PeerView> = peers
                    .iter()
                    .filter_map(|peer| nodes.get(peer))
                    .map(PeerView::from_node)
                    .collect();
                (id, views)
            })
            .collect();

        *self.peers.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(new_peers);

        debug!(
            nodes = ordered.len(),
            policy_version = snapshot.version(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "rebuilt peer maps"
        );
    }
}
