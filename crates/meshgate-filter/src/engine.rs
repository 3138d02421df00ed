//! the access evaluation engine.

use std::collections::HashMap;
use std::sync::Arc;

use meshgate_types::{Node, NodeAddresses, NodeId};
use rayon::prelude::*;
use tracing::trace;

use crate::rule::CompiledRule;
use crate::rule_set::RuleSet;

/// thread-safe access evaluation engine.
///
/// wraps a rule set in arc for cheap cloning and concurrent access.
/// every evaluation is a pure function of the rule set and the two nodes;
/// nothing is cached or mutated, so one engine can serve any number of
/// threads.
#[derive(Debug, Clone)]
pub struct AccessEvaluator {
    rules: Arc<RuleSet>,
    log_empty_addresses: bool,
}

impl AccessEvaluator {
    /// create a new engine with the given rules.
    pub fn new(rules: RuleSet) -> Self {
        Self::from_shared(Arc::new(rules))
    }

    /// create an engine over an already shared rule set.
    pub fn from_shared(rules: Arc<RuleSet>) -> Self {
        Self {
            rules,
            log_empty_addresses: true,
        }
    }

    /// create an engine with no rules (deny all).
    pub fn empty() -> Self {
        Self::new(RuleSet::empty())
    }

    /// toggle the trace event for nodes without addresses.
    pub fn with_empty_address_logging(mut self, enabled: bool) -> Self {
        self.log_empty_addresses = enabled;
        self
    }

    /// the rule set being evaluated.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// check if traffic from `src` may reach `dst`.
    ///
    /// true iff some rule has a source pattern matching one of `src`'s
    /// addresses and a destination pattern matching one of `dst`'s. ports
    /// are not considered. the relation is directional.
    pub fn can_access(&self, src: &Node, dst: &Node) -> bool {
        if !self.both_addressed(src, dst) {
            return false;
        }
        self.can_access_addresses(src.addresses(), dst.addresses())
    }

    /// check if traffic from `src` may reach `dst` on `port`.
    ///
    /// the destination descriptor that matches `dst` must also cover `port`.
    pub fn can_access_port(&self, src: &Node, dst: &Node, port: u16) -> bool {
        if !self.both_addressed(src, dst) {
            return false;
        }
        self.first_authorizing(|rule| rule.authorizes_port(src.addresses(), dst.addresses(), port))
            .is_some()
    }

    /// address-level form of [`can_access`](Self::can_access).
    pub fn can_access_addresses(&self, src: &NodeAddresses, dst: &NodeAddresses) -> bool {
        self.first_authorizing(|rule| rule.authorizes(src, dst)).is_some()
    }

    /// index of the first rule authorizing `src` to reach `dst`, if any.
    ///
    /// useful when auditing why a pair is reachable.
    pub fn authorizing_rule(&self, src: &Node, dst: &Node) -> Option<usize> {
        self.first_authorizing(|rule| rule.authorizes(src.addresses(), dst.addresses()))
    }

    /// nodes in `all_nodes` that `src` can reach, excluding `src` itself.
    pub fn reachable_from<'a>(&self, src: &Node, all_nodes: &'a [Node]) -> Vec<&'a Node> {
        all_nodes
            .iter()
            .filter(|dst| dst.id() != src.id() && self.can_access(src, dst))
            .collect()
    }

    /// nodes in `all_nodes` that belong in `node`'s peer list.
    ///
    /// a peer is visible when traffic is allowed in either direction, since
    /// the side receiving connections still has to know how to answer them.
    pub fn visible_peers<'a>(&self, node: &Node, all_nodes: &'a [Node]) -> Vec<&'a Node> {
        all_nodes
            .iter()
            .filter(|peer| {
                peer.id() != node.id() && (self.can_access(node, peer) || self.can_access(peer, node))
            })
            .collect()
    }

    /// the full directional reachability matrix for `nodes`.
    ///
    /// `matrix[i][j]` is true iff `nodes[i]` can reach `nodes[j]`. the
    /// diagonal is always false. rows are evaluated in parallel.
    pub fn reachability_matrix(&self, nodes: &[Node]) -> Vec<Vec<bool>> {
        nodes
            .par_iter()
            .enumerate()
            .map(|(i, src)| {
                nodes
                    .iter()
                    .enumerate()
                    .map(|(j, dst)| i != j && self.can_access(src, dst))
                    .collect::<Vec<bool>>()
            })
            .collect()
    }

    /// peer lists for every node, keyed by node id.
    ///
    /// same visibility rule as [`visible_peers`](Self::visible_peers); peers
    /// keep the order of `nodes`.
    pub fn peer_map(&self, nodes: &[Node]) -> HashMap<NodeId, Vec<NodeId>> {
        let matrix = self.reachability_matrix(nodes);

        nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let peers: Vec<NodeId> = nodes
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| matrix[i][*j] || matrix[*j][i])
                    .map(|(_, peer)| peer.id())
                    .collect();
                (node.id(), peers)
            })
            .collect()
    }

    /// find the first rule, in list order, satisfying `pred`.
    fn first_authorizing(&self, pred: impl Fn(&CompiledRule) -> bool) -> Option<usize> {
        self.rules.compiled().iter().position(pred)
    }

    /// false (with an optional trace event) if either node has no addresses.
    fn both_addressed(&self, src: &Node, dst: &Node) -> bool {
        let mut ok = true;
        for node in [src, dst] {
            if !node.has_addresses() {
                if self.log_empty_addresses {
                    trace!(
                        node_id = node.id().as_u64(),
                        hostname = node.hostname(),
                        "node has no addresses, treating as non-matching"
                    );
                }
                ok = false;
            }
        }
        ok
    }
}

impl Default for AccessEvaluator {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use meshgate_proto::{FilterRule, NetPortRange, PortRange};
    use meshgate_types::test_utils::{TestNodeBuilder, node};

    use super::*;

    /// collects formatted log output for inspection.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn with_captured_logs(f: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        logs.contents()
    }

    fn host_rule(src: &str, dst: &str) -> FilterRule {
        FilterRule::new(
            vec![src.to_string()],
            vec![NetPortRange::new(dst, PortRange::any())],
        )
    }

    fn engine(rules: Vec<FilterRule>) -> AccessEvaluator {
        AccessEvaluator::new(RuleSet::compile(rules).unwrap())
    }

    #[test]
    fn test_empty_rules_deny_all() {
        let engine = AccessEvaluator::empty();
        let node1 = node(1, &["10.0.0.1"]);
        let node2 = node(2, &["10.0.0.2"]);

        assert!(!engine.can_access(&node1, &node2));
        assert!(!engine.can_access(&node2, &node1));
        assert!(!engine.can_access_port(&node1, &node2, 22));
    }

    #[test]
    fn test_wildcard_rule_allows_all() {
        let engine = engine(vec![FilterRule::allow_all()]);
        let node1 = node(1, &["10.0.0.1"]);
        let node2 = node(2, &["fd7a:115c:a1e0::2"]);

        assert!(engine.can_access(&node1, &node2));
        assert!(engine.can_access(&node2, &node1));
    }

    #[test]
    fn test_host_rule_is_directional() {
        let engine = engine(vec![host_rule("100.64.0.2/32", "100.64.0.3/32")]);
        let one = node(1, &["100.64.0.1"]);
        let two = node(2, &["100.64.0.2"]);
        let three = node(3, &["100.64.0.3"]);

        // src can access dest
        assert!(engine.can_access(&two, &three));
        // dest cannot access src
        assert!(!engine.can_access(&three, &two));
        // other cannot access dest
        assert!(!engine.can_access(&one, &three));
    }

    #[test]
    fn test_symmetric_rules() {
        let engine = engine(vec![
            host_rule("100.64.0.2/32", "100.64.0.3/32"),
            host_rule("100.64.0.3/32", "100.64.0.2/32"),
        ]);
        let two = node(2, &["100.64.0.2"]);
        let three = node(3, &["100.64.0.3"]);

        assert!(engine.can_access(&two, &three));
        assert!(engine.can_access(&three, &two));
    }

    #[test]
    fn test_source_mismatch_denies_regardless_of_destination() {
        let engine = engine(vec![
            host_rule("100.64.1.0/24", "*"),
            host_rule("fd7a:115c:a1e0::/48", "*"),
        ]);
        let src = node(1, &["100.64.0.1"]);
        let dst = node(2, &["100.64.0.2"]);

        assert!(!engine.can_access(&src, &dst));
    }

    #[test]
    fn test_one_matching_address_per_side_suffices() {
        let engine = engine(vec![host_rule("fd7a:115c:a1e0::1/128", "100.64.0.2/32")]);
        let src = node(1, &["100.64.0.1", "fd7a:115c:a1e0::1"]);
        let dst = node(2, &["fd7a:115c:a1e0::2", "100.64.0.2"]);

        assert!(engine.can_access(&src, &dst));
    }

    #[test]
    fn test_empty_addresses_never_match() {
        let engine = engine(vec![FilterRule::allow_all()]);
        let fresh = TestNodeBuilder::new(1).build();
        let other = node(2, &["100.64.0.2"]);

        assert!(!engine.can_access(&fresh, &other));
        assert!(!engine.can_access(&other, &fresh));
        assert!(!engine.with_empty_address_logging(false).can_access(&fresh, &fresh));
    }

    #[test]
    fn test_empty_address_event_follows_toggle() {
        let engine = engine(vec![FilterRule::allow_all()]);
        let fresh = TestNodeBuilder::new(7).with_hostname("fresh").build();
        let other = node(2, &["100.64.0.2"]);

        let logged = with_captured_logs(|| {
            assert!(!engine.can_access(&fresh, &other));
        });
        assert!(logged.contains("node has no addresses"));
        assert!(logged.contains("node_id=7"));

        let silent = with_captured_logs(|| {
            let quiet = engine.clone().with_empty_address_logging(false);
            assert!(!quiet.can_access(&fresh, &other));
            assert!(!quiet.can_access_port(&other, &fresh, 22));
        });
        assert!(!silent.contains("node has no addresses"));

        // addressed pairs never emit the event
        let addressed = with_captured_logs(|| {
            assert!(engine.can_access(&other, &other));
        });
        assert!(!addressed.contains("node has no addresses"));
    }

    #[test]
    fn test_port_aware_query() {
        let engine = engine(vec![FilterRule::new(
            vec!["*".to_string()],
            vec![NetPortRange::new("100.64.0.3/32", PortRange::new(80, 443))],
        )]);
        let src = node(1, &["100.64.0.1"]);
        let dst = node(3, &["100.64.0.3"]);

        assert!(engine.can_access(&src, &dst));
        assert!(engine.can_access_port(&src, &dst, 80));
        assert!(engine.can_access_port(&src, &dst, 443));
        assert!(!engine.can_access_port(&src, &dst, 22));
    }

    #[test]
    fn test_authorizing_rule_reports_first_match() {
        let engine = engine(vec![
            host_rule("100.64.0.9/32", "*"),
            host_rule("*", "100.64.0.2/32"),
            FilterRule::allow_all(),
        ]);
        let src = node(1, &["100.64.0.1"]);
        let dst = node(2, &["100.64.0.2"]);

        assert_eq!(engine.authorizing_rule(&src, &dst), Some(1));
        assert_eq!(AccessEvaluator::empty().authorizing_rule(&src, &dst), None);
    }

    #[test]
    fn test_visible_peers_include_both_directions() {
        let engine = engine(vec![host_rule("100.64.0.1/32", "100.64.0.2/32")]);
        let web = node(1, &["100.64.0.1"]);
        let db = node(2, &["100.64.0.2"]);
        let other = node(3, &["100.64.0.3"]);
        let all = vec![web.clone(), db.clone(), other.clone()];

        let from_web = engine.reachable_from(&web, &all);
        assert_eq!(from_web.len(), 1);
        assert_eq!(from_web[0].id(), db.id());

        // db cannot reach web, but still needs web as a peer to answer it
        assert!(engine.reachable_from(&db, &all).is_empty());
        let db_peers = engine.visible_peers(&db, &all);
        assert_eq!(db_peers.len(), 1);
        assert_eq!(db_peers[0].id(), web.id());

        assert!(engine.visible_peers(&other, &all).is_empty());
    }

    #[test]
    fn test_reachability_matrix() {
        let engine = engine(vec![host_rule("100.64.0.1/32", "*")]);
        let nodes = vec![
            node(1, &["100.64.0.1"]),
            node(2, &["100.64.0.2"]),
            node(3, &["100.64.0.3"]),
        ];

        let matrix = engine.reachability_matrix(&nodes);
        assert_eq!(
            matrix,
            vec![
                vec![false, true, true],
                vec![false, false, false],
                vec![false, false, false],
            ]
        );
    }

    #[test]
    fn test_peer_map() {
        let engine = engine(vec![host_rule("100.64.0.1/32", "100.64.0.2/32")]);
        let nodes = vec![
            node(1, &["100.64.0.1"]),
            node(2, &["100.64.0.2"]),
            node(3, &["100.64.0.3"]),
        ];

        let peers = engine.peer_map(&nodes);
        assert_eq!(peers[&NodeId(1)], vec![NodeId(2)]);
        assert_eq!(peers[&NodeId(2)], vec![NodeId(1)]);
        assert!(peers[&NodeId(3)].is_empty());
    }

    #[test]
    fn test_clone_shares_rules() {
        let engine = engine(vec![FilterRule::allow_all()]);
        let cloned = engine.clone();
        assert!(std::ptr::eq(engine.rules(), cloned.rules()));
    }
}
