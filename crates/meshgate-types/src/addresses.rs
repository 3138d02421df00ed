//! a node's overlay addresses and their canonical ordering.
//!
//! clients expect peer addresses in a stable order: every ipv4 address
//! before every ipv6 address, ascending within each family. `IpAddr`'s
//! `Ord` already orders `V4` before `V6` and compares numerically within a
//! family, so the canonical form is just a sorted, deduplicated copy.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// the overlay addresses assigned to a single node.
///
/// the stored sequence keeps whatever order it was built in; use
/// [`NodeAddresses::canonical`] or [`NodeAddresses::to_strings`] for the
/// order sent to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeAddresses(Vec<IpAddr>);

impl NodeAddresses {
    /// create an address set from addresses in any order.
    pub fn new(addrs: Vec<IpAddr>) -> Self {
        Self(addrs)
    }

    /// an address set with no addresses (a node that was just registered).
    pub fn empty() -> Self {
        Self::default()
    }

    /// append an address.
    pub fn push(&mut self, addr: IpAddr) {
        self.0.push(addr);
    }

    /// number of stored addresses, duplicates included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// true if the node has no addresses.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// iterate addresses in stored order.
    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.0.iter()
    }

    /// the addresses in stored order.
    pub fn as_slice(&self) -> &[IpAddr] {
        &self.0
    }

    /// true if `addr` is one of this node's addresses.
    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.0.contains(addr)
    }

    /// first address that appears more than once, if any.
    pub fn first_duplicate(&self) -> Option<IpAddr> {
        let mut sorted = self.0.clone();
        sorted.sort_unstable();
        sorted.windows(2).find(|w| w[0] == w[1]).map(|w| w[0])
    }

    /// the canonical ordering: ipv4 first, then ipv6, ascending, unique.
    ///
    /// does not modify the stored sequence.
    pub fn canonical(&self) -> Vec<IpAddr> {
        let mut addrs = self.0.clone();
        addrs.sort_unstable();
        addrs.dedup();
        addrs
    }

    /// canonical text form of every address, in canonical order.
    pub fn to_strings(&self) -> Vec<String> {
        self.canonical().iter().map(IpAddr::to_string).collect()
    }

    /// the first ipv4 address in canonical order.
    pub fn ipv4(&self) -> Option<IpAddr> {
        self.canonical().into_iter().find(IpAddr::is_ipv4)
    }

    /// the first ipv6 address in canonical order.
    pub fn ipv6(&self) -> Option<IpAddr> {
        self.canonical().into_iter().find(IpAddr::is_ipv6)
    }

    /// replace the stored sequence with its canonical form.
    pub fn canonicalize(&mut self) {
        self.0.sort_unstable();
        self.0.dedup();
    }
}

impl From<Vec<IpAddr>> for NodeAddresses {
    fn from(addrs: Vec<IpAddr>) -> Self {
        Self(addrs)
    }
}

impl FromIterator<IpAddr> for NodeAddresses {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a NodeAddresses {
    type Item = &'a IpAddr;
    type IntoIter = std::slice::Iter<'a, IpAddr>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for NodeAddresses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_strings().join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs(list: &[&str]) -> NodeAddresses {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_canonical_order_v4_before_v6() {
        let set = addrs(&["2001:db8::2", "100.64.0.2", "2001:db8::1", "100.64.0.1"]);

        assert_eq!(
            set.to_strings(),
            vec!["100.64.0.1", "100.64.0.2", "2001:db8::1", "2001:db8::2"]
        );
    }

    #[test]
    fn test_to_strings_does_not_mutate() {
        let set = addrs(&["2001:db8::2", "100.64.0.2"]);
        let before = set.clone();

        let _ = set.to_strings();

        assert_eq!(set, before);
        assert_eq!(set.as_slice()[0], "2001:db8::2".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_numeric_not_lexical_order() {
        // lexical order would put 100.64.0.10 before 100.64.0.9
        let set = addrs(&["100.64.0.10", "100.64.0.9"]);
        assert_eq!(set.to_strings(), vec!["100.64.0.9", "100.64.0.10"]);
    }

    #[test]
    fn test_canonical_dedups() {
        let set = addrs(&["100.64.0.1", "fd7a:115c:a1e0::1", "100.64.0.1"]);

        assert_eq!(set.len(), 3);
        assert_eq!(set.canonical().len(), 2);
        assert_eq!(
            set.first_duplicate(),
            Some("100.64.0.1".parse().unwrap())
        );
    }

    #[test]
    fn test_no_duplicate() {
        let set = addrs(&["100.64.0.1", "100.64.0.2"]);
        assert_eq!(set.first_duplicate(), None);
    }

    #[test]
    fn test_empty_set() {
        let set = NodeAddresses::empty();
        assert!(set.is_empty());
        assert!(set.to_strings().is_empty());
        assert_eq!(set.ipv4(), None);
        assert_eq!(set.ipv6(), None);
    }

    #[test]
    fn test_family_accessors() {
        let set = addrs(&["fd7a:115c:a1e0::5", "100.64.0.7"]);
        assert_eq!(set.ipv4(), Some("100.64.0.7".parse().unwrap()));
        assert_eq!(set.ipv6(), Some("fd7a:115c:a1e0::5".parse().unwrap()));
    }

    #[test]
    fn test_display() {
        let set = addrs(&["2001:db8::1", "100.64.0.1"]);
        assert_eq!(set.to_string(), "100.64.0.1,2001:db8::1");
    }

    #[test]
    fn test_serde_transparent() {
        let set = addrs(&["100.64.0.1", "2001:db8::1"]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["100.64.0.1","2001:db8::1"]"#);

        let parsed: NodeAddresses = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, set);
    }
}

#[cfg(test)]
mod proptests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;
    use proptest::prelude::*;

    fn addr_strategy() -> impl Strategy<Value = IpAddr> {
        prop_oneof![
            any::<u32>().prop_map(|n| IpAddr::V4(Ipv4Addr::from(n))),
            any::<u128>().prop_map(|n| IpAddr::V6(Ipv6Addr::from(n))),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn canonical_is_idempotent(list in prop::collection::vec(addr_strategy(), 0..16)) {
            let once = NodeAddresses::new(list).canonical();
            let twice = NodeAddresses::new(once.clone()).canonical();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn canonical_puts_v4_first(list in prop::collection::vec(addr_strategy(), 0..16)) {
            let canonical = NodeAddresses::new(list).canonical();
            if let Some(first_v6) = canonical.iter().position(IpAddr::is_ipv6) {
                prop_assert!(canonical[first_v6..].iter().all(IpAddr::is_ipv6));
            }
            prop_assert!(canonical.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn canonical_keeps_every_address(list in prop::collection::vec(addr_strategy(), 0..16)) {
            let set = NodeAddresses::new(list.clone());
            let canonical = set.canonical();
            prop_assert!(list.iter().all(|a| canonical.contains(a)));
        }
    }
}
