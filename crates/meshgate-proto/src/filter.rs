//! packet filter rule types (matches tailscale's tailcfg.FilterRule).

use serde::{Deserialize, Deserializer, Serialize};

/// the pattern string matching every address of every family.
pub const WILDCARD: &str = "*";

/// a packet filter rule.
///
/// a rule authorizes traffic from any address matching one of `src_ips` to
/// any address and port matching one of `dst_ports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct FilterRule {
    /// source cidrs (or "*" for all).
    #[serde(rename = "SrcIPs", deserialize_with = "null_as_empty")]
    pub src_ips: Vec<String>,

    /// destination port ranges.
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub dst_ports: Vec<NetPortRange>,

    /// ip protocol numbers to match.
    ///
    /// empty means tcp, udp, and icmp (the client default). carried through
    /// untouched; host reachability does not look at it.
    #[serde(
        rename = "IPProto",
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub ip_proto: Vec<i32>,
}

/// go encodes nil slices as `null`; read those as empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl FilterRule {
    /// create a rule from source patterns and destination descriptors.
    pub fn new(src_ips: Vec<String>, dst_ports: Vec<NetPortRange>) -> Self {
        Self {
            src_ips,
            dst_ports,
            ip_proto: vec![],
        }
    }

    /// a rule letting every address reach every address on every port.
    pub fn allow_all() -> Self {
        Self::new(
            vec![WILDCARD.to_string()],
            vec![NetPortRange::new(WILDCARD, PortRange::any())],
        )
    }
}

/// a port range (matches tailscale's tailcfg.PortRange).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct PortRange {
    /// first port in range.
    pub first: u16,
    /// last port in range (inclusive).
    pub last: u16,
}

impl PortRange {
    /// create a port range from inclusive bounds.
    pub fn new(first: u16, last: u16) -> Self {
        Self { first, last }
    }

    /// create a port range for a single port.
    pub fn single(port: u16) -> Self {
        Self {
            first: port,
            last: port,
        }
    }

    /// create a port range for all ports.
    pub fn any() -> Self {
        Self {
            first: 0,
            last: 65535,
        }
    }

    /// true if this is the "all ports" sentinel.
    pub fn is_any(&self) -> bool {
        *self == Self::any()
    }

    /// true if `port` lies within the inclusive bounds.
    pub fn contains(&self, port: u16) -> bool {
        self.first <= port && port <= self.last
    }
}

/// a network port range for filter rules (matches tailscale's tailcfg.NetPortRange).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct NetPortRange {
    /// destination pattern ("*" or a cidr literal).
    #[serde(rename = "IP")]
    pub ip: String,

    /// port range.
    pub ports: PortRange,
}

impl NetPortRange {
    /// pair a destination pattern with a port range.
    pub fn new(ip: impl Into<String>, ports: PortRange) -> Self {
        Self {
            ip: ip.into(),
            ports,
        }
    }
}
