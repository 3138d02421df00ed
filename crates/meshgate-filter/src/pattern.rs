//! address patterns used in the source and destination fields of rules.

use std::net::IpAddr;

use ipnet::IpNet;
use meshgate_proto::WILDCARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::error::ParseError;

/// a pre-parsed address pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// `*` - matches every address of every family.
    Wildcard,
    /// cidr literal (e.g., "100.64.0.0/10", "fd7a:115c:a1e0::/48").
    ///
    /// host bits are kept as written; matching masks both sides.
    Network(IpNet),
}

impl Pattern {
    /// parse a pattern from its wire form.
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        if s == WILDCARD {
            return Ok(Pattern::Wildcard);
        }
        s.parse::<IpNet>()
            .map(Pattern::Network)
            .map_err(|_| ParseError::InvalidPattern(s.to_string()))
    }

    /// check if `addr` satisfies this pattern.
    ///
    /// a network only matches addresses of its own family.
    pub fn matches(&self, addr: &IpAddr) -> bool {
        match self {
            Pattern::Wildcard => true,
            Pattern::Network(net) => net.contains(addr),
        }
    }

    /// true for the wildcard pattern.
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Pattern::Wildcard)
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Wildcard => f.write_str(WILDCARD),
            Pattern::Network(net) => write!(f, "{net}"),
        }
    }
}

impl std::str::FromStr for Pattern {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::parse(s)
    }
}

impl Serialize for Pattern {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Pattern::parse(&s).map_err(de::Error::custom)
    }
}
