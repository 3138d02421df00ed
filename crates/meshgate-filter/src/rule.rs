//! compiled filter rules.
//!
//! a [`CompiledRule`] is a wire [`FilterRule`] with its patterns parsed and
//! port ranges validated, so evaluation never touches strings.

use meshgate_proto::{FilterRule, NetPortRange, PortRange};
use meshgate_types::NodeAddresses;

use crate::error::ParseError;
use crate::pattern::Pattern;

/// the ports a destination descriptor covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortMatch {
    /// every port (the wire `0-65535` sentinel).
    Any,
    /// inclusive port range.
    Range {
        /// first allowed port.
        first: u16,
        /// last allowed port.
        last: u16,
    },
}

impl PortMatch {
    /// validate a wire port range.
    pub fn compile(ports: &PortRange) -> Result<Self, ParseError> {
        if ports.is_any() {
            return Ok(PortMatch::Any);
        }
        if ports.first > ports.last {
            return Err(ParseError::InvalidPortRange {
                first: ports.first,
                last: ports.last,
            });
        }
        Ok(PortMatch::Range {
            first: ports.first,
            last: ports.last,
        })
    }

    /// check if `port` is covered.
    pub fn allows(&self, port: u16) -> bool {
        match self {
            PortMatch::Any => true,
            PortMatch::Range { first, last } => *first <= port && port <= *last,
        }
    }
}

/// one destination descriptor: a pattern plus the ports it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// which destination addresses the descriptor covers.
    pub pattern: Pattern,
    /// which ports on those addresses it opens.
    pub ports: PortMatch,
}

impl Destination {
    /// parse a wire destination descriptor.
    pub fn compile(dst: &NetPortRange) -> Result<Self, ParseError> {
        Ok(Self {
            pattern: Pattern::parse(&dst.ip)?,
            ports: PortMatch::compile(&dst.ports)?,
        })
    }
}

/// a filter rule ready for evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    /// source patterns, in wire order.
    pub src: Vec<Pattern>,
    /// destination descriptors, in wire order.
    pub dst: Vec<Destination>,
}

impl CompiledRule {
    /// parse every pattern and port range of a wire rule.
    ///
    /// fails on the first malformed entry; nothing is skipped.
    pub fn compile(rule: &FilterRule) -> Result<Self, ParseError> {
        let src = rule
            .src_ips
            .iter()
            .map(|s| Pattern::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        let dst = rule
            .dst_ports
            .iter()
            .map(Destination::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { src, dst })
    }

    /// check if any source address matches any source pattern.
    pub fn matches_source(&self, addrs: &NodeAddresses) -> bool {
        addrs
            .iter()
            .any(|addr| self.src.iter().any(|p| p.matches(addr)))
    }

    /// check if any destination address matches any destination pattern.
    ///
    /// port ranges are ignored.
    pub fn matches_destination(&self, addrs: &NodeAddresses) -> bool {
        addrs
            .iter()
            .any(|addr| self.dst.iter().any(|d| d.pattern.matches(addr)))
    }

    /// like [`matches_destination`](Self::matches_destination), but the
    /// matching descriptor must also cover `port`.
    pub fn matches_destination_port(&self, addrs: &NodeAddresses, port: u16) -> bool {
        addrs.iter().any(|addr| {
            self.dst
                .iter()
                .any(|d| d.ports.allows(port) && d.pattern.matches(addr))
        })
    }

    /// check if this rule lets `src` reach `dst`, ignoring ports.
    pub fn authorizes(&self, src: &NodeAddresses, dst: &NodeAddresses) -> bool {
        self.matches_source(src) && self.matches_destination(dst)
    }

    /// check if this rule lets `src` reach `dst` on `port`.
    pub fn authorizes_port(&self, src: &NodeAddresses, dst: &NodeAddresses, port: u16) -> bool {
        self.matches_source(src) && self.matches_destination_port(dst, port)
    }
}
