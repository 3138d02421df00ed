//! string-level matching against wire rules.
//!
//! these work directly on [`FilterRule`] values as received from the policy
//! compiler, parsing as they go. the evaluation loop in
//! [`AccessEvaluator`](crate::AccessEvaluator) uses pre-compiled rules
//! instead; both give the same answers.

use std::net::IpAddr;

use meshgate_proto::{FilterRule, PortRange};
use meshgate_types::NodeAddresses;

use crate::error::{Error, ParseError, Result};
use crate::pattern::Pattern;
use crate::rule::CompiledRule;

/// check whether `addr` satisfies the wire pattern `pattern`.
///
/// a malformed pattern is an error, never a match or a miss.
pub fn address_matches(addr: &IpAddr, pattern: &str) -> std::result::Result<bool, ParseError> {
    Pattern::parse(pattern).map(|p| p.matches(addr))
}

/// check whether `port` lies within `ports` (or `ports` is the any-port sentinel).
pub fn port_matches(port: u16, ports: &PortRange) -> bool {
    ports.is_any() || ports.contains(port)
}

/// decide whether `src` may reach `dst` under the wire rules `rules`.
///
/// rules are compiled one at a time in list order, and evaluation stops at
/// the first rule that authorizes the pair, so a malformed rule after that
/// point is not reported. validate a whole list with
/// [`RuleSet::compile`](crate::RuleSet::compile).
pub fn can_access_rules(
    src: &NodeAddresses,
    dst: &NodeAddresses,
    rules: &[FilterRule],
) -> Result<bool> {
    for (index, rule) in rules.iter().enumerate() {
        let compiled =
            CompiledRule::compile(rule).map_err(|cause| Error::InvalidRule { index, cause })?;
        if compiled.authorizes(src, dst) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// port-aware variant of [`can_access_rules`].
pub fn can_access_rules_port(
    src: &NodeAddresses,
    dst: &NodeAddresses,
    port: u16,
    rules: &[FilterRule],
) -> Result<bool> {
    for (index, rule) in rules.iter().enumerate() {
        let compiled =
            CompiledRule::compile(rule).map_err(|cause| Error::InvalidRule { index, cause })?;
        if compiled.authorizes_port(src, dst, port) {
            return Ok(true);
        }
    }
    Ok(false)
}
