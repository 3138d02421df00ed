//! filter rule evaluation for meshgate.
//!
//! this crate decides whether one node may send traffic to another under a
//! compiled packet filter rule list. evaluation is deny-by-default: a pair
//! is reachable only if some rule names a source address of the sender and
//! a destination address of the receiver. rules combine as a union.

#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod handle;
pub mod matcher;
pub mod pattern;
pub mod rule;
pub mod rule_set;

pub use engine::AccessEvaluator;
pub use error::{Error, ParseError, Result};
pub use handle::{PolicyHandle, PolicySnapshot};
pub use matcher::{address_matches, can_access_rules, can_access_rules_port, port_matches};
pub use pattern::Pattern;
pub use rule::{CompiledRule, Destination, PortMatch};
pub use rule_set::RuleSet;
