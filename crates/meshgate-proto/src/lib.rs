//! coordination protocol wire types for meshgate.
//!
//! these mirror the packet filter structures of the tailscale control
//! protocol (`tailcfg.FilterRule` and friends) so rule lists round-trip
//! unchanged between the policy compiler, this core, and clients.

#![warn(missing_docs)]

mod filter;

pub use filter::{FilterRule, NetPortRange, PortRange, WILDCARD};
