//! core types for meshgate - the access-control core of a mesh
//! coordination server.
//!
//! this crate provides the data structures shared by the other crates:
//! - [`NodeAddresses`]: a node's overlay addresses and their canonical order
//! - [`Node`]: a mesh participant
//! - [`Config`]: configuration for the access core

mod addresses;
mod config;
mod error;
mod node;
pub mod test_utils;

pub use addresses::NodeAddresses;
pub use config::{Config, DuplicateAddresses, MAX_POLICY_SIZE};
pub use error::Error;
pub use node::{Node, NodeBuilder, NodeId};

/// result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;
