//! state management for meshgate
//!
//! holds the in-memory node cache and the peer lists derived from it:
//! - nodestore with copy-on-write semantics
//! - peer maps recomputed through the access evaluator whenever nodes or
//!   policy change
//!
//! persistence and transport live elsewhere; this crate only keeps the
//! current view consistent with the active rules.

mod error;
mod node_store;

pub use error::Error;
pub use node_store::{NodeStore, PeerView};

/// result type for state operations
pub type Result<T> = std::result::Result<T, Error>;
