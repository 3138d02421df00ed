//! error types for meshgate-types

use std::net::IpAddr;

use thiserror::Error;

/// errors that can occur in meshgate-types
#[derive(Debug, Error)]
pub enum Error {
    /// node lists the same address more than once
    #[error("duplicate node address: {0}")]
    DuplicateAddress(IpAddr),

    /// configuration error
    #[error("configuration error: {0}")]
    Config(String),
}
