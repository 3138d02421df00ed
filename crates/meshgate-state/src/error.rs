//! state management error types

use meshgate_types::NodeId;
use thiserror::Error;

/// errors that can occur in state operations
#[derive(Debug, Error)]
pub enum Error {
    /// node rejected by validation
    #[error("invalid node: {0}")]
    InvalidNode(#[from] meshgate_types::Error),

    /// rule list rejected; the previous policy stays active
    #[error("policy error: {0}")]
    Policy(#[from] meshgate_filter::Error),

    /// node not found
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// reload requested but no policy file is configured
    #[error("no policy file configured for reload")]
    NoPolicyPath,
}
