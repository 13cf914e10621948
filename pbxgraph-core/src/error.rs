//! Error types for pbxgraph-core.

use thiserror::Error;

use crate::types::ObjectId;

/// All errors that can arise from object-graph operations.
///
/// Lookups that simply find nothing return `None`; every variant here is
/// either a corrupted graph or a refused mutation.
#[derive(Debug, Error)]
pub enum GraphError {
    /// An identifier held by some object does not resolve in the registry.
    #[error("dangling reference: object {id} is not in the registry")]
    DanglingReference { id: ObjectId },

    /// An identifier resolved, but to an object of the wrong kind.
    #[error("object {id} is a {found}, expected a {expected}")]
    UnexpectedKind {
        id: ObjectId,
        expected: &'static str,
        found: &'static str,
    },

    /// The identifier source kept producing identifiers already in use.
    #[error("could not mint a fresh identifier after {attempts} attempts")]
    IdExhausted { attempts: u32 },

    /// A file reference carries neither a name nor a path.
    #[error("file reference {id} has neither a name nor a path")]
    MissingIdentity { id: ObjectId },

    /// YAML snapshot render/parse error.
    #[error("YAML snapshot error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
