//! pbxgraph core library — the build-phase object model of a native project file.
//!
//! Public API surface:
//! - [`types`] — identifiers, file references, build files, [`Object`]
//! - [`phase`] — [`BuildPhase`] factories, lookup, idempotent insertion
//! - [`registry`] — [`ObjectRegistry`], the identifier-minting object store
//! - [`ids`] — [`IdSource`] implementations
//! - [`error`] — [`GraphError`]

pub mod error;
pub mod ids;
pub mod phase;
pub mod registry;
pub mod types;

pub use error::GraphError;
pub use ids::{IdSource, RandomIds, SequentialIds};
pub use phase::{BuildPhase, Insertion, PhaseEntry, PhaseKind};
pub use registry::{ObjectRegistry, RegistryConfig};
pub use types::{identity_key, BuildFile, FileReference, Object, ObjectId, Settings};
