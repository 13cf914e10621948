//! The object registry: sole owner of every object in a project graph.
//!
//! # Identity
//!
//! Identifiers are minted here and nowhere else. An [`IdSource`] proposes
//! candidates; the registry rejects any candidate already held by a live
//! object (or by a phase checked out through [`ObjectRegistry::update_phase`])
//! and retries up to [`RegistryConfig::max_mint_attempts`] times.
//!
//! # Snapshot
//!
//! [`ObjectRegistry::to_yaml`] / [`ObjectRegistry::from_yaml`] render the
//! logical object shape:
//!
//! ```text
//! objects:
//!   <id>:
//!     isa: PBXSourcesBuildPhase
//!     buildActionMask: '2147483647'
//!     files: [<build file id>, ...]
//!     runOnlyForDeploymentPostprocessing: '0'
//! ```
//!
//! The registry assumes a single writer; callers serialize access.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::ids::{IdSource, RandomIds};
use crate::phase::{BuildPhase, Insertion};
use crate::types::{BuildFile, FileReference, Object, ObjectId};

// ---------------------------------------------------------------------------
// 1. Configuration
// ---------------------------------------------------------------------------

/// Tunables for an [`ObjectRegistry`]. Deserializable so hosts can embed it
/// in their own configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How many candidates to try before giving up. Zero is treated as one.
    pub max_mint_attempts: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_mint_attempts: 16 }
    }
}

// ---------------------------------------------------------------------------
// 2. Registry
// ---------------------------------------------------------------------------

pub struct ObjectRegistry {
    objects: BTreeMap<ObjectId, Object>,
    checked_out: BTreeSet<ObjectId>,
    ids: Box<dyn IdSource>,
    config: RegistryConfig,
}

impl fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("objects", &self.objects)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry {
    /// Empty registry minting random identifiers.
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            checked_out: BTreeSet::new(),
            ids: Box::new(RandomIds),
            config: RegistryConfig::default(),
        }
    }

    /// Replace the identifier source.
    pub fn with_ids(mut self, ids: impl IdSource + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn with_config(mut self, config: RegistryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// All objects in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &Object)> {
        self.objects.iter()
    }

    // -----------------------------------------------------------------------
    // Insert / remove
    // -----------------------------------------------------------------------

    /// Register `obj` under a freshly minted identifier.
    pub fn add_object(&mut self, obj: impl Into<Object>) -> Result<ObjectId, GraphError> {
        let id = self.mint()?;
        self.objects.insert(id.clone(), obj.into());
        Ok(id)
    }

    pub fn add_file_reference(&mut self, file_ref: FileReference) -> Result<ObjectId, GraphError> {
        self.add_object(file_ref)
    }

    /// Remove and return the object under `id`. Referents are not updated.
    pub fn remove_object(&mut self, id: &ObjectId) -> Option<Object> {
        self.objects.remove(id)
    }

    fn mint(&mut self) -> Result<ObjectId, GraphError> {
        let attempts = self.config.max_mint_attempts.max(1);
        for attempt in 1..=attempts {
            let candidate = self.ids.next_id();
            if !self.objects.contains_key(&candidate) && !self.checked_out.contains(&candidate) {
                return Ok(candidate);
            }
            tracing::trace!(id = %candidate, attempt, "identifier collision, retrying");
        }
        Err(GraphError::IdExhausted { attempts })
    }

    // -----------------------------------------------------------------------
    // Resolve
    // -----------------------------------------------------------------------

    /// The live object for `id`.
    pub fn resolve(&self, id: &ObjectId) -> Result<&Object, GraphError> {
        self.objects
            .get(id)
            .ok_or_else(|| GraphError::DanglingReference { id: id.clone() })
    }

    pub fn file_reference(&self, id: &ObjectId) -> Result<&FileReference, GraphError> {
        match self.resolve(id)? {
            Object::FileReference(f) => Ok(f),
            other => Err(unexpected(id, "PBXFileReference", other)),
        }
    }

    pub fn build_file_object(&self, id: &ObjectId) -> Result<&BuildFile, GraphError> {
        match self.resolve(id)? {
            Object::BuildFile(b) => Ok(b),
            other => Err(unexpected(id, "PBXBuildFile", other)),
        }
    }

    pub fn build_phase(&self, id: &ObjectId) -> Result<&BuildPhase, GraphError> {
        match self.resolve(id)? {
            Object::BuildPhase(p) => Ok(p),
            other => Err(unexpected(id, "build phase", other)),
        }
    }

    /// Verify every phase member and every build file's `fileRef` resolves
    /// to an object of the right kind. Reports the first fault found.
    pub fn check_references(&self) -> Result<(), GraphError> {
        for obj in self.objects.values() {
            match obj {
                Object::BuildFile(b) => {
                    self.file_reference(&b.file_ref)?;
                }
                Object::BuildPhase(p) => {
                    for id in p.files() {
                        self.build_file_object(id)?;
                    }
                }
                Object::FileReference(_) => {}
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Registered phases
    // -----------------------------------------------------------------------

    /// Run `f` against the registered phase `id` with mutable access to the
    /// rest of the registry.
    ///
    /// While `f` runs the phase itself does not resolve through the registry,
    /// but its identifier stays reserved.
    pub fn update_phase<R>(
        &mut self,
        id: &ObjectId,
        f: impl FnOnce(&mut BuildPhase, &mut ObjectRegistry) -> Result<R, GraphError>,
    ) -> Result<R, GraphError> {
        let mut phase = match self.objects.remove(id) {
            Some(Object::BuildPhase(p)) => p,
            Some(other) => {
                let err = unexpected(id, "build phase", &other);
                self.objects.insert(id.clone(), other);
                return Err(err);
            }
            None => return Err(GraphError::DanglingReference { id: id.clone() }),
        };

        self.checked_out.insert(id.clone());
        let result = f(&mut phase, self);
        self.checked_out.remove(id);
        self.objects.insert(id.clone(), Object::BuildPhase(phase));
        result
    }

    /// [`BuildPhase::add_build_file`] on a registered phase.
    pub fn add_build_file_to(
        &mut self,
        phase: &ObjectId,
        file_ref: &ObjectId,
    ) -> Result<Insertion, GraphError> {
        self.update_phase(phase, |p, reg| p.add_build_file(reg, file_ref))
    }

    /// [`BuildPhase::add_build_file_without_arc`] on a registered phase.
    pub fn add_build_file_without_arc_to(
        &mut self,
        phase: &ObjectId,
        file_ref: &ObjectId,
    ) -> Result<Insertion, GraphError> {
        self.update_phase(phase, |p, reg| p.add_build_file_without_arc(reg, file_ref))
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    pub fn to_yaml(&self) -> Result<String, GraphError> {
        Ok(serde_yaml::to_string(&SnapshotRef { objects: &self.objects })?)
    }

    /// Load a snapshot into a fresh registry minting random identifiers.
    /// References are not checked; call [`check_references`](Self::check_references).
    pub fn from_yaml(yaml: &str) -> Result<Self, GraphError> {
        let snapshot: Snapshot = serde_yaml::from_str(yaml)?;
        let mut registry = Self::new();
        registry.objects = snapshot.objects;
        Ok(registry)
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    objects: &'a BTreeMap<ObjectId, Object>,
}

#[derive(Deserialize)]
struct Snapshot {
    #[serde(default)]
    objects: BTreeMap<ObjectId, Object>,
}

fn unexpected(id: &ObjectId, expected: &'static str, found: &Object) -> GraphError {
    GraphError::UnexpectedKind { id: id.clone(), expected, found: found.isa() }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
