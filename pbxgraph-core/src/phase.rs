//! Build phases: ordered, typed membership lists of build files.
//!
//! A phase holds only [`ObjectId`]s of [`BuildFile`]s. Every lookup goes
//! phase → build file → file reference through the registry, and a link
//! that fails to resolve is returned as an error rather than skipped, so
//! compile and link order is never silently altered.
//!
//! Insertion is idempotent per file identity ([`identity_key`]): adding a
//! file that is already present leaves the phase and registry untouched.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::registry::ObjectRegistry;
use crate::types::{
    identity_key, BuildFile, FileReference, ObjectId, Settings, COMPILER_FLAGS, NO_OBJC_ARC_FLAG,
};

/// `buildActionMask` written for every phase (all build actions).
pub const BUILD_ACTION_MASK: &str = "2147483647";

/// `runOnlyForDeploymentPostprocessing` written for every phase.
pub const RUN_ONLY_FOR_DEPLOYMENT_POSTPROCESSING: &str = "0";

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// Which stage of the build a phase represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Link against frameworks and libraries.
    Frameworks,
    /// Compile source files.
    Sources,
    /// Copy bundle resources.
    Resources,
    /// Install public/private headers.
    Headers,
}

impl PhaseKind {
    pub fn isa(self) -> &'static str {
        match self {
            PhaseKind::Frameworks => "PBXFrameworksBuildPhase",
            PhaseKind::Sources => "PBXSourcesBuildPhase",
            PhaseKind::Resources => "PBXResourcesBuildPhase",
            PhaseKind::Headers => "PBXHeadersBuildPhase",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.isa())
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Serialized fields shared by every phase kind; the kind travels as `isa`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PhaseBody {
    build_action_mask: String,
    #[serde(default)]
    files: Vec<ObjectId>,
    run_only_for_deployment_postprocessing: String,
}

/// An ordered collection of build files of one [`PhaseKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPhase {
    kind: PhaseKind,
    build_action_mask: String,
    files: Vec<ObjectId>,
    run_only_for_deployment_postprocessing: String,
}

/// Outcome of adding a file to a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// A new build file was registered and appended.
    Added(ObjectId),
    /// A file with the same identity was already a member; nothing changed.
    AlreadyPresent,
}

impl Insertion {
    pub fn is_added(&self) -> bool {
        matches!(self, Insertion::Added(_))
    }

    /// The new build file's identifier, if one was created.
    pub fn build_file_id(&self) -> Option<&ObjectId> {
        match self {
            Insertion::Added(id) => Some(id),
            Insertion::AlreadyPresent => None,
        }
    }
}

/// One dereferenced member of a phase.
#[derive(Debug, Clone, Copy)]
pub struct PhaseEntry<'r> {
    pub build_file_id: &'r ObjectId,
    pub build_file: &'r BuildFile,
    pub file_ref: &'r FileReference,
}

impl BuildPhase {
    /// A new, empty phase of `kind` with the fixed metadata.
    pub fn new(kind: PhaseKind) -> Self {
        Self {
            kind,
            build_action_mask: BUILD_ACTION_MASK.to_owned(),
            files: Vec::new(),
            run_only_for_deployment_postprocessing: RUN_ONLY_FOR_DEPLOYMENT_POSTPROCESSING
                .to_owned(),
        }
    }

    pub fn framework() -> Self {
        Self::new(PhaseKind::Frameworks)
    }

    pub fn sources() -> Self {
        Self::new(PhaseKind::Sources)
    }

    pub fn resources() -> Self {
        Self::new(PhaseKind::Resources)
    }

    pub fn headers() -> Self {
        Self::new(PhaseKind::Headers)
    }

    pub(crate) fn from_parts(kind: PhaseKind, body: PhaseBody) -> Self {
        Self {
            kind,
            build_action_mask: body.build_action_mask,
            files: body.files,
            run_only_for_deployment_postprocessing: body.run_only_for_deployment_postprocessing,
        }
    }

    pub(crate) fn into_parts(self) -> (PhaseKind, PhaseBody) {
        (
            self.kind,
            PhaseBody {
                build_action_mask: self.build_action_mask,
                files: self.files,
                run_only_for_deployment_postprocessing: self.run_only_for_deployment_postprocessing,
            },
        )
    }

    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    pub fn isa(&self) -> &'static str {
        self.kind.isa()
    }

    pub fn build_action_mask(&self) -> &str {
        &self.build_action_mask
    }

    pub fn run_only_for_deployment_postprocessing(&self) -> &str {
        &self.run_only_for_deployment_postprocessing
    }

    /// Build file identifiers in insertion order.
    pub fn files(&self) -> &[ObjectId] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    // -----------------------------------------------------------------------
    // Dereferencing
    // -----------------------------------------------------------------------

    /// Every member dereferenced, in `files` order.
    pub fn entries<'r>(
        &'r self,
        registry: &'r ObjectRegistry,
    ) -> Result<Vec<PhaseEntry<'r>>, GraphError> {
        self.files.iter().map(|id| resolve_entry(registry, id)).collect()
    }

    /// The file reference behind each member, in `files` order.
    pub fn build_files<'r>(
        &'r self,
        registry: &'r ObjectRegistry,
    ) -> Result<Vec<&'r FileReference>, GraphError> {
        self.files
            .iter()
            .map(|id| resolve_entry(registry, id).map(|entry| entry.file_ref))
            .collect()
    }

    /// First member whose name or path equals `query`.
    ///
    /// Members are resolved in order up to the match; a dangling link before
    /// the match is an error.
    pub fn build_file<'r>(
        &'r self,
        registry: &'r ObjectRegistry,
        query: &str,
    ) -> Result<Option<&'r FileReference>, GraphError> {
        Ok(self.find_entry(registry, query)?.map(|(_, entry)| entry.file_ref))
    }

    pub fn contains_file(
        &self,
        registry: &ObjectRegistry,
        query: &str,
    ) -> Result<bool, GraphError> {
        Ok(self.find_entry(registry, query)?.is_some())
    }

    fn find_entry<'r>(
        &'r self,
        registry: &'r ObjectRegistry,
        query: &str,
    ) -> Result<Option<(usize, PhaseEntry<'r>)>, GraphError> {
        for (index, id) in self.files.iter().enumerate() {
            let entry = resolve_entry(registry, id)?;
            if entry.file_ref.matches(query) {
                return Ok(Some((index, entry)));
            }
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Attach the registered file reference `file_ref` to this phase.
    ///
    /// No-op when a member with the same identity already exists.
    pub fn add_build_file(
        &mut self,
        registry: &mut ObjectRegistry,
        file_ref: &ObjectId,
    ) -> Result<Insertion, GraphError> {
        self.add_build_file_with_settings(registry, file_ref, Settings::new())
    }

    /// Like [`add_build_file`](Self::add_build_file), but the new build file
    /// is compiled with ARC disabled.
    ///
    /// The flag is only set when this call performs the insertion; an
    /// existing member is left exactly as it was.
    pub fn add_build_file_without_arc(
        &mut self,
        registry: &mut ObjectRegistry,
        file_ref: &ObjectId,
    ) -> Result<Insertion, GraphError> {
        let mut settings = Settings::new();
        settings.insert(COMPILER_FLAGS.to_owned(), NO_OBJC_ARC_FLAG.to_owned());
        self.add_build_file_with_settings(registry, file_ref, settings)
    }

    /// Attach `file_ref` with per-file `settings`. Settings are ignored on
    /// the duplicate path.
    pub fn add_build_file_with_settings(
        &mut self,
        registry: &mut ObjectRegistry,
        file_ref: &ObjectId,
        settings: Settings,
    ) -> Result<Insertion, GraphError> {
        let key = {
            let file = registry.file_reference(file_ref)?;
            identity_key(file)
                .ok_or_else(|| GraphError::MissingIdentity { id: file_ref.clone() })?
                .to_owned()
        };

        if self.build_file(registry, &key)?.is_some() {
            tracing::debug!(phase = %self.kind, file = %key, "file already in phase, skipping");
            return Ok(Insertion::AlreadyPresent);
        }

        let id = registry.add_object(BuildFile::with_settings(file_ref.clone(), settings))?;
        self.files.push(id.clone());
        tracing::debug!(phase = %self.kind, file = %key, build_file = %id, "added build file");
        Ok(Insertion::Added(id))
    }

    /// Detach the first member matching `query` and delete its build file
    /// from the registry. The file reference itself stays registered.
    pub fn remove_build_file(
        &mut self,
        registry: &mut ObjectRegistry,
        query: &str,
    ) -> Result<Option<ObjectId>, GraphError> {
        let found = self
            .find_entry(registry, query)?
            .map(|(index, entry)| (index, entry.build_file_id.clone()));
        let Some((index, id)) = found else {
            return Ok(None);
        };

        self.files.remove(index);
        registry.remove_object(&id);
        tracing::debug!(phase = %self.kind, file = %query, build_file = %id, "removed build file");
        Ok(Some(id))
    }
}

fn resolve_entry<'r>(
    registry: &'r ObjectRegistry,
    id: &'r ObjectId,
) -> Result<PhaseEntry<'r>, GraphError> {
    let build_file = registry.build_file_object(id)?;
    let file_ref = registry.file_reference(&build_file.file_ref)?;
    Ok(PhaseEntry { build_file_id: id, build_file, file_ref })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    fn registry() -> ObjectRegistry {
        ObjectRegistry::new().with_ids(SequentialIds::new("T"))
    }

    #[test]
    fn factories_set_fixed_metadata() {
        let phase = BuildPhase::sources();
        assert_eq!(phase.kind(), PhaseKind::Sources);
        assert_eq!(phase.build_action_mask(), "2147483647");
        assert_eq!(phase.run_only_for_deployment_postprocessing(), "0");
        assert!(phase.is_empty());
    }

    #[test]
    fn add_appends_build_file_pointing_at_reference() {
        let mut reg = registry();
        let f = reg.add_file_reference(FileReference::named("A.m")).expect("add ref");
        let mut phase = BuildPhase::sources();

        let inserted = phase.add_build_file(&mut reg, &f).expect("add");
        let bf_id = inserted.build_file_id().expect("added").clone();

        assert_eq!(phase.files(), &[bf_id.clone()]);
        let bf = reg.build_file_object(&bf_id).expect("resolve");
        assert_eq!(bf.file_ref, f);
        assert!(bf.settings.is_empty());
    }

    #[test]
    fn duplicate_add_leaves_registry_untouched() {
        let mut reg = registry();
        let f = reg.add_file_reference(FileReference::named("A.m")).expect("add ref");
        let mut phase = BuildPhase::sources();
        phase.add_build_file(&mut reg, &f).expect("first");
        let objects_before = reg.len();

        let second = phase.add_build_file(&mut reg, &f).expect("second");
        assert_eq!(second, Insertion::AlreadyPresent);
        assert_eq!(reg.len(), objects_before);
        assert_eq!(phase.len(), 1);
    }

    #[test]
    fn file_without_identity_is_rejected() {
        let mut reg = registry();
        let f = reg.add_file_reference(FileReference::default()).expect("add ref");
        let mut phase = BuildPhase::resources();
        let err = phase.add_build_file(&mut reg, &f).unwrap_err();
        assert!(matches!(err, GraphError::MissingIdentity { .. }), "got: {err}");
        assert!(phase.is_empty());
    }

    #[test]
    fn adding_unregistered_reference_is_dangling() {
        let mut reg = registry();
        let mut phase = BuildPhase::framework();
        let err = phase.add_build_file(&mut reg, &ObjectId::from("NOPE")).unwrap_err();
        assert!(matches!(err, GraphError::DanglingReference { .. }), "got: {err}");
    }

    #[test]
    fn remove_detaches_and_deletes_build_file() {
        let mut reg = registry();
        let a = reg.add_file_reference(FileReference::named("A.m")).expect("a");
        let b = reg.add_file_reference(FileReference::named("B.m")).expect("b");
        let mut phase = BuildPhase::sources();
        let a_bf = phase.add_build_file(&mut reg, &a).expect("add a");
        phase.add_build_file(&mut reg, &b).expect("add b");

        let removed = phase.remove_build_file(&mut reg, "A.m").expect("remove");
        assert_eq!(removed.as_ref(), a_bf.build_file_id());
        assert!(!reg.contains(a_bf.build_file_id().expect("id")));
        assert!(reg.contains(&a), "file reference must stay registered");
        let names: Vec<_> = phase
            .build_files(&reg)
            .expect("deref")
            .into_iter()
            .map(|f| f.name.clone())
            .collect();
        assert_eq!(names, vec![Some("B.m".to_owned())]);
    }

    #[test]
    fn remove_missing_is_none() {
        let mut reg = registry();
        let mut phase = BuildPhase::headers();
        assert_eq!(phase.remove_build_file(&mut reg, "x.h").expect("remove"), None);
    }
}
