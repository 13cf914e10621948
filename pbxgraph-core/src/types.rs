//! Domain types for the project object graph.
//!
//! Objects never hold each other directly; every cross-object link is an
//! [`ObjectId`] resolved through the [`ObjectRegistry`](crate::ObjectRegistry).
//! All types serialize to the logical shape a project-file writer reads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::phase::{BuildPhase, PhaseBody, PhaseKind};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// An opaque identifier minted by the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ObjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ObjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Per-file build settings, e.g. `COMPILER_FLAGS`.
pub type Settings = BTreeMap<String, String>;

/// Settings key carrying extra compiler flags for a single file.
pub const COMPILER_FLAGS: &str = "COMPILER_FLAGS";

/// Compiler flag that turns off automatic reference counting for one file.
pub const NO_OBJC_ARC_FLAG: &str = "-fno-objc-arc";

// ---------------------------------------------------------------------------
// Leaf entities
// ---------------------------------------------------------------------------

/// One file known to the project.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl FileReference {
    /// A reference known by display name only.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), path: None }
    }

    /// A reference known by path only.
    pub fn at_path(path: impl Into<String>) -> Self {
        Self { name: None, path: Some(path.into()) }
    }

    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self { name: Some(name.into()), path: Some(path.into()) }
    }

    /// True when `query` equals either the name or the path.
    pub fn matches(&self, query: &str) -> bool {
        self.name.as_deref() == Some(query) || self.path.as_deref() == Some(query)
    }
}

/// The lookup key for a file reference: its name, or its path when unnamed.
pub fn identity_key(file_ref: &FileReference) -> Option<&str> {
    file_ref.name.as_deref().or(file_ref.path.as_deref())
}

/// Join entity attaching one [`FileReference`] to a build phase.
///
/// The owning phase's `files` list is authoritative; a build file does not
/// know which phase holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFile {
    #[serde(rename = "fileRef")]
    pub file_ref: ObjectId,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: Settings,
}

impl BuildFile {
    pub fn new(file_ref: ObjectId) -> Self {
        Self { file_ref, settings: Settings::new() }
    }

    pub fn with_settings(file_ref: ObjectId, settings: Settings) -> Self {
        Self { file_ref, settings }
    }

    pub fn compiler_flags(&self) -> Option<&str> {
        self.settings.get(COMPILER_FLAGS).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Registry object
// ---------------------------------------------------------------------------

/// Any object the registry can hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawObject", into = "RawObject")]
pub enum Object {
    FileReference(FileReference),
    BuildFile(BuildFile),
    BuildPhase(BuildPhase),
}

impl Object {
    /// The `isa` tag a serializer writes for this object.
    pub fn isa(&self) -> &'static str {
        match self {
            Object::FileReference(_) => "PBXFileReference",
            Object::BuildFile(_) => "PBXBuildFile",
            Object::BuildPhase(phase) => phase.kind().isa(),
        }
    }
}

impl From<FileReference> for Object {
    fn from(f: FileReference) -> Self {
        Object::FileReference(f)
    }
}

impl From<BuildFile> for Object {
    fn from(b: BuildFile) -> Self {
        Object::BuildFile(b)
    }
}

impl From<BuildPhase> for Object {
    fn from(p: BuildPhase) -> Self {
        Object::BuildPhase(p)
    }
}

/// Wire form: one variant per `isa` tag.
#[derive(Serialize, Deserialize)]
#[serde(tag = "isa")]
enum RawObject {
    #[serde(rename = "PBXFileReference")]
    FileReference(FileReference),
    #[serde(rename = "PBXBuildFile")]
    BuildFile(BuildFile),
    #[serde(rename = "PBXFrameworksBuildPhase")]
    Frameworks(PhaseBody),
    #[serde(rename = "PBXSourcesBuildPhase")]
    Sources(PhaseBody),
    #[serde(rename = "PBXResourcesBuildPhase")]
    Resources(PhaseBody),
    #[serde(rename = "PBXHeadersBuildPhase")]
    Headers(PhaseBody),
}

impl From<Object> for RawObject {
    fn from(obj: Object) -> Self {
        match obj {
            Object::FileReference(f) => RawObject::FileReference(f),
            Object::BuildFile(b) => RawObject::BuildFile(b),
            Object::BuildPhase(phase) => {
                let (kind, body) = phase.into_parts();
                match kind {
                    PhaseKind::Frameworks => RawObject::Frameworks(body),
                    PhaseKind::Sources => RawObject::Sources(body),
                    PhaseKind::Resources => RawObject::Resources(body),
                    PhaseKind::Headers => RawObject::Headers(body),
                }
            }
        }
    }
}

impl From<RawObject> for Object {
    fn from(raw: RawObject) -> Self {
        match raw {
            RawObject::FileReference(f) => Object::FileReference(f),
            RawObject::BuildFile(b) => Object::BuildFile(b),
            RawObject::Frameworks(body) => {
                Object::BuildPhase(BuildPhase::from_parts(PhaseKind::Frameworks, body))
            }
            RawObject::Sources(body) => {
                Object::BuildPhase(BuildPhase::from_parts(PhaseKind::Sources, body))
            }
            RawObject::Resources(body) => {
                Object::BuildPhase(BuildPhase::from_parts(PhaseKind::Resources, body))
            }
            RawObject::Headers(body) => {
                Object::BuildPhase(BuildPhase::from_parts(PhaseKind::Headers, body))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
