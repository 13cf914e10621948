//! Dangling-reference and wrong-kind detection.
//!
//! A corrupted graph must surface as an error at the point of dereferencing,
//! never as a shortened file list.

use pbxgraph_core::{
    BuildFile, BuildPhase, FileReference, GraphError, ObjectId, ObjectRegistry, SequentialIds,
};

fn populated() -> (ObjectRegistry, BuildPhase, ObjectId, ObjectId) {
    let mut reg = ObjectRegistry::new().with_ids(SequentialIds::new("C"));
    let a = reg.add_file_reference(FileReference::named("a.m")).expect("a");
    let b = reg.add_file_reference(FileReference::named("b.m")).expect("b");
    let mut phase = BuildPhase::sources();
    phase.add_build_file(&mut reg, &a).expect("add a");
    phase.add_build_file(&mut reg, &b).expect("add b");
    (reg, phase, a, b)
}

#[test]
fn removed_build_file_is_dangling() {
    let (mut reg, phase, _, _) = populated();
    let gone = phase.files()[0].clone();
    reg.remove_object(&gone).expect("was registered");

    let err = phase.build_files(&reg).unwrap_err();
    assert!(matches!(&err, GraphError::DanglingReference { id } if *id == gone), "got: {err}");
}

#[test]
fn removed_file_reference_is_dangling() {
    let (mut reg, phase, _, b) = populated();
    reg.remove_object(&b).expect("was registered");

    let err = phase.build_files(&reg).unwrap_err();
    assert!(matches!(&err, GraphError::DanglingReference { id } if *id == b), "got: {err}");
}

#[test]
fn lookup_stops_before_later_dangling_entry() {
    let (mut reg, phase, _, b) = populated();
    reg.remove_object(&b).expect("was registered");

    // The first member matches before the broken one is reached.
    assert!(phase.build_file(&reg, "a.m").expect("lookup").is_some());
    assert!(phase.build_file(&reg, "zzz.m").is_err());
}

#[test]
fn add_over_broken_phase_fails_without_mutation() {
    let (mut reg, mut phase, _, b) = populated();
    reg.remove_object(&b).expect("was registered");
    let c = reg.add_file_reference(FileReference::named("c.m")).expect("c");
    let before = reg.len();

    let err = phase.add_build_file(&mut reg, &c).unwrap_err();
    assert!(matches!(err, GraphError::DanglingReference { .. }), "got: {err}");
    assert_eq!(phase.len(), 2);
    assert_eq!(reg.len(), before);
}

#[test]
fn build_file_pointing_at_phase_is_wrong_kind() {
    let mut reg = ObjectRegistry::new().with_ids(SequentialIds::new("K"));
    let phase_id = reg.add_object(BuildPhase::resources()).expect("phase");
    reg.add_object(BuildFile::new(phase_id)).expect("bogus build file");

    let err = reg.check_references().unwrap_err();
    assert!(
        matches!(
            err,
            GraphError::UnexpectedKind {
                expected: "PBXFileReference",
                found: "PBXResourcesBuildPhase",
                ..
            }
        ),
        "got: {err}"
    );
    assert!(err.to_string().contains("PBXResourcesBuildPhase"));
}

#[test]
fn consistent_graph_passes_check() {
    let (reg, _, _, _) = populated();
    reg.check_references().expect("consistent");
}
