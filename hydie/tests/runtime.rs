use hydie::{
    emit::{ArtifactSet, Emitter},
    entry::{AttrValue, EntryStore, Read, Runtime},
    schema::standard,
    utils::DataError,
};

const COMPILE_UNIT: u16 = 0x11;
const STRUCTURE_TYPE: u16 = 0x13;
const TYPEDEF: u16 = 0x16;
const MEMBER: u16 = 0x0d;
const BASE_TYPE: u16 = 0x24;

fn artifacts() -> ArtifactSet {
    Emitter::new(standard::standard().expect("standard schema loads")).emit()
}

#[test]
fn unknown_tags_construct_nothing() {
    let artifacts = artifacts();
    let runtime = Runtime::new(&artifacts);
    let mut store = EntryStore::new();

    let err = runtime.construct(&mut store, 0x4081, None).unwrap_err();
    assert_eq!(err, DataError::UnrecognizedKind(0x4081));
    assert!(store.is_empty());
}

#[test]
fn dead_parents_construct_nothing() {
    let artifacts = artifacts();
    let runtime = Runtime::new(&artifacts);
    let mut store = EntryStore::new();

    let cu = runtime
        .construct(&mut store, COMPILE_UNIT, None)
        .expect("constructs");
    store.remove(cu).expect("removes");

    let err = runtime
        .construct(&mut store, BASE_TYPE, Some(cu))
        .unwrap_err();
    assert_eq!(err, DataError::DanglingEntry);
    assert!(store.is_empty());
}

#[test]
fn mandatory_attributes_read_bare_or_fail() {
    let artifacts = artifacts();
    let runtime = Runtime::new(&artifacts);
    let mut store = EntryStore::new();
    let cu = runtime
        .construct(&mut store, COMPILE_UNIT, None)
        .expect("constructs");

    assert_eq!(
        runtime.get(&store, cu, "language").unwrap_err(),
        DataError::MissingMandatoryAttribute {
            kind: "compile_unit".into(),
            attribute: "language".into(),
        }
    );
    assert!(runtime.validate(&store, cu).is_err());

    runtime
        .set(&mut store, cu, "language", Some(AttrValue::U64(0x1c)))
        .expect("sets");
    let read = runtime.get(&store, cu, "language").expect("reads");
    assert_eq!(read, Read::Bare(&AttrValue::U64(0x1c)));
    assert!(runtime.validate(&store, cu).is_ok());

    assert_eq!(
        runtime.set(&mut store, cu, "language", None).unwrap_err(),
        DataError::ClearMandatory {
            kind: "compile_unit".into(),
            attribute: "language".into(),
        }
    );
}

#[test]
fn optional_setters_clear_on_absent() {
    let artifacts = artifacts();
    let runtime = Runtime::new(&artifacts);
    let mut store = EntryStore::new();
    let cu = runtime
        .construct(&mut store, COMPILE_UNIT, None)
        .expect("constructs");

    assert_eq!(
        runtime.get(&store, cu, "comp_dir").expect("reads"),
        Read::Maybe(None)
    );

    let dir = AttrValue::Text("/src".into());
    runtime
        .set(&mut store, cu, "comp_dir", Some(dir.clone()))
        .expect("sets");
    let read = runtime.get(&store, cu, "comp_dir").expect("reads");
    assert!(!read.is_bare());
    assert_eq!(read.value().and_then(AttrValue::as_text), Some("/src"));

    runtime
        .set(&mut store, cu, "comp_dir", None)
        .expect("clears");
    assert_eq!(
        runtime.get(&store, cu, "comp_dir").expect("reads"),
        Read::Maybe(None)
    );
}

#[test]
fn setters_reject_the_wrong_representation() {
    let artifacts = artifacts();
    let runtime = Runtime::new(&artifacts);
    let mut store = EntryStore::new();
    let cu = runtime
        .construct(&mut store, COMPILE_UNIT, None)
        .expect("constructs");

    let err = runtime
        .set(&mut store, cu, "language", Some(AttrValue::Text("C".into())))
        .unwrap_err();
    assert_eq!(
        err,
        DataError::StorageMismatch {
            attribute: "language".into(),
            expected: "u64",
            found: "text",
        }
    );

    let err = runtime
        .set(&mut store, cu, "encoding", Some(AttrValue::U64(5)))
        .unwrap_err();
    assert!(err.is_unknown_accessor());
}

#[test]
fn type_references_are_narrowed_on_read() {
    let artifacts = artifacts();
    let runtime = Runtime::new(&artifacts);
    let mut store = EntryStore::new();

    let cu = runtime
        .construct(&mut store, COMPILE_UNIT, None)
        .expect("constructs");
    let int = runtime
        .construct(&mut store, BASE_TYPE, Some(cu))
        .expect("constructs");
    let alias = runtime
        .construct(&mut store, TYPEDEF, Some(cu))
        .expect("constructs");

    runtime
        .set(&mut store, alias, "type", Some(AttrValue::EntryRef(int)))
        .expect("sets");
    let target = runtime
        .get(&store, alias, "type")
        .expect("narrows")
        .value()
        .and_then(AttrValue::as_entry);
    assert_eq!(target, Some(int));

    // Writing is an upcast and always succeeds; reading checks the category.
    runtime
        .set(&mut store, alias, "type", Some(AttrValue::EntryRef(cu)))
        .expect("sets");
    assert_eq!(
        runtime.get(&store, alias, "type").unwrap_err(),
        DataError::NarrowingFailed {
            attribute: "type".into(),
            category: "type".into(),
            found: "compile_unit".into(),
        }
    );

    store.remove(int).expect("removes");
    runtime
        .set(&mut store, alias, "type", Some(AttrValue::EntryRef(int)))
        .expect("sets");
    assert_eq!(
        runtime.get(&store, alias, "type").unwrap_err(),
        DataError::DanglingEntry
    );
}

#[test]
fn child_views_are_filtered_and_restartable() {
    let artifacts = artifacts();
    let runtime = Runtime::new(&artifacts);
    let mut store = EntryStore::new();

    let st = runtime
        .construct(&mut store, STRUCTURE_TYPE, None)
        .expect("constructs");
    let first = runtime
        .construct(&mut store, MEMBER, Some(st))
        .expect("constructs");
    let alias = runtime
        .construct(&mut store, TYPEDEF, Some(st))
        .expect("constructs");
    let second = runtime
        .construct(&mut store, MEMBER, Some(st))
        .expect("constructs");

    let members = runtime
        .children_of_kind(&store, st, "member")
        .expect("structure_type has members");
    assert_eq!(members.begin().collect::<Vec<_>>(), vec![first, second]);
    assert_eq!(members.iter().collect::<Vec<_>>(), vec![first, second]);
    assert!(members.begin() != members.end());

    let mut cursor = members.begin();
    cursor.next();
    cursor.next();
    assert!(cursor == members.end());

    let typedefs: Vec<_> = runtime
        .children_of_kind(&store, st, "typedef")
        .expect("structure_type has typedefs")
        .into_iter()
        .collect();
    assert_eq!(typedefs, vec![alias]);

    assert!(
        runtime
            .children_of_kind(&store, st, "compile_unit")
            .unwrap_err()
            .is_unknown_child_range()
    );
}

#[test]
fn empty_child_views_start_at_the_end() {
    let artifacts = artifacts();
    let runtime = Runtime::new(&artifacts);
    let mut store = EntryStore::new();
    let st = runtime
        .construct(&mut store, STRUCTURE_TYPE, None)
        .expect("constructs");

    let members = runtime
        .children_of_kind(&store, st, "member")
        .expect("structure_type has members");
    assert!(members.begin() == members.end());
    assert_eq!(members.iter().count(), 0);
}

#[test]
fn category_membership_uses_emitted_predicates() {
    let artifacts = artifacts();
    let runtime = Runtime::new(&artifacts);
    let mut store = EntryStore::new();

    let st = runtime
        .construct(&mut store, STRUCTURE_TYPE, None)
        .expect("constructs");
    let int = runtime
        .construct(&mut store, BASE_TYPE, None)
        .expect("constructs");

    assert!(runtime.is_a(&store, st, "type").expect("live"));
    assert!(runtime.is_a(&store, st, "with_named_children").expect("live"));
    assert!(runtime.is_a(&store, int, "type").expect("live"));
    assert!(!runtime.is_a(&store, int, "with_named_children").expect("live"));
    assert!(!runtime.is_a(&store, int, "no_such_category").expect("live"));
}

#[test]
fn removing_an_entry_removes_its_subtree() {
    let artifacts = artifacts();
    let runtime = Runtime::new(&artifacts);
    let mut store = EntryStore::new();

    let cu = runtime
        .construct(&mut store, COMPILE_UNIT, None)
        .expect("constructs");
    let st = runtime
        .construct(&mut store, STRUCTURE_TYPE, Some(cu))
        .expect("constructs");
    let member = runtime
        .construct(&mut store, MEMBER, Some(st))
        .expect("constructs");
    assert_eq!(store.len(), 3);

    store.remove(st).expect("removes");
    assert_eq!(store.len(), 1);
    assert!(!store.contains(member));
    assert!(store.get(cu).expect("live").children.is_empty());
}
