use hydie::{
    emit::{ArtifactSet, BodyOrigin, Emitter, ReadStep, WriteStep, render},
    mapper::Representation,
    resolve::Resolver,
    schema::{document::SchemaDocument, standard},
};

fn standard_artifacts() -> ArtifactSet {
    Emitter::new(standard::standard().expect("standard schema loads")).emit()
}

#[test]
fn one_forward_declaration_per_kind_sorted_by_name() {
    let artifacts = standard_artifacts();
    assert_eq!(artifacts.forward_decls.len(), 58);

    let names: Vec<&str> = artifacts
        .forward_decls
        .iter()
        .map(|f| f.kind.as_str())
        .collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn dispatch_table_is_in_ascending_tag_order() {
    let artifacts = standard_artifacts();
    let tags: Vec<u16> = artifacts.dispatch.cases.iter().map(|c| c.tag).collect();
    assert!(tags.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(artifacts.dispatch.lookup(0x11).expect("known").kind, "compile_unit");
    assert_eq!(artifacts.dispatch.tag_of("rvalue_reference_type"), Some(0x42));
    assert!(
        artifacts
            .dispatch
            .lookup(0x4242)
            .unwrap_err()
            .is_unrecognized_kind()
    );
}

#[test]
fn interfaces_cover_kinds_and_categories() {
    let artifacts = standard_artifacts();
    assert_eq!(artifacts.interfaces.len(), 58 + 13);
    assert_eq!(artifacts.concretes.len(), 58);
    assert_eq!(artifacts.child_iters.len(), 58);
    assert_eq!(artifacts.predicates.len(), 13);

    let category = artifacts.interface("program_element").expect("interface");
    assert!(!category.instantiable);
    assert_eq!(category.bases, vec!["basic"]);
    assert_eq!(category.accessors.len(), 9);
}

#[test]
fn compile_unit_interface_declares_own_accessors_and_child_ranges() {
    let artifacts = standard_artifacts();
    let cu = artifacts.interface("compile_unit").expect("interface");

    assert!(cu.instantiable);
    assert_eq!(cu.bases, vec!["with_named_children", "with_static_location"]);

    let language = &cu.accessors[0];
    assert_eq!(language.attribute, "language");
    assert_eq!(language.getter, "get_language");
    assert_eq!(language.setter, "set_language");
    assert!(language.mandatory);
    assert_eq!(language.representation, Representation::U64);
    assert_eq!(language.narrowing, None);

    assert!(cu.reexports.is_empty());

    let subprograms = cu.child_range("subprogram").expect("child range");
    assert_eq!(subprograms.begin, "subprograms_begin");
    assert_eq!(subprograms.end, "subprograms_end");
    assert_eq!(subprograms.iterator, "subprograms_iterator");
    assert!(cu.child_range("member").is_none());
}

#[test]
fn plural_names_keep_a_trailing_s() {
    let artifacts = standard_artifacts();
    let subprogram = artifacts.interface("subprogram").expect("interface");
    let range = subprogram
        .child_range("unspecified_parameters")
        .expect("child range");
    assert_eq!(range.begin, "unspecified_parameters_begin");
    assert_eq!(range.iterator, "unspecified_parameters_iterator");
}

#[test]
fn reexports_name_the_declaring_node() {
    let artifacts = standard_artifacts();
    let member = artifacts.interface("member").expect("interface");

    let name = member
        .reexports
        .iter()
        .find(|r| r.attribute == "name")
        .expect("name re-exported");
    assert_eq!(name.declared_in, "program_element");
    assert_eq!(name.getter, "get_name");

    let ty = member
        .reexports
        .iter()
        .find(|r| r.attribute == "type")
        .expect("type re-exported");
    assert_eq!(ty.declared_in, "with_type_describing_layout");
}

#[test]
fn concrete_bodies_cover_own_and_inherited_attributes() {
    let artifacts = standard_artifacts();
    let typedef = artifacts.concrete("typedef").expect("concrete");
    assert_eq!(typedef.tag, 0x16);

    let ty = &typedef.bodies[0];
    assert_eq!(ty.attribute, "type");
    assert_eq!(ty.slot, "type");
    assert_eq!(ty.representation, Representation::EntryRef);
    assert_eq!(
        ty.read,
        ReadStep::Narrow {
            category: "type".into()
        }
    );
    assert_eq!(ty.write, WriteStep::Upcast);
    assert_eq!(
        ty.origin,
        BodyOrigin::Inherited {
            declared_in: "type_chain".into()
        }
    );

    let byte_size = typedef.body("byte_size").expect("byte_size body");
    assert_eq!(byte_size.read, ReadStep::Direct);
    assert!(typedef.body("name").is_some());

    let base_type = artifacts.concrete("base_type").expect("concrete");
    let encoding = base_type.body("encoding").expect("encoding body");
    assert!(encoding.mandatory);
    assert_eq!(encoding.origin, BodyOrigin::Own);
}

#[test]
fn predicate_artifacts_agree_with_resolution() {
    let schema = standard::standard().expect("standard schema loads");
    let artifacts = Emitter::new(schema).emit();

    for predicate in &artifacts.predicates {
        let resolved = schema.predicate(&predicate.category).expect("predicate");
        let tags: Vec<u16> = predicate.disjuncts.iter().map(|d| d.tag).collect();
        let mut expected: Vec<u16> = resolved.tags().collect();
        expected.sort();
        assert_eq!(tags, expected, "{}", predicate.category);
        assert_eq!(predicate.function, format!("is_{}", predicate.category));
    }

    let named = artifacts.predicate("with_named_children").expect("predicate");
    assert!(named.test(0x11));
    assert!(named.test(0x13));
    assert!(!named.test(0x24));
}

#[test]
fn emission_and_rendering_are_idempotent() {
    let first = standard_artifacts();
    let second = {
        let graph = standard::standard_graph().expect("graph loads");
        let resolved = Resolver::new(graph).resolve();
        Emitter::new(&resolved).emit()
    };
    assert_eq!(first, second);
    assert_eq!(render::render(&first), render::render(&second));
}

#[test]
fn rendered_files_cover_every_artifact_family() {
    let files = render::render(&standard_artifacts());
    let names: Vec<&str> = files.iter().map(|f| f.name).collect();
    assert_eq!(
        names,
        vec![
            "forward_decls.rs",
            "interfaces.rs",
            "concrete.rs",
            "child_iters.rs",
            "dispatch.rs",
            "predicates.rs",
        ]
    );

    let file = |name: &str| {
        files
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.contents.as_str())
            .unwrap_or_default()
    };
    assert!(file("forward_decls.rs").contains("CompileUnit = 0x0011,"));
    assert!(
        file("interfaces.rs")
            .contains("pub trait CompileUnit: WithNamedChildren + WithStaticLocation {")
    );
    assert!(file("interfaces.rs").contains("fn get_language(&self) -> DataResult<u64>;"));
    assert!(file("concrete.rs").contains("impl CompileUnit for CompileUnitEntry {"));
    assert!(file("child_iters.rs").contains("pub type MembersIterator<'a> = ChildCursor<'a>;"));
    assert!(file("dispatch.rs").contains("0x0011 => Ok(Box::new(CompileUnitEntry::new(id))),"));
    assert!(file("dispatch.rs").contains("other => Err(DataError::UnrecognizedKind(other)),"));
    assert!(file("predicates.rs").contains("pub fn is_with_named_children(tag: u16) -> bool {"));
    for file in &files {
        assert!(file.contents.starts_with("// @generated"), "{}", file.name);
    }
}

#[test]
fn empty_categories_render_a_constant_predicate() {
    let document = SchemaDocument::from_toml_str(
        "test.toml",
        r#"
            category = [{ name = "unused" }]
            kind = [{ name = "label", tag = 0x0a }]
        "#,
    )
    .expect("document parses");
    let resolved = Resolver::new(document.into_graph().expect("graph loads")).resolve();
    let artifacts = Emitter::new(&resolved).emit();

    assert!(artifacts.predicate("unused").expect("predicate").disjuncts.is_empty());
    let files = render::render(&artifacts);
    let predicates = files
        .iter()
        .find(|f| f.name == "predicates.rs")
        .expect("predicates rendered");
    assert!(predicates.contents.contains("pub fn is_unused(tag: u16) -> bool {"));
    assert!(predicates.contents.contains("false"));
}
