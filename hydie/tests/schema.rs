use hydie::{
    catalog::{AttributeCatalog, AttributeDescriptor, StorageKind},
    schema::{
        AttributeUse, NodeDefinition, SchemaGraph,
        document::SchemaDocument,
        standard::{self, STANDARD_SCHEMA_SOURCE},
    },
    utils::Error,
};

fn catalog() -> AttributeCatalog {
    AttributeCatalog::new([
        AttributeDescriptor {
            name: "name".into(),
            storage: StorageKind::String,
        },
        AttributeDescriptor {
            name: "byte_size".into(),
            storage: StorageKind::Unsigned,
        },
        AttributeDescriptor {
            name: "type".into(),
            storage: StorageKind::TypeReference,
        },
    ])
    .expect("catalog builds")
}

fn type_category() -> NodeDefinition {
    NodeDefinition::category("type").with_attributes([AttributeUse::optional("byte_size")])
}

#[test]
fn builder_graph_loads_in_declaration_order() {
    let graph = SchemaGraph::load(
        catalog(),
        vec![
            type_category(),
            NodeDefinition::kind("base_type", 0x24)
                .with_bases(["type"])
                .with_attributes([AttributeUse::optional("name")]),
            NodeDefinition::kind("typedef", 0x16)
                .with_bases(["type"])
                .with_attributes([AttributeUse::optional("type")]),
        ],
    )
    .expect("graph loads");

    let kinds: Vec<&str> = graph.kinds().map(|k| k.name.as_str()).collect();
    assert_eq!(kinds, vec!["base_type", "typedef"]);
    assert_eq!(graph.categories().count(), 1);
    assert_eq!(graph.narrowing_category(), "type");

    // Every base precedes its dependents.
    let position = |name: &str| {
        let index = graph.index_of(name).expect("node present");
        graph
            .topo_order()
            .iter()
            .position(|&i| i == index)
            .expect("node ordered")
    };
    assert!(position("type") < position("base_type"));
    assert!(position("type") < position("typedef"));
}

#[test]
fn duplicate_names_are_rejected() {
    let err = SchemaGraph::load(
        catalog(),
        vec![
            type_category(),
            NodeDefinition::kind("type", 0x24),
        ],
    )
    .unwrap_err();
    assert_eq!(err, Error::DuplicateKind { name: "type".into() });
}

#[test]
fn duplicate_tags_are_rejected() {
    let err = SchemaGraph::load(
        catalog(),
        vec![
            type_category(),
            NodeDefinition::kind("base_type", 0x24),
            NodeDefinition::kind("not_base_type", 0x24),
        ],
    )
    .unwrap_err();
    assert_eq!(
        err,
        Error::DuplicateTag {
            tag: 0x24,
            first: "base_type".into(),
            second: "not_base_type".into(),
        }
    );
    assert!(err.to_string().contains("0x0024"));
}

#[test]
fn duplicate_attribute_uses_are_rejected() {
    let err = SchemaGraph::load(
        catalog(),
        vec![
            type_category(),
            NodeDefinition::kind("base_type", 0x24).with_attributes([
                AttributeUse::optional("name"),
                AttributeUse::mandatory("name"),
            ]),
        ],
    )
    .unwrap_err();
    assert_eq!(
        err,
        Error::DuplicateAttribute {
            node: "base_type".into(),
            attribute: "name".into(),
        }
    );
}

#[test]
fn unknown_references_are_rejected() {
    let unknown_attribute = SchemaGraph::load(
        catalog(),
        vec![
            type_category(),
            NodeDefinition::kind("base_type", 0x24)
                .with_attributes([AttributeUse::mandatory("encoding")]),
        ],
    )
    .unwrap_err();
    assert_eq!(
        unknown_attribute,
        Error::UnknownAttribute {
            node: "base_type".into(),
            attribute: "encoding".into(),
        }
    );

    let unknown_base = SchemaGraph::load(
        catalog(),
        vec![
            type_category(),
            NodeDefinition::kind("base_type", 0x24).with_bases(["program_element"]),
        ],
    )
    .unwrap_err();
    assert_eq!(
        unknown_base,
        Error::UnknownBase {
            node: "base_type".into(),
            base: "program_element".into(),
        }
    );
}

#[test]
fn categories_are_not_valid_children() {
    let err = SchemaGraph::load(
        catalog(),
        vec![
            type_category(),
            NodeDefinition::kind("compile_unit", 0x11).with_children(["type"]),
        ],
    )
    .unwrap_err();
    assert!(err.is_unknown_child_kind());
}

#[test]
fn narrowing_category_must_exist_when_needed() {
    let err = SchemaGraph::load(catalog(), vec![NodeDefinition::kind("base_type", 0x24)])
        .unwrap_err();
    assert_eq!(err, Error::UnknownNarrowingCategory("type".into()));

    // Without type-constrained attributes the category is never consulted.
    let plain = AttributeCatalog::new([AttributeDescriptor {
        name: "name".into(),
        storage: StorageKind::String,
    }])
    .expect("catalog builds");
    assert!(SchemaGraph::load(plain, vec![NodeDefinition::kind("base_type", 0x24)]).is_ok());

    let custom = SchemaGraph::load_with_narrowing(
        catalog(),
        vec![NodeDefinition::category("any_type")],
        "any_type",
    )
    .expect("graph loads");
    assert_eq!(custom.narrowing_category(), "any_type");
}

#[test]
fn documents_accept_bare_and_full_attribute_uses() {
    let document = SchemaDocument::from_toml_str(
        "test.toml",
        r#"
            attribute = [
                { name = "language", storage = "unsigned" },
                { name = "comp_dir", storage = "string" },
            ]
            kind = [
                { name = "compile_unit", tag = 0x11, attributes = [
                    { name = "language", mandatory = true }, "comp_dir",
                ] },
            ]

            [options]
            narrowing_category = "type"
        "#,
    )
    .expect("document parses");

    let definitions = document.definitions();
    assert_eq!(definitions.len(), 1);
    assert_eq!(
        definitions[0].attributes,
        vec![
            AttributeUse::mandatory("language"),
            AttributeUse::optional("comp_dir")
        ]
    );
    assert_eq!(definitions[0].tag(), Some(0x11));
    assert!(document.into_graph().is_ok());
}

#[test]
fn document_errors_carry_a_span() {
    let source = "kind = [{ name = \"compile_unit\", tag = \"eleven\" }]";
    let err = SchemaDocument::from_toml_str("broken.toml", source).unwrap_err();

    let Error::DocumentParse { file, span, .. } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(file, "broken.toml");
    let span = span.clone().expect("span reported");
    assert!(span.start < source.len());

    let unknown_field = SchemaDocument::from_toml_str(
        "broken.toml",
        "kind = [{ name = \"compile_unit\", tag = 1, colour = \"red\" }]",
    );
    assert!(unknown_field.unwrap_err().is_document_parse());
}

#[test]
fn missing_files_are_reported() {
    let err = SchemaDocument::load_from_path(std::path::Path::new("/nonexistent/schema.toml"))
        .unwrap_err();
    assert!(err.is_document_read());
}

#[test]
fn standard_document_survives_reserialisation() {
    let document = standard::standard_document().expect("standard document parses");
    assert!(STANDARD_SCHEMA_SOURCE.contains("narrowing_category"));

    let serialised = document.to_toml_string().expect("document serialises");
    let reparsed =
        SchemaDocument::from_toml_str("reserialised.toml", &serialised).expect("reparses");
    assert_eq!(reparsed, document);
}
