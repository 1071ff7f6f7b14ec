#[cfg(test)]
mod tests {
    use serde_json::json;
    use weave_core::{
        CacheError, CacheStore, Cardinality, FragmentDefinition, FragmentKind, FragmentMap,
        Scope, Selection, Shape, TypeDescriptor, TypeSpec, read_from_cache, update_cache,
    };

    fn spec() -> TypeSpec {
        TypeSpec::new()
            .with(
                TypeDescriptor::object("default::User", "User")
                    .property("id", "std::str")
                    .property("name", "std::str"),
            )
            .with(
                TypeDescriptor::object("default::Post", "Post")
                    .property("id", "std::str")
                    .property("title", "std::str")
                    .link("author", Cardinality::One, "default::User"),
            )
    }

    fn fragments() -> FragmentMap {
        FragmentMap::new()
            .with(FragmentDefinition::entity("Foo", "User", |_| {
                Shape::new().field("name")
            }))
            .with(
                FragmentDefinition::entity("Bar", "Post", |_| {
                    Shape::new()
                        .field("title")
                        .link("author", Shape::new().spread("Foo"))
                })
                .with_children(["Foo"]),
            )
            .with(FragmentDefinition::query("Home", |_| {
                Shape::new().link("viewer", Shape::new().spread("Foo"))
            }))
    }

    #[test]
    fn definitions() {
        let fragments = fragments();
        let bar = fragments.definition("Bar").unwrap();
        assert_eq!(bar.type_name(), Some("Post"));
        assert_eq!(bar.key(), "__Bar");
        assert_eq!(bar.children, ["Foo"]);
        assert!(!bar.is_query());
        let home = fragments.definition("Home").unwrap();
        assert_eq!(home.kind, FragmentKind::Query);
        assert_eq!(home.type_name(), None);
        assert_eq!(fragments.len(), 3);

        let error = fragments.definition("Nope").unwrap_err();
        assert_eq!(
            error.downcast_ref::<CacheError>(),
            Some(&CacheError::UnknownFragment { name: "Nope".into() })
        );
    }

    #[test]
    fn masked() {
        let shape = fragments().definition("Bar").unwrap().masked();
        assert_eq!(shape.keys().collect::<Vec<_>>(), ["__Bar"]);
        assert!(matches!(
            shape.get("__Bar"),
            Some(Selection::FragmentSpread(name)) if name == "Bar"
        ));
    }

    #[test]
    fn raw_expands_nested_spreads() {
        let fragments = fragments();
        let shape = fragments
            .definition("Bar")
            .unwrap()
            .raw(&fragments, &Scope::default())
            .unwrap();
        let Some(Selection::Embedded { name, shape: bar }) = shape.get("__Bar") else {
            panic!("Expected `__Bar` to be embedded, got {:?}", shape);
        };
        assert_eq!(name, "Bar");
        assert!(matches!(bar.get("title"), Some(Selection::Scalar)));
        let Some(Selection::Link(author)) = bar.get("author") else {
            panic!("Expected `author` to be a link, got {:?}", bar);
        };
        assert!(matches!(
            author.get("__Foo"),
            Some(Selection::Embedded { name, shape }) if name == "Foo" && shape.contains("name")
        ));
    }

    #[test]
    fn raw_and_masked_read_the_same_data() {
        let spec = spec();
        let fragments = fragments();
        let post = spec.object_type("Post").unwrap();
        let mut cache = CacheStore::new();
        update_cache(
            &spec,
            &mut cache,
            &json!({
                "id": "p1",
                "__Bar": {
                    "id": "p1",
                    "title": "T1",
                    "author": { "id": "u1", "__Foo": { "id": "u1", "name": "Ann" } },
                },
            }),
            post,
        )
        .unwrap();
        let bar = fragments.definition("Bar").unwrap();
        let masked =
            read_from_cache("p1", post, &spec, &cache, &bar.masked(), &fragments).unwrap();
        let raw = read_from_cache(
            "p1",
            post,
            &spec,
            &cache,
            &bar.raw(&fragments, &Scope::default()).unwrap(),
            &fragments,
        )
        .unwrap();
        assert!(masked.is_some());
        assert_eq!(masked, raw);
    }

    #[test]
    fn cycles() {
        let fragments = FragmentMap::new()
            .with(FragmentDefinition::entity("A", "User", |_| {
                Shape::new().spread("B")
            }))
            .with(FragmentDefinition::entity("B", "User", |_| {
                Shape::new().field("name").spread("A")
            }));
        let error = fragments
            .definition("A")
            .unwrap()
            .raw(&fragments, &Scope::default())
            .unwrap_err();
        assert_eq!(
            error.downcast_ref::<CacheError>(),
            Some(&CacheError::FragmentCycle {
                name: "A".into(),
                path: vec!["A".into(), "B".into(), "A".into()],
            })
        );
        assert_eq!(error.to_string(), "Fragment `A` spreads itself through: A -> B -> A");
    }

    #[test]
    fn parameterized_shapes() {
        let fragment = FragmentDefinition::entity("Search", "Post", |scope| {
            let shape = Shape::new().field("title");
            match scope.param("withAuthor") {
                Some(v) if v == &json!(true) => shape.link("author", Shape::new().field("name")),
                _ => shape,
            }
        });
        assert!(!fragment.shape(&Scope::default()).contains("author"));
        assert!(
            fragment
                .shape(&Scope::new().with_param("withAuthor", json!(true)))
                .contains("author")
        );
    }

    #[test]
    fn pull() {
        let spec = spec();
        let fragments = fragments();
        let foo = fragments.definition("Foo").unwrap();
        let mut cache = CacheStore::new();

        // Nothing cached yet, the payload is returned as is
        let reference = json!({ "id": "u1", "__Foo": { "id": "u1", "name": "Ann" } });
        assert_eq!(
            foo.pull(&reference, &spec, &cache, &fragments).unwrap(),
            json!({ "id": "u1", "name": "Ann" })
        );

        update_cache(
            &spec,
            &mut cache,
            &json!({ "id": "u1", "name": "Annie" }),
            spec.object_type("User").unwrap(),
        )
        .unwrap();
        assert_eq!(
            foo.pull(&reference, &spec, &cache, &fragments).unwrap(),
            json!({ "id": "u1", "name": "Annie" })
        );
        assert_eq!(
            foo.pull(&json!({ "id": "u1" }), &spec, &cache, &fragments)
                .unwrap(),
            json!({ "id": "u1", "name": "Annie" })
        );

        let error = foo
            .pull(&json!({ "name": "Ann" }), &spec, &cache, &fragments)
            .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<CacheError>(),
            Some(CacheError::MissingIdentity { .. })
        ));
    }

    #[test]
    fn query_fragments_pull_the_payload() {
        let spec = spec();
        let fragments = fragments();
        let home = fragments.definition("Home").unwrap();
        let reference = json!({ "__Home": { "viewer": { "id": "u1" } }, "other": 1 });
        assert_eq!(
            home.pull(&reference, &spec, &CacheStore::new(), &fragments)
                .unwrap(),
            json!({ "viewer": { "id": "u1" } })
        );
    }
}
