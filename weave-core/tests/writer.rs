#[cfg(test)]
mod tests {
    use serde_json::json;
    use weave_core::{
        CacheError, CacheStore, CacheValue, Cardinality, RefMarker, TypeDescriptor, TypeSpec,
        update_cache,
    };

    fn spec() -> TypeSpec {
        TypeSpec::new()
            .with(TypeDescriptor::scalar("std::str", "std::str"))
            .with(
                TypeDescriptor::object("default::User", "User")
                    .property("id", "std::str")
                    .property("name", "std::str")
                    .link("posts", Cardinality::Many, "default::Post")
                    .link("best_friend", Cardinality::AtMostOne, "default::User"),
            )
            .with(
                TypeDescriptor::object("default::Post", "Post")
                    .property("id", "std::str")
                    .property("title", "std::str")
                    .link("author", Cardinality::One, "default::User"),
            )
    }

    fn write(
        cache: &mut CacheStore,
        type_name: &str,
        data: serde_json::Value,
    ) -> weave_core::Result<()> {
        let spec = spec();
        let type_ = spec.object_type(type_name)?;
        update_cache(&spec, cache, &data, type_)
    }

    #[test]
    fn normalizes_linked_records() {
        let mut cache = CacheStore::new();
        write(
            &mut cache,
            "User",
            json!({ "id": "u1", "posts": [{ "id": "p1", "title": "T1" }] }),
        )
        .expect("Failed to write u1");
        assert_eq!(
            cache.to_json().unwrap(),
            json!({
                "u1": { "id": "u1", "posts": [{ "__ref__": "p1" }] },
                "p1": { "id": "p1", "title": "T1" },
            })
        );
        assert_eq!(
            cache.field("u1", "posts"),
            Some(&CacheValue::Refs(vec![RefMarker::new("p1")]))
        );
    }

    #[test]
    fn single_links_become_references() {
        let mut cache = CacheStore::new();
        write(
            &mut cache,
            "Post",
            json!({ "id": "p1", "title": "T1", "author": { "id": "u1", "name": "Ann" } }),
        )
        .unwrap();
        assert_eq!(
            cache.field("p1", "author"),
            Some(&CacheValue::Ref(RefMarker::new("u1")))
        );
        assert_eq!(
            cache.field("u1", "name"),
            Some(&CacheValue::Scalar(json!("Ann")))
        );
    }

    #[test]
    fn idempotent() {
        let data = json!({
            "id": "u1",
            "name": "Ann",
            "posts": [
                { "id": "p1", "title": "T1", "author": { "id": "u1" } },
                { "id": "p2", "title": "T2" },
            ],
        });
        let mut once = CacheStore::new();
        write(&mut once, "User", data.clone()).unwrap();
        let mut twice = once.clone();
        write(&mut twice, "User", data).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn keeps_the_order_of_many_links() {
        let mut cache = CacheStore::new();
        write(
            &mut cache,
            "User",
            json!({ "id": "u1", "posts": [{ "id": "p3" }, { "id": "p1" }, { "id": "p2" }] }),
        )
        .unwrap();
        let ids: Vec<_> = cache
            .field("u1", "posts")
            .and_then(CacheValue::as_refs)
            .unwrap()
            .iter()
            .map(|v| v.id.as_str())
            .collect();
        assert_eq!(ids, ["p3", "p1", "p2"]);
    }

    #[test]
    fn flattens_fragment_payloads() {
        let mut cache = CacheStore::new();
        write(
            &mut cache,
            "User",
            json!({ "id": "X", "__Frag": { "id": "X", "a": 1 }, "b": 2 }),
        )
        .unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.to_json().unwrap(),
            json!({ "X": { "id": "X", "a": 1, "b": 2 } })
        );
    }

    #[test]
    fn flattens_nested_fragment_payloads() {
        let mut cache = CacheStore::new();
        write(
            &mut cache,
            "Post",
            json!({
                "id": "p1",
                "__PostCard": {
                    "id": "p1",
                    "title": "T1",
                    "author": { "id": "u1", "__Avatar": { "id": "u1", "name": "Ann" } },
                },
            }),
        )
        .unwrap();
        assert_eq!(
            cache.to_json().unwrap(),
            json!({
                "p1": { "id": "p1", "title": "T1", "author": { "__ref__": "u1" } },
                "u1": { "id": "u1", "name": "Ann" },
            })
        );
    }

    #[test]
    fn optimistic_lifecycle() {
        let mut cache = CacheStore::new();
        write(
            &mut cache,
            "User",
            json!({ "id": "X", "name": "Draft", "__optimistic__": true }),
        )
        .unwrap();
        assert!(cache.is_optimistic("X"));
        assert_eq!(cache.field("X", "__optimistic__"), None);

        write(&mut cache, "User", json!({ "id": "X", "name": "Saved" })).unwrap();
        assert!(!cache.is_optimistic("X"));
        assert_eq!(
            cache.field("X", "name"),
            Some(&CacheValue::Scalar(json!("Saved")))
        );
    }

    #[test]
    fn fragment_payloads_keep_the_host_optimistic() {
        let mut cache = CacheStore::new();
        write(
            &mut cache,
            "User",
            json!({ "id": "X", "__optimistic__": true, "__Frag": { "id": "X", "name": "Draft" } }),
        )
        .unwrap();
        assert!(cache.is_optimistic("X"));
        assert_eq!(cache.optimistic_ids().collect::<Vec<_>>(), ["X"]);
    }

    #[test]
    fn independent_stores_do_not_share_optimistic_state() {
        let mut first = CacheStore::new();
        let second = CacheStore::new();
        write(&mut first, "User", json!({ "id": "X", "__optimistic__": 1 })).unwrap();
        assert!(first.is_optimistic("X"));
        assert!(!second.is_optimistic("X"));
    }

    #[test]
    fn writes_arrays_of_records() {
        let mut cache = CacheStore::new();
        write(
            &mut cache,
            "User",
            json!([{ "id": "u1", "name": "Ann" }, { "id": "u2", "name": "Bob" }]),
        )
        .unwrap();
        assert_eq!(cache.ids().collect::<Vec<_>>(), ["u1", "u2"]);
    }

    #[test]
    fn later_writes_are_visible_through_references() {
        let mut cache = CacheStore::new();
        write(
            &mut cache,
            "User",
            json!({ "id": "u1", "posts": [{ "id": "p1", "title": "T1" }] }),
        )
        .unwrap();
        write(&mut cache, "Post", json!({ "id": "p1", "title": "Edited" })).unwrap();
        assert_eq!(
            cache.to_json().unwrap(),
            json!({
                "u1": { "id": "u1", "posts": [{ "__ref__": "p1" }] },
                "p1": { "id": "p1", "title": "Edited" },
            })
        );
    }

    #[test]
    fn nullable_links() {
        let mut cache = CacheStore::new();
        write(&mut cache, "User", json!({ "id": "u1", "best_friend": null })).unwrap();
        assert_eq!(
            cache.field("u1", "best_friend"),
            Some(&CacheValue::Scalar(json!(null)))
        );

        let error = write(&mut cache, "Post", json!({ "id": "p1", "author": null })).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<CacheError>(),
            Some(CacheError::CardinalityMismatch { pointer, .. }) if pointer == "author"
        ));
    }

    #[test]
    fn missing_identity() {
        let mut cache = CacheStore::new();
        let error = write(&mut cache, "User", json!({ "name": "Ann" })).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<CacheError>(),
            Some(CacheError::MissingIdentity { .. })
        ));

        let error = write(&mut cache, "User", json!({ "id": 42 })).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<CacheError>(),
            Some(CacheError::MissingIdentity { .. })
        ));

        let error = write(
            &mut cache,
            "User",
            json!({ "id": "u1", "posts": [{ "title": "No id" }] }),
        )
        .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<CacheError>(),
            Some(CacheError::MissingIdentity { .. })
        ));
        assert!(format!("{:#}", error).contains("While writing link `posts` of `u1`"));
    }

    #[test]
    fn failed_writes_keep_earlier_fields() {
        let mut cache = CacheStore::new();
        write(
            &mut cache,
            "User",
            json!({ "id": "u1", "name": "Ann", "posts": { "id": "p1" } }),
        )
        .unwrap_err();
        // The writer does not roll back, the provider publishes only successful updates
        assert_eq!(
            cache.field("u1", "name"),
            Some(&CacheValue::Scalar(json!("Ann")))
        );
        assert_eq!(cache.field("u1", "posts"), None);
        assert!(!cache.contains("p1"));
    }

    #[test]
    fn cardinality_mismatch() {
        let mut cache = CacheStore::new();
        let error = write(
            &mut cache,
            "User",
            json!({ "id": "u1", "posts": { "id": "p1" } }),
        )
        .unwrap_err();
        assert_eq!(
            error.downcast_ref::<CacheError>(),
            Some(&CacheError::CardinalityMismatch {
                pointer: "posts".into(),
                expected: Cardinality::Many,
                found: r#"{"id":"p1"}"#.into(),
            })
        );

        let error = write(
            &mut cache,
            "Post",
            json!({ "id": "p1", "author": [{ "id": "u1" }] }),
        )
        .unwrap_err();
        assert!(matches!(
            error.downcast_ref::<CacheError>(),
            Some(CacheError::CardinalityMismatch { expected: Cardinality::One, .. })
        ));
    }

    #[test]
    fn invalid_types() {
        let spec = spec();
        let mut cache = CacheStore::new();
        let scalar = spec.get("std::str").unwrap();
        let error = update_cache(&spec, &mut cache, &json!({ "id": "s" }), scalar).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<CacheError>(),
            Some(CacheError::InvalidType { type_name, .. }) if type_name == "std::str"
        ));
        assert!(cache.is_empty());

        let error = spec.object_type("Missing").unwrap_err();
        assert!(matches!(
            error.downcast_ref::<CacheError>(),
            Some(CacheError::InvalidType { .. })
        ));
    }

    #[test]
    fn unknown_target_type() {
        let spec = TypeSpec::new().with(
            TypeDescriptor::object("default::User", "User").link(
                "avatar",
                Cardinality::One,
                "default::Image",
            ),
        );
        let mut cache = CacheStore::new();
        let error = update_cache(
            &spec,
            &mut cache,
            &json!({ "id": "u1", "avatar": { "id": "i1" } }),
            spec.object_type("User").unwrap(),
        )
        .unwrap_err();
        assert_eq!(
            error.downcast_ref::<CacheError>(),
            Some(&CacheError::UnknownTargetType {
                pointer: "avatar".into(),
                target_id: "default::Image".into(),
            })
        );
    }
}
