#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use std::sync::Arc;
    use weave::{CacheProvider, Scope, Shape};
    use weave_tests::{blog_fragments, blog_spec, init_logs, optimistic_id, user};

    fn provider() -> CacheProvider {
        init_logs();
        CacheProvider::new(blog_spec(), blog_fragments())
    }

    fn post_card_result() -> Value {
        json!({
            "id": "p1",
            "__PostCardPostFragment": {
                "id": "p1",
                "title": "Hello",
                "body": "First post",
                "author": { "id": "u1", "__UserAvatar": user("u1", "Ann") },
            },
        })
    }

    #[test]
    fn consumers_share_the_records() {
        let provider = provider();
        provider.write("Post", &post_card_result()).unwrap();
        let post_card = provider
            .fragments()
            .definition("PostCardPostFragment")
            .unwrap()
            .clone();
        let avatar = provider.fragments().definition("UserAvatar").unwrap().clone();

        let post = provider.use_fragment(&post_card_result(), &post_card).unwrap();
        assert_eq!(
            post,
            json!({
                "id": "p1",
                "title": "Hello",
                "body": "First post",
                "author": { "id": "u1", "__UserAvatar": user("u1", "Ann") },
            })
        );
        assert_eq!(
            provider.use_fragment(&post["author"], &avatar).unwrap(),
            user("u1", "Ann")
        );

        // Another query renames the author, every view of it follows
        provider.write("User", &user("u1", "Annie")).unwrap();
        let snapshot = provider.snapshot();
        let post = post_card
            .pull(
                &post_card_result(),
                provider.spec(),
                &snapshot,
                provider.fragments(),
            )
            .unwrap();
        assert_eq!(post["title"], "Hello");
        assert_eq!(
            avatar
                .pull(&post["author"], provider.spec(), &snapshot, provider.fragments())
                .unwrap(),
            user("u1", "Annie")
        );
    }

    #[test]
    fn optimistic_comment() {
        let provider = provider();
        provider.write("Post", &post_card_result()).unwrap();
        provider
            .write("Post", &json!({ "id": "p1", "comments": [] }))
            .unwrap();
        let shape = provider
            .fragments()
            .definition("PostCommentsFragment")
            .unwrap()
            .shape(&Scope::default());

        let draft = optimistic_id();
        provider
            .update_fragment("PostCommentsFragment", "p1", |previous| {
                let mut comments = previous
                    .and_then(|v| v.get("comments"))
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                comments.push(json!({
                    "id": draft,
                    "text": "First!",
                    "created_at": "2026-10-17T10:00:00Z",
                    "author": { "id": "u1" },
                    "__optimistic__": true,
                }));
                json!({ "comments": comments })
            })
            .unwrap();
        assert!(provider.is_optimistic(&draft));
        assert!(!provider.is_optimistic("p1"));
        assert_eq!(
            provider.read("Post", "p1", &shape).unwrap(),
            Some(json!({
                "id": "p1",
                "comments": [{
                    "id": draft,
                    "text": "First!",
                    "author": { "id": "u1", "__UserAvatar": user("u1", "Ann") },
                }],
            }))
        );

        // The server answers with the stored comment
        provider
            .write(
                "Comment",
                &json!({ "id": draft, "text": "First!", "post": { "id": "p1" } }),
            )
            .unwrap();
        assert!(!provider.is_optimistic(&draft));
        assert_eq!(provider.snapshot().optimistic_ids().count(), 0);
    }

    #[test]
    fn query_fragments_are_not_normalized() {
        let provider = provider();
        let header = provider
            .fragments()
            .definition("HeaderQueryFragment")
            .unwrap()
            .clone();
        assert_eq!(header.params[0].name, "userUuid");
        let reference = json!({
            "__HeaderQueryFragment": {
                "authedUser": { "id": "u1", "__UserAvatar": user("u1", "Ann") },
            },
        });
        assert_eq!(
            provider.use_fragment(&reference, &header).unwrap(),
            reference["__HeaderQueryFragment"]
        );
        assert!(provider.snapshot().is_empty());
    }

    #[test]
    fn raw_post_card() {
        let fragments = blog_fragments();
        let raw = fragments
            .definition("PostCardPostFragment")
            .unwrap()
            .raw(&fragments, &Scope::default())
            .unwrap();
        let expected = Shape::new().embed(
            "PostCardPostFragment",
            Shape::new().fields(["title", "body"]).link(
                "author",
                Shape::new().embed("UserAvatar", Shape::new().fields(["name", "email"])),
            ),
        );
        assert_eq!(format!("{raw:?}"), format!("{expected:?}"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_writers() {
        let provider = Arc::new(provider());
        let mut receiver = provider.subscribe();
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let provider = provider.clone();
                tokio::spawn(async move {
                    provider
                        .write("User", &user(&format!("u{i}"), &format!("User {i}")))
                        .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert!(receiver.has_changed().unwrap());
        let snapshot = receiver.borrow_and_update().clone();
        assert_eq!(snapshot.len(), 16);
        assert_eq!(snapshot.optimistic_ids().count(), 0);
    }
}
