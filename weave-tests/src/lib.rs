use indoc::indoc;
use log::LevelFilter;
use serde_json::{Value, json};
use std::env;
use uuid::Uuid;
use weave_codegen::SourceUnit;
use weave_core::{
    Cardinality, FragmentDefinition, FragmentMap, ParamDefinition, Shape, TypeDescriptor, TypeSpec,
};

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Users writing posts and commenting them.
pub fn blog_spec() -> TypeSpec {
    TypeSpec::new()
        .with(TypeDescriptor::scalar("std::str", "std::str"))
        .with(TypeDescriptor::scalar("std::uuid", "std::uuid"))
        .with(TypeDescriptor::scalar("std::datetime", "std::datetime"))
        .with(
            TypeDescriptor::object("default::User", "User")
                .property("id", "std::uuid")
                .property("name", "std::str")
                .property("email", "std::str")
                .link("posts", Cardinality::Many, "default::Post")
                .link("best_friend", Cardinality::AtMostOne, "default::User"),
        )
        .with(
            TypeDescriptor::object("default::Post", "Post")
                .property("id", "std::uuid")
                .property("title", "std::str")
                .property("body", "std::str")
                .property("created_at", "std::datetime")
                .link("author", Cardinality::One, "default::User")
                .link("comments", Cardinality::Many, "default::Comment"),
        )
        .with(
            TypeDescriptor::object("default::Comment", "Comment")
                .property("id", "std::uuid")
                .property("text", "std::str")
                .property("created_at", "std::datetime")
                .link("author", Cardinality::One, "default::User")
                .link("post", Cardinality::One, "default::Post"),
        )
}

/// The runtime counterparts of the fragments declared by `demo_sources`, plus the comments of a
/// post ordered by creation.
pub fn blog_fragments() -> FragmentMap {
    FragmentMap::new()
        .with(FragmentDefinition::entity("UserAvatar", "User", |_| {
            Shape::new().fields(["name", "email"])
        }))
        .with(
            FragmentDefinition::entity("PostCardPostFragment", "Post", |_| {
                Shape::new()
                    .fields(["title", "body"])
                    .link("author", Shape::new().spread("UserAvatar"))
            })
            .with_children(["UserAvatar"]),
        )
        .with(
            FragmentDefinition::entity("PostCommentsFragment", "Post", |_| {
                Shape::new().link_with("comments", |_| {
                    Shape::new()
                        .field("text")
                        .directive("order_by", json!({ "direction": "ASC" }))
                        .link("author", Shape::new().spread("UserAvatar"))
                })
            })
            .with_children(["UserAvatar"]),
        )
        .with(
            FragmentDefinition::query("HeaderQueryFragment", |_| {
                Shape::new().link("authedUser", Shape::new().spread("UserAvatar"))
            })
            .with_params([ParamDefinition {
                name: "userUuid".into(),
                type_: "e.uuid".into(),
                optional: true,
            }])
            .with_children(["UserAvatar"]),
        )
}

pub fn user(id: &str, name: &str) -> Value {
    json!({ "id": id, "name": name, "email": format!("{}@example.com", name.to_lowercase()) })
}

/// Identity for a record created on the client before the server assigns one.
pub fn optimistic_id() -> String {
    Uuid::new_v4().to_string()
}

pub const USER_AVATAR_SOURCE: &str = indoc! {r#"
    import e from "@/dbschema/edgeql-js";

    export const userAvatar = e.fragment("UserAvatar", e.User, () => ({
      name: true,
      email: true,
    }));
"#};

pub const POST_CARD_SOURCE: &str = indoc! {r#"
    import e from "@/dbschema/edgeql-js";
    import { useFragment } from "@weave/react";
    import { UserAvatar } from "@/dbschema/edgeql-js/manifest";
    import type { PostCardPostFragmentRef } from "@/dbschema/edgeql-js/manifest";

    export function PostCard({ postRef }: { postRef: PostCardPostFragmentRef }) {
      const post = useFragment(postRef, e.Post, (post) => ({
        title: true,
        body: true,
        author: (author) => ({
          ...UserAvatar(author),
        }),
      }));
      return <article>{post.title}</article>;
    }
"#};

pub const HEADER_SOURCE: &str = indoc! {r#"
    import e from "@/dbschema/edgeql-js";
    import { useQueryFragment } from "@weave/react";
    import { UserAvatar } from "@/dbschema/edgeql-js/manifest";
    import type { HeaderQueryFragmentRef } from "@/dbschema/edgeql-js/manifest";

    export function Header({ queryRef }: { queryRef: HeaderQueryFragmentRef }) {
      const { authedUser } = useQueryFragment(queryRef, {
        authedUser: e.select(e.User, (user) => ({
          ...UserAvatar(user),
          filter_single: {
            id: e.cast(e.uuid, e.param("userUuid", e.uuid, true)),
          },
        })),
      });
      return <header>{authedUser?.name}</header>;
    }
"#};

pub const HOME_SOURCE: &str = indoc! {r#"
    import e from "@/dbschema/edgeql-js";
    import { client } from "@/client";
    import { HeaderQueryFragment, PostCardPostFragment } from "@/dbschema/edgeql-js/manifest";
    import { HomeQueryParams } from "@/dbschema/edgeql-js/queries/HomeQuery";

    export default async function Home() {
      const query = await e.query(
        client,
        {
          posts: e.select(e.Post, (post) => ({
            id: true,
            ...PostCardPostFragment(post),
          })),
          ...HeaderQueryFragment(),
        },
        HomeQueryParams,
        {},
      );
      return <ul>{query.posts.map((post) => <li key={post.id}>{post.title}</li>)}</ul>;
    }
"#};

/// Sources of a small blog front end, in scan order.
pub fn demo_sources() -> Vec<SourceUnit> {
    vec![
        SourceUnit::new("src/fragments/UserAvatar.ts", USER_AVATAR_SOURCE),
        SourceUnit::new("src/components/PostCard.tsx", POST_CARD_SOURCE),
        SourceUnit::new("src/components/Header.tsx", HEADER_SOURCE),
        SourceUnit::new("src/app/page.tsx", HOME_SOURCE),
    ]
}
