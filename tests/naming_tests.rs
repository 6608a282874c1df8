use lexicon_codegen::codegen::names::{
    camel_case, case_name_from_id, integer_case_name, module_name_for, name_from_id, nested_name,
    string_case_name, type_name_for_def,
};
use lexicon_codegen::graph::NamespaceGroups;
use rstest::rstest;

#[rstest]
#[case("com.example.foo", "com.example", "Foo")]
#[case("com.example.feed.getPosts", "com.example", "FeedGetPosts")]
#[case("com.example.foo", "com", "ExampleFoo")]
#[case("com.example.foo", "", "ComExampleFoo")]
#[case("com.examples.foo", "com.example", "ComExamplesFoo")]
fn test_name_from_id(#[case] id: &str, #[case] prefix: &str, #[case] expected: &str) {
    assert_eq!(name_from_id(id, prefix), expected);
}

#[rstest]
#[case("com.example.foo", "main", "Foo")]
#[case("com.example.foo", "widget", "FooWidget")]
#[case("com.example.foo", "replyRef", "FooReplyRef")]
fn test_type_name_for_def(#[case] id: &str, #[case] def: &str, #[case] expected: &str) {
    assert_eq!(type_name_for_def(id, def, "com.example"), expected);
}

#[rstest]
#[case("com.example.a#one", "aOne")]
#[case("com.example.a#two", "aTwo")]
#[case("com.example.feed.post", "feedPost")]
#[case("com.example.Thing", "thing")]
fn test_case_name_from_id(#[case] id: &str, #[case] expected: &str) {
    assert_eq!(case_name_from_id(id, "com.example"), expected);
}

#[rstest]
#[case("foo-bar", "fooBar")]
#[case("app.bsky.feed", "appBskyFeed")]
#[case("!no-unauthenticated", "noUnauthenticated")]
#[case("URL", "url")]
#[case("InvalidSwap", "invalidSwap")]
#[case("snake_case_value", "snakeCaseValue")]
fn test_camel_case(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(camel_case(input), expected);
}

#[rstest]
#[case("", "empty")]
#[case("---", "empty")]
#[case("dark-mode", "darkMode")]
fn test_string_case_name(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(string_case_name(input), expected);
}

#[rstest]
#[case(0, "value0")]
#[case(42, "value42")]
#[case(-3, "valueMinus3")]
fn test_integer_case_name(#[case] value: i64, #[case] expected: &str) {
    assert_eq!(integer_case_name(value), expected);
}

#[test]
fn test_nested_and_module_names() {
    assert_eq!(nested_name("Post", "reply"), "Post_Reply");
    assert_eq!(nested_name("Post_Reply", "Elem"), "Post_Reply_Elem");
    assert_eq!(module_name_for("com.example", "types"), "comexampletypes");
}

#[rstest]
#[case(&["com.example.a", "com.example.b"], "com.example.a", "com.example")]
#[case(&["com.example.a", "org.other.b"], "com.example.a", "com")]
#[case(&["com.example.feed.post", "com.example.feed.like", "com.example.actor.profile"], "com.example.actor.profile", "com.example")]
#[case(&["com.example.feed.post", "com.example.feed.like", "com.example.actor.profile"], "com.example.feed.like", "com.example.feed")]
#[case(&["single"], "single", "")]
fn test_namespace_prefix(#[case] ids: &[&str], #[case] id: &str, #[case] expected: &str) {
    let groups = NamespaceGroups::compute(ids.iter().copied());
    assert_eq!(groups.prefix_for(id), Some(expected));
}
