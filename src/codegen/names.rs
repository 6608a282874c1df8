//! Naming Strategy
//!
//! Pure functions deriving identifiers from NSIDs and definition names.
//!
//! Every name produced here is the *logical* name. Reserved-word escaping is
//! target-specific and left to the rendering backend, which receives these
//! names unmodified.

use crate::schema::MAIN_DEF;

/// Separator between a parent name and a synthesized child segment
pub const NESTED_SEPARATOR: &str = "_";

/// Segment appended for array element shapes
pub const ELEMENT_SEGMENT: &str = "Elem";

/// Uppercase the first character; the rest is kept as is.
pub fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Lowercase the first character; the rest is kept as is.
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// Remove `prefix` (and the dot after it) from the front of `id`
fn strip_group_prefix<'a>(id: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return id;
    }
    match id.strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('.') || rest.starts_with('#') => {
            rest.trim_start_matches('.')
        }
        _ => id,
    }
}

/// Type name of a document id inside its group: `com.example.foo.bar` under
/// `com.example` becomes `FooBar`.
pub fn name_from_id(id: &str, prefix: &str) -> String {
    strip_group_prefix(id, prefix)
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(title_case)
        .collect()
}

/// Type name of a top-level def. `main` is the document's own name; any other
/// def appends its title-cased name.
pub fn type_name_for_def(id: &str, def_name: &str, prefix: &str) -> String {
    let base = name_from_id(id, prefix);
    if def_name == MAIN_DEF {
        base
    } else {
        format!("{}{}", base, title_case(def_name))
    }
}

/// `<Parent>_<Segment>` name of an anonymous nested shape
pub fn nested_name(parent: &str, segment: &str) -> String {
    format!("{}{}{}", parent, NESTED_SEPARATOR, title_case(segment))
}

/// Module identifier of a namespace-prefix group
pub fn module_name_for(prefix: &str, suffix: &str) -> String {
    format!("{}{}", prefix.replace('.', ""), suffix)
}

/// Union variant identifier from a fully-qualified ref.
///
/// The group prefix is stripped, the remainder split on `.` and `#`, the first
/// segment starts lowercase and the others are title-cased:
/// `com.example.a#one` under `com.example` becomes `aOne`.
pub fn case_name_from_id(id: &str, prefix: &str) -> String {
    let rest = strip_group_prefix(id, prefix);
    let mut segments = rest.split(['.', '#']).filter(|segment| !segment.is_empty());

    let mut name = match segments.next() {
        Some(first) => lower_first(first),
        None => return String::new(),
    };
    for segment in segments {
        name.push_str(&title_case(segment));
    }
    name
}

/// camelCase an arbitrary value (enum literals, error names).
///
/// Splits on non-alphanumeric characters. The first word is lowercased at its
/// first character, or entirely when it is all upper-case (`RFC` → `rfc`);
/// later words get an uppercase first character.
pub fn camel_case(s: &str) -> String {
    let mut words = s.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty());

    let mut result = match words.next() {
        Some(first) if first.chars().all(|c| !c.is_lowercase()) => first.to_lowercase(),
        Some(first) => lower_first(first),
        None => return String::new(),
    };
    for word in words {
        result.push_str(&title_case(word));
    }
    result
}

/// Case name for an enumerated string value. An empty literal is `empty`.
pub fn string_case_name(value: &str) -> String {
    let name = camel_case(value);
    if name.is_empty() {
        "empty".to_string()
    } else {
        name
    }
}

/// Suffix a schema-derived case name with `_` when it equals a case the
/// generator adds on its own (fallback, catch-all, unexpected error).
///
/// Derived case names are purely alphanumeric, so the suffixed form cannot
/// meet another derived name.
pub fn avoid_reserved(name: String, reserved: &str) -> String {
    if name == reserved {
        format!("{}_", name)
    } else {
        name
    }
}

/// Case name for an enumerated integer value: `value3`, `valueMinus3`
pub fn integer_case_name(value: i64) -> String {
    if value < 0 {
        format!("valueMinus{}", value.unsigned_abs())
    } else {
        format!("value{}", value)
    }
}
