//! Namespace-Prefix Groups
//!
//! Partitions document ids into output modules. Each id's prefix is the
//! longest run of leading segments it shares with any other id in the
//! corpus, clamped so the prefix always keeps at least one segment and never
//! swallows the final name segment.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Assignment of every document id to its namespace-prefix group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamespaceGroups {
    by_id: BTreeMap<String, String>,
}

fn common_leading_segments(a: &[&str], b: &[&str]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

impl NamespaceGroups {
    pub fn compute<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let unique: BTreeSet<&str> = ids.into_iter().collect();
        let mut split: Vec<Vec<&str>> = unique.iter().map(|id| id.split('.').collect()).collect();
        // Segment-wise order puts the best prefix match of every id next to it.
        split.sort();

        let mut by_id = BTreeMap::new();
        for (i, segments) in split.iter().enumerate() {
            let before = i
                .checked_sub(1)
                .map(|j| common_leading_segments(segments, &split[j]))
                .unwrap_or(0);
            let after = split
                .get(i + 1)
                .map(|next| common_leading_segments(segments, next))
                .unwrap_or(0);

            let prefix = if segments.len() <= 1 {
                String::new()
            } else {
                let shared = before.max(after).clamp(1, segments.len() - 1);
                segments[..shared].join(".")
            };
            by_id.insert(segments.join("."), prefix);
        }

        Self { by_id }
    }

    pub fn prefix_for(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    /// Prefix → member ids, both in lexicographic order
    pub fn groups(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (id, prefix) in &self.by_id {
            groups.entry(prefix.as_str()).or_default().push(id.as_str());
        }
        groups
    }

    pub fn prefixes(&self) -> BTreeSet<&str> {
        self.by_id.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_namespace_groups_together() {
        let groups = NamespaceGroups::compute([
            "com.example.a",
            "com.example.b",
            "org.other.thing",
            "org.other.stuff",
        ]);
        assert_eq!(groups.prefix_for("com.example.a"), Some("com.example"));
        assert_eq!(groups.prefix_for("com.example.b"), Some("com.example"));
        assert_eq!(groups.prefix_for("org.other.thing"), Some("org.other"));
        assert_eq!(groups.groups().len(), 2);
    }

    #[test]
    fn test_trailing_segment_does_not_merge() {
        let groups = NamespaceGroups::compute(["com.alpha.post", "org.beta.post"]);
        assert_eq!(groups.prefix_for("com.alpha.post"), Some("com"));
        assert_eq!(groups.prefix_for("org.beta.post"), Some("org"));
    }

    #[test]
    fn test_prefix_never_covers_whole_id() {
        let groups = NamespaceGroups::compute(["com.example.foo", "com.example.foo.bar"]);
        assert_eq!(groups.prefix_for("com.example.foo"), Some("com.example"));
        assert_eq!(groups.prefix_for("com.example.foo.bar"), Some("com.example.foo"));
    }

    #[test]
    fn test_lone_document_keeps_first_segment() {
        let groups = NamespaceGroups::compute(["com.example.foo"]);
        assert_eq!(groups.prefix_for("com.example.foo"), Some("com"));
    }

    #[test]
    fn test_groups_cover_every_id_once() {
        let ids = ["a.b.c", "a.b.d", "a.x.y", "z.q.r", "a.b.c.e"];
        let groups = NamespaceGroups::compute(ids);
        let members: usize = groups.groups().values().map(Vec::len).sum();
        assert_eq!(members, ids.len());
        assert_eq!(groups.len(), ids.len());
    }
}
