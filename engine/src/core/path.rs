//! Identifier paths used to key recorded outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::script::{BlockSpec, Script};

/// Ancestor identifiers followed by the unit's own identifier.
///
/// Renders as a `/`-separated string. The experiment root has the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitPath(Vec<String>);

impl UnitPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from `/`-separated identifiers.
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn child(&self, id: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(id.to_string());
        Self(segments)
    }

    /// True if `self` equals `prefix` or lies beneath it.
    pub fn starts_with(&self, prefix: &UnitPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Path of the enclosing unit; `None` for the root.
    pub fn parent(&self) -> Option<UnitPath> {
        let (_, ancestors) = self.0.split_last()?;
        Some(Self(ancestors.to_vec()))
    }
}

impl fmt::Display for UnitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Return the paths of every page in `script` whose id is `page_id`.
///
/// Run-if rules name pages by id alone, so callers must reject zero or
/// multiple matches.
pub fn page_paths(script: &Script, page_id: &str) -> Vec<UnitPath> {
    let mut found = Vec::new();
    for block in &script.blocks {
        page_paths_inner(block, &UnitPath::root(), page_id, &mut found);
    }
    found
}

fn page_paths_inner(
    block: &BlockSpec,
    parent: &UnitPath,
    page_id: &str,
    found: &mut Vec<UnitPath>,
) {
    let path = parent.child(&block.id);
    for page in block.declared_pages() {
        if page.id == page_id {
            found.push(path.child(&page.id));
        }
    }
    for child in block.blocks.iter().flatten() {
        page_paths_inner(child, &path, page_id, found);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{branch, page, page_block};

    #[test]
    fn renders_slash_separated() {
        let path = UnitPath::root().child("outer").child("inner");
        assert_eq!(path.to_string(), "outer/inner");
        assert_eq!(UnitPath::parse("outer/inner"), path);
        assert_eq!(path.id(), Some("inner"));
        assert_eq!(path.parent(), Some(UnitPath::parse("outer")));
        assert_eq!(UnitPath::root().parent(), None);
    }

    #[test]
    fn starts_with_matches_self_and_descendants_only() {
        let block = UnitPath::parse("a/b");
        assert!(UnitPath::parse("a/b").starts_with(&block));
        assert!(UnitPath::parse("a/b/p1").starts_with(&block));
        assert!(!UnitPath::parse("a/bc").starts_with(&block));
        assert!(!UnitPath::parse("a").starts_with(&block));
    }

    #[test]
    fn page_paths_finds_nested_pages() {
        let script = Script {
            blocks: vec![
                page_block("intro", vec![page("consent")]),
                branch("main", vec![page_block("train", vec![page("q1"), page("q2")])]),
            ],
            ..Script::default()
        };
        assert_eq!(
            page_paths(&script, "q2"),
            vec![UnitPath::parse("main/train/q2")]
        );
        assert!(page_paths(&script, "missing").is_empty());
    }
}
