//! Scope: capability predicate restricting which nodes a handler applies to.

use crate::tree::SourceNode;
use std::collections::BTreeSet;

/// Named set of capability tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    name: String,
    tags: BTreeSet<String>,
}

impl Scope {
    /// Create a scope registered as `<transform>.<name>`
    pub fn new<I, S>(transform: &str, name: &str, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: format!("{}.{}", transform, name),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Qualified name, `<transform>.<scope>`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// True iff the tag sets intersect
    pub fn matches_tags(&self, tags: &BTreeSet<String>) -> bool {
        !self.tags.is_disjoint(tags)
    }

    pub fn matches(&self, node: &SourceNode<'_>) -> bool {
        self.matches_tags(node.tags())
    }
}
