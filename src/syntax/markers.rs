//! Markers: metadata attached to nodes without changing their text.
//!
//! Markers live in a side table keyed by [`NodeId`], so attaching one never
//! rebuilds the tree and never shows up when the tree is printed. The table
//! is a persistent map: snapshotting it before a recipe runs is a pointer
//! copy, which is how a failed or cancelled recipe is rolled back.

use std::sync::Arc;

use super::NodeId;
use crate::matcher::Bindings;

#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    /// A search recipe found something here.
    SearchResult {
        recipe: Arc<str>,
        description: Option<String>,
    },
    /// The matcher phase of a recipe rule selected this node.
    Matched {
        recipe: Arc<str>,
        rule: usize,
        bindings: Bindings,
    },
    /// This node was replaced by the named recipe.
    Applied { recipe: Arc<str> },
    /// This node was synthesized by the named recipe (e.g. an added import).
    Generated { recipe: Arc<str> },
    /// The named recipe replaced the generated import of `fqn` in this
    /// compilation unit; later requests for `fqn` are dropped.
    Displaced { recipe: Arc<str>, fqn: Arc<str> },
}

impl Marker {
    pub fn recipe(&self) -> &str {
        match self {
            Marker::SearchResult { recipe, .. }
            | Marker::Matched { recipe, .. }
            | Marker::Applied { recipe }
            | Marker::Generated { recipe }
            | Marker::Displaced { recipe, .. } => recipe,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Markers {
    entries: im::HashMap<NodeId, Vec<Marker>>,
}

impl Markers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: NodeId, marker: Marker) {
        match self.entries.get_mut(&id) {
            Some(list) => {
                if !list.contains(&marker) {
                    list.push(marker);
                }
            }
            None => {
                self.entries.insert(id, vec![marker]);
            }
        }
    }

    pub fn get(&self, id: NodeId) -> &[Marker] {
        self.entries.get(&id).map_or(&[], |list| list.as_slice())
    }

    pub fn has(&self, id: NodeId, mut predicate: impl FnMut(&Marker) -> bool) -> bool {
        self.get(id).iter().any(|m| predicate(m))
    }

    /// Bindings stored by the matcher phase of `recipe`'s rule `rule`.
    pub fn matched(&self, recipe: &str, rule: usize, id: NodeId) -> Option<&Bindings> {
        self.get(id).iter().find_map(|m| match m {
            Marker::Matched {
                recipe: r,
                rule: i,
                bindings,
            } if r.as_ref() == recipe && *i == rule => Some(bindings),
            _ => None,
        })
    }

    pub fn is_generated(&self, id: NodeId) -> bool {
        self.has(id, |m| matches!(m, Marker::Generated { .. }))
    }

    /// The recipe that displaced the generated import of `fqn` under `id`.
    pub fn displaced_by(&self, id: NodeId, fqn: &str) -> Option<&str> {
        self.get(id).iter().find_map(|m| match m {
            Marker::Displaced { recipe, fqn: f } if f.as_ref() == fqn => Some(recipe.as_ref()),
            _ => None,
        })
    }

    pub fn applied_by(&self, id: NodeId, recipe: &str) -> bool {
        self.has(id, |m| matches!(m, Marker::Applied { recipe: r } if r.as_ref() == recipe))
    }

    /// Drops every marker for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId, &Marker) -> bool) {
        let ids: Vec<NodeId> = self.entries.keys().copied().collect();
        for id in ids {
            if let Some(list) = self.entries.get_mut(&id) {
                list.retain(|m| keep(id, m));
                if list.is_empty() {
                    self.entries.remove(&id);
                }
            }
        }
    }

    /// Removes the transient `Matched` markers of one recipe.
    pub fn clear_matches(&mut self, recipe: &str) {
        self.retain(|_, m| !matches!(m, Marker::Matched { recipe: r, .. } if r.as_ref() == recipe));
    }

    /// All markers, ordered by node id.
    pub fn iter(&self) -> Vec<(NodeId, &Marker)> {
        let mut all: Vec<(NodeId, &Marker)> = self
            .entries
            .iter()
            .flat_map(|(id, list)| list.iter().map(move |m| (*id, m)))
            .collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    pub fn search_results(&self) -> Vec<(NodeId, &Marker)> {
        self.iter()
            .into_iter()
            .filter(|(_, m)| matches!(m, Marker::SearchResult { .. }))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
