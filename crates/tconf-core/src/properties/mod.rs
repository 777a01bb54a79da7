//! Hierarchical property store addressed by dot-separated key paths.
//!
//! Leaves are strings. Internal nodes are maps keyed either by a fixed
//! setting name or by an operator-chosen member alias.

mod file;
pub mod interrupt;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use file::{CONFIG_HEADER, parse_properties, to_flat_string, to_json_string};

/// A node in the property tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Value(String),
    Map(BTreeMap<String, Node>),
}

impl Node {
    fn collect_leaves(&self, prefix: &str, out: &mut Vec<String>) {
        match self {
            Node::Value(_) => out.push(prefix.to_string()),
            Node::Map(children) => {
                for (key, child) in children {
                    child.collect_leaves(&join_path(prefix, key), out);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyStore {
    root: BTreeMap<String, Node>,
}

/// Join two key path fragments, skipping empty ones.
pub fn join_path(prefix: &str, key: &str) -> String {
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{prefix}.{key}"),
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Look up a node at `path`.
    pub fn node(&self, path: &str) -> Option<&Node> {
        let parts = segments(path);
        let (last, parents) = parts.split_last()?;
        let mut map = &self.root;
        for part in parents {
            match map.get(*part)? {
                Node::Map(children) => map = children,
                Node::Value(_) => return None,
            }
        }
        map.get(*last)
    }

    /// Get the scalar value at `path`. Returns `None` for missing keys and maps.
    pub fn get(&self, path: &str) -> Option<&str> {
        match self.node(path)? {
            Node::Value(value) => Some(value.as_str()),
            Node::Map(_) => None,
        }
    }

    pub fn get_or(&self, path: &str, default: &str) -> String {
        self.get(path).unwrap_or(default).to_string()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.node(path).is_some()
    }

    /// Set the value at `path`, creating intermediate maps as needed.
    ///
    /// A `None` or empty value removes the leaf instead.
    pub fn set(&mut self, path: &str, value: Option<&str>) {
        let value = match value {
            Some(v) if !v.is_empty() => v,
            _ => {
                self.remove(path);
                return;
            }
        };

        let parts = segments(path);
        let Some((last, parents)) = parts.split_last() else {
            return;
        };
        let mut map = &mut self.root;
        for part in parents {
            let entry = map
                .entry(part.to_string())
                .or_insert_with(|| Node::Map(BTreeMap::new()));
            if let Node::Value(_) = entry {
                *entry = Node::Map(BTreeMap::new());
            }
            let Node::Map(children) = entry else {
                return;
            };
            map = children;
        }
        map.insert(last.to_string(), Node::Value(value.to_string()));
    }

    /// Remove the node at `path` and prune any maps left empty by the removal.
    pub fn remove(&mut self, path: &str) -> Option<Node> {
        let parts = segments(path);
        if parts.is_empty() {
            return None;
        }
        remove_in(&mut self.root, &parts)
    }

    /// Every dot-joined path that ends in a scalar.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (key, node) in &self.root {
            node.collect_leaves(key, &mut out);
        }
        out
    }

    /// Child keys of the map at `path`, in sorted order.
    pub fn child_keys(&self, path: &str) -> Vec<String> {
        let map = if segments(path).is_empty() {
            Some(&self.root)
        } else {
            match self.node(path) {
                Some(Node::Map(children)) => Some(children),
                _ => None,
            }
        };
        map.map(|m| m.keys().cloned().collect()).unwrap_or_default()
    }

    /// Keys under `path` whose nodes are maps, i.e. group member aliases.
    pub fn member_aliases(&self, path: &str) -> Vec<String> {
        match self.node(path) {
            Some(Node::Map(children)) => children
                .iter()
                .filter(|(_, node)| matches!(node, Node::Map(_)))
                .map(|(key, _)| key.clone())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// A detached copy of the map at `path`, rooted at its children.
    pub fn subtree(&self, path: &str) -> PropertyStore {
        match self.node(path) {
            Some(Node::Map(children)) => PropertyStore {
                root: children.clone(),
            },
            _ => PropertyStore::new(),
        }
    }

    /// Keep only the children of the map at `path` accepted by `keep`.
    pub fn retain_children(&mut self, path: &str, mut keep: impl FnMut(&str, &Node) -> bool) {
        let doomed: Vec<String> = match self.node(path) {
            Some(Node::Map(children)) => children
                .iter()
                .filter(|(key, node)| !keep(key, node))
                .map(|(key, _)| key.clone())
                .collect(),
            _ => return,
        };
        for key in doomed {
            self.remove(&join_path(path, &key));
        }
    }

    /// Copy every leaf of `other` into this store, overriding existing values.
    pub fn import(&mut self, other: &PropertyStore) {
        for path in other.leaf_paths() {
            self.set(&path, other.get(&path));
        }
    }
}

fn remove_in(map: &mut BTreeMap<String, Node>, parts: &[&str]) -> Option<Node> {
    let (first, rest) = parts.split_first()?;
    if rest.is_empty() {
        return map.remove(*first);
    }
    let (removed, now_empty) = match map.get_mut(*first)? {
        Node::Map(children) => {
            let removed = remove_in(children, rest);
            (removed, children.is_empty())
        }
        Node::Value(_) => return None,
    };
    if now_empty {
        map.remove(*first);
    }
    removed
}
