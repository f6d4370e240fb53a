//! Legacy container links.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::runtime::types::ContainerId;

/// Bidirectional link graph.
///
/// `parent → (full alias name → child)` and the reverse
/// `child → (parent → full alias name)`, kept in step under one lock.
#[derive(Debug, Default)]
pub struct LinkIndex {
    inner: Mutex<LinkIndexInner>,
}

#[derive(Debug, Default)]
struct LinkIndexInner {
    children: HashMap<ContainerId, HashMap<String, ContainerId>>,
    parents: HashMap<ContainerId, HashMap<ContainerId, String>>,
}

impl LinkIndexInner {
    fn remove_edge(&mut self, parent: &ContainerId, name: &str, child: &ContainerId) {
        if let Some(aliases) = self.children.get_mut(parent) {
            aliases.remove(name);
            if aliases.is_empty() {
                self.children.remove(parent);
            }
        }
        if let Some(parents) = self.parents.get_mut(child) {
            parents.remove(parent);
            if parents.is_empty() {
                self.parents.remove(child);
            }
        }
    }
}

impl LinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `parent` reaches `child` under the full alias `name`.
    pub fn link(&self, parent: &ContainerId, name: &str, child: &ContainerId) {
        let mut inner = self.inner.lock();
        inner
            .children
            .entry(parent.clone())
            .or_default()
            .insert(name.to_string(), child.clone());
        inner
            .parents
            .entry(child.clone())
            .or_default()
            .insert(parent.clone(), name.to_string());
    }

    /// Remove the `name` edge between `parent` and `child`. Missing edges
    /// are ignored.
    pub fn unlink(&self, name: &str, child: &ContainerId, parent: &ContainerId) {
        self.inner.lock().remove_edge(parent, name, child);
    }

    /// Aliases `parent` holds, keyed by full name.
    pub fn children(&self, parent: &ContainerId) -> HashMap<String, ContainerId> {
        self.inner
            .lock()
            .children
            .get(parent)
            .cloned()
            .unwrap_or_default()
    }

    /// Containers linking to `child`, with the alias each uses.
    pub fn parents(&self, child: &ContainerId) -> HashMap<ContainerId, String> {
        self.inner
            .lock()
            .parents
            .get(child)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove every edge touching `id`, as parent or child.
    ///
    /// Returns the full alias names of the edges removed, so the caller can
    /// release them from the name index.
    pub fn delete(&self, id: &ContainerId) -> Vec<String> {
        let mut inner = self.inner.lock();
        let mut aliases = Vec::new();

        if let Some(children) = inner.children.remove(id) {
            for (name, child) in children {
                if let Some(parents) = inner.parents.get_mut(&child) {
                    parents.remove(id);
                    if parents.is_empty() {
                        inner.parents.remove(&child);
                    }
                }
                aliases.push(name);
            }
        }

        if let Some(parents) = inner.parents.remove(id) {
            for (parent, name) in parents {
                inner.remove_edge(&parent, &name, id);
                aliases.push(name);
            }
        }

        aliases.sort();
        aliases
    }

    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock();
        inner.children.is_empty() && inner.parents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_unlink() {
        let links = LinkIndex::new();
        let web = ContainerId::new();
        let db = ContainerId::new();

        links.link(&web, "/web/db", &db);
        assert_eq!(links.children(&web).get("/web/db"), Some(&db));
        assert_eq!(links.parents(&db).get(&web).map(String::as_str), Some("/web/db"));

        links.unlink("/web/db", &db, &web);
        assert!(links.is_empty());

        // Unlinking again is harmless.
        links.unlink("/web/db", &db, &web);
    }

    #[test]
    fn test_delete_parent_clears_child_back_refs() {
        let links = LinkIndex::new();
        let web = ContainerId::new();
        let db = ContainerId::new();
        let cache = ContainerId::new();
        links.link(&web, "/web/db", &db);
        links.link(&web, "/web/cache", &cache);

        let aliases = links.delete(&web);
        assert_eq!(aliases, vec!["/web/cache".to_string(), "/web/db".to_string()]);
        assert!(links.parents(&db).is_empty());
        assert!(links.is_empty());
    }

    #[test]
    fn test_delete_child_clears_parent_edges() {
        let links = LinkIndex::new();
        let web = ContainerId::new();
        let api = ContainerId::new();
        let db = ContainerId::new();
        links.link(&web, "/web/db", &db);
        links.link(&api, "/api/database", &db);

        let aliases = links.delete(&db);
        assert_eq!(aliases, vec!["/api/database".to_string(), "/web/db".to_string()]);
        assert!(links.children(&web).is_empty());
        assert!(links.children(&api).is_empty());
        assert!(links.is_empty());
    }
}
