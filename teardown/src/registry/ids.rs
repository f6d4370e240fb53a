//! Id prefix index.

use std::collections::BTreeSet;

use parking_lot::RwLock;
use teardown_shared::errors::{TeardownError, TeardownResult};

use crate::runtime::types::ContainerId;

/// Resolves unambiguous id prefixes to full container ids.
#[derive(Debug, Default)]
pub struct IdIndex {
    ids: RwLock<BTreeSet<ContainerId>>,
}

impl IdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, id: &ContainerId) {
        self.ids.write().insert(id.clone());
    }

    pub fn delete(&self, id: &ContainerId) {
        self.ids.write().remove(id);
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.ids.read().contains(id)
    }

    /// Find the single id starting with `prefix`.
    pub fn get(&self, prefix: &str) -> TeardownResult<ContainerId> {
        if prefix.is_empty() {
            return Err(TeardownError::InvalidArgument("empty id prefix".into()));
        }

        let ids = self.ids.read();
        // Ids sort lexicographically, so all matches are contiguous from
        // the first id >= prefix.
        let mut matches = ids
            .iter()
            .skip_while(|id| id.as_str() < prefix)
            .take_while(|id| id.starts_with(prefix));

        match (matches.next(), matches.next()) {
            (Some(id), None) => Ok(id.clone()),
            (None, _) => Err(TeardownError::NotFound(format!(
                "no container id matches prefix {}",
                prefix
            ))),
            (Some(_), Some(_)) => Err(TeardownError::InvalidArgument(format!(
                "multiple ids match prefix {}",
                prefix
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(prefix: &str) -> ContainerId {
        ContainerId::parse(&format!("{}{}", prefix, "0".repeat(64 - prefix.len()))).unwrap()
    }

    #[test]
    fn test_unique_prefix_resolves() {
        let index = IdIndex::new();
        let a = id("abc1");
        let b = id("abd2");
        index.add(&a);
        index.add(&b);

        assert_eq!(index.get("abc").unwrap(), a);
        assert_eq!(index.get(b.as_str()).unwrap(), b);
    }

    #[test]
    fn test_ambiguous_prefix() {
        let index = IdIndex::new();
        index.add(&id("abc1"));
        index.add(&id("abc2"));

        let err = index.get("abc").unwrap_err();
        assert!(err.to_string().contains("multiple ids"));
    }

    #[test]
    fn test_missing_and_empty_prefix() {
        let index = IdIndex::new();
        index.add(&id("abc1"));
        assert!(index.get("ffff").unwrap_err().is_not_found());
        assert!(index.get("").is_err());
    }

    #[test]
    fn test_delete() {
        let index = IdIndex::new();
        let a = id("abc1");
        index.add(&a);
        index.delete(&a);
        assert!(!index.contains(&a));
        index.delete(&a);
    }
}
