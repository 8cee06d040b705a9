//! Selection set of active entities.

use crate::position::EntityRef;
use std::collections::HashSet;

/// The set of selected ("active") entities.
///
/// All operations are total. Mutating methods return `true` when the set
/// actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    entities: HashSet<EntityRef>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Click or tap on an entity.
    ///
    /// Non-additive taps replace the selection with `{entity}`. Additive
    /// taps (shift/ctrl held) toggle membership.
    pub fn tap(&mut self, entity: &EntityRef, additive: bool) -> bool {
        if additive {
            if !self.entities.remove(entity) {
                self.entities.insert(entity.clone());
            }
            return true;
        }

        if self.entities.len() == 1 && self.entities.contains(entity) {
            return false;
        }
        self.entities.clear();
        self.entities.insert(entity.clone());
        true
    }

    /// Apply the entities enclosed by a rubber band.
    ///
    /// Additive mode unions `enclosed` with `base` (the selection captured
    /// when the band started). Otherwise the selection becomes exactly
    /// `enclosed`, which may be empty.
    pub fn rubber_band_commit(
        &mut self,
        enclosed: &HashSet<EntityRef>,
        additive: bool,
        base: Option<&Selection>,
    ) -> bool {
        let next: HashSet<EntityRef> = match (additive, base) {
            (true, Some(base)) => base.entities.union(enclosed).cloned().collect(),
            _ => enclosed.clone(),
        };
        self.replace(next)
    }

    /// Select every given entity.
    pub fn select_all<'a>(&mut self, all: impl IntoIterator<Item = &'a EntityRef>) -> bool {
        self.replace(all.into_iter().cloned().collect())
    }

    /// Deselect everything.
    pub fn clear(&mut self) -> bool {
        if self.entities.is_empty() {
            return false;
        }
        self.entities.clear();
        true
    }

    /// Drop entries rejected by `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&EntityRef) -> bool) -> bool {
        let before = self.entities.len();
        self.entities.retain(|entity| keep(entity));
        self.entities.len() != before
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.entities.contains(entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRef> {
        self.entities.iter()
    }

    /// Selected entities in the order they appear in `order`.
    pub fn ordered<'a>(&self, order: &'a [EntityRef]) -> Vec<&'a EntityRef> {
        order.iter().filter(|e| self.entities.contains(*e)).collect()
    }

    fn replace(&mut self, next: HashSet<EntityRef>) -> bool {
        if next == self.entities {
            return false;
        }
        self.entities = next;
        true
    }
}

impl FromIterator<EntityRef> for Selection {
    fn from_iter<I: IntoIterator<Item = EntityRef>>(iter: I) -> Self {
        Self {
            entities: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(name: &str) -> EntityRef {
        EntityRef::new(name)
    }

    fn set(names: &[&str]) -> HashSet<EntityRef> {
        names.iter().map(|n| e(n)).collect()
    }

    #[test]
    fn test_tap_replaces() {
        let mut selection: Selection = [e("a"), e("b")].into_iter().collect();
        assert!(selection.tap(&e("c"), false));
        assert_eq!(selection.len(), 1);
        assert!(selection.contains(&e("c")));
        assert!(!selection.tap(&e("c"), false));
    }

    #[test]
    fn test_additive_tap_toggles_back() {
        let mut selection: Selection = [e("a")].into_iter().collect();
        let original = selection.clone();
        selection.tap(&e("b"), true);
        assert!(selection.contains(&e("b")));
        selection.tap(&e("b"), true);
        assert_eq!(selection, original);
    }

    #[test]
    fn test_rubber_band_additive_union() {
        let base: Selection = [e("A"), e("B")].into_iter().collect();
        let mut selection = base.clone();
        selection.rubber_band_commit(&set(&["B", "C"]), true, Some(&base));
        let expected: Selection = [e("A"), e("B"), e("C")].into_iter().collect();
        assert_eq!(selection, expected);
    }

    #[test]
    fn test_rubber_band_replace() {
        let mut selection: Selection = [e("A")].into_iter().collect();
        selection.rubber_band_commit(&set(&["B"]), false, None);
        assert!(!selection.contains(&e("A")));
        assert!(selection.contains(&e("B")));
    }

    #[test]
    fn test_rubber_band_empty_deselects() {
        let mut selection: Selection = [e("A")].into_iter().collect();
        assert!(selection.rubber_band_commit(&HashSet::new(), false, None));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_select_all_and_clear() {
        let all = vec![e("a"), e("b")];
        let mut selection = Selection::new();
        assert!(selection.select_all(&all));
        assert_eq!(selection.len(), 2);
        assert!(!selection.select_all(&all));
        assert!(selection.clear());
        assert!(!selection.clear());
    }

    #[test]
    fn test_retain_prunes() {
        let mut selection: Selection = [e("a"), e("b")].into_iter().collect();
        assert!(selection.retain(|entity| entity.as_str() == "a"));
        assert_eq!(selection.ordered(&[e("b"), e("a")]), vec![&e("a")]);
    }
}
