use std::collections::{HashMap, HashSet};

use jpics_domain::{Category, CategoryId};

/// Parent to children index over a category snapshot.
///
/// Parent links come from the server and may contain cycles, so every
/// traversal keeps a visited set and stops at the first repeated node.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    parents: HashMap<CategoryId, Option<CategoryId>>,
    children: HashMap<Option<CategoryId>, Vec<CategoryId>>,
}

impl CategoryTree {
    pub fn build(categories: &[Category]) -> Self {
        let mut tree = Self::default();
        for category in categories {
            tree.parents.insert(category.id, category.parent);
            tree.children
                .entry(category.parent)
                .or_default()
                .push(category.id);
        }
        for ids in tree.children.values_mut() {
            ids.sort();
        }
        tree
    }

    pub fn contains(&self, category: CategoryId) -> bool {
        self.parents.contains_key(&category)
    }

    pub fn children(&self, parent: Option<CategoryId>) -> &[CategoryId] {
        self.children
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// `root` followed by its descendants, depth first in child order.
    pub fn depth_first(&self, root: CategoryId) -> Vec<CategoryId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            order.push(current);
            for child in self.children(Some(current)).iter().rev() {
                if !visited.contains(child) {
                    stack.push(*child);
                }
            }
        }

        order
    }

    /// `category` followed by its ancestors up to the root.
    pub fn ancestors(&self, category: CategoryId) -> Vec<CategoryId> {
        let mut visited = HashSet::new();
        let mut chain = Vec::new();
        let mut current = Some(category);

        while let Some(id) = current {
            if !self.contains(id) || !visited.insert(id) {
                break;
            }
            chain.push(id);
            current = self.parents.get(&id).copied().flatten();
        }

        chain
    }

    /// True when `candidate` lies in the subtree rooted at `root`.
    pub fn is_within(&self, candidate: CategoryId, root: CategoryId) -> bool {
        self.ancestors(candidate).contains(&root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: i64) -> CategoryId {
        CategoryId::new(value).expect("id")
    }

    fn category(value: i64, parent: Option<i64>) -> Category {
        Category::new(id(value), format!("c{value}"), parent.map(id))
    }

    #[test]
    fn depth_first_follows_child_order() {
        let tree = CategoryTree::build(&[
            category(1, None),
            category(4, Some(1)),
            category(2, Some(1)),
            category(3, Some(2)),
            category(5, None),
        ]);

        assert_eq!(tree.depth_first(id(1)), vec![id(1), id(2), id(3), id(4)]);
        assert_eq!(tree.children(None), &[id(1), id(5)]);
        assert_eq!(tree.ancestors(id(3)), vec![id(3), id(2), id(1)]);
        assert!(tree.is_within(id(3), id(1)));
        assert!(!tree.is_within(id(5), id(1)));
    }

    #[test]
    fn cycles_terminate() {
        let tree = CategoryTree::build(&[category(1, Some(2)), category(2, Some(1))]);

        assert_eq!(tree.depth_first(id(1)), vec![id(1), id(2)]);
        assert_eq!(tree.ancestors(id(1)), vec![id(1), id(2)]);
    }
}
