// Dynamic AABB tree: a balanced binary tree of fat bounding boxes whose leaves are colliders.

use std::collections::HashMap;

use log::warn;

use crate::collision::aabb::AABB;
use crate::collision::collider::{ColliderId, ColliderSet};
use crate::config::DynamicTreeConfig;
use crate::math::{Ray, Vec2};
use crate::objects::BodySet;

use super::CollisionProcessor;

#[derive(Debug, Clone)]
struct TreeNode {
    parent: Option<usize>,
    /// `None` for leaves.
    children: Option<(usize, usize)>,
    bounds: AABB,
    height: i32,
    data: Option<ColliderId>,
}

impl TreeNode {
    fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Arena-backed AABB tree with perimeter-cost insertion and AVL-style rotations.
#[derive(Debug, Clone)]
pub struct DynamicTree {
    nodes: Vec<TreeNode>,
    free: Vec<usize>,
    root: Option<usize>,
    leaves: HashMap<ColliderId, usize>,
    config: DynamicTreeConfig,
}

impl DynamicTree {
    pub fn new(config: DynamicTreeConfig) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            leaves: HashMap::new(),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn contains(&self, id: ColliderId) -> bool {
        self.leaves.contains_key(&id)
    }

    /// Height of the tree; 0 when empty or holding a single leaf.
    pub fn height(&self) -> i32 {
        self.root.map_or(0, |r| self.nodes[r].height)
    }

    /// Fat bounds stored for a tracked collider.
    pub fn fat_bounds(&self, id: ColliderId) -> Option<AABB> {
        self.leaves.get(&id).map(|&n| self.nodes[n].bounds)
    }

    pub fn ids(&self) -> impl Iterator<Item = ColliderId> + '_ {
        self.leaves.keys().copied()
    }

    fn allocate(&mut self, node: TreeNode) -> usize {
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    /// Starts tracking `id` with its bounds padded by the initial padding. No-op if already tracked.
    pub fn track(&mut self, id: ColliderId, bounds: AABB) {
        if self.leaves.contains_key(&id) {
            return;
        }
        let leaf = self.allocate(TreeNode {
            parent: None,
            children: None,
            bounds: bounds.pad(self.config.initial_padding),
            height: 0,
            data: Some(id),
        });
        self.leaves.insert(id, leaf);
        self.insert_leaf(leaf);
    }

    pub fn untrack(&mut self, id: ColliderId) {
        if let Some(leaf) = self.leaves.remove(&id) {
            self.remove_leaf(leaf);
            self.free.push(leaf);
        }
    }

    /// Re-fits a tracked collider. Returns true if it was reinserted.
    ///
    /// A collider whose bounds leave the world bounds is untracked and will not collide again.
    pub fn update(&mut self, id: ColliderId, bounds: AABB, velocity: Vec2) -> bool {
        let Some(&leaf) = self.leaves.get(&id) else {
            return false;
        };
        if !self.config.world_bounds.contains(&bounds) {
            warn!("collider {id} is outside the world bounds and will no longer be tracked for physics");
            self.untrack(id);
            return false;
        }
        if self.nodes[leaf].bounds.contains(&bounds) {
            return false;
        }

        self.remove_leaf(leaf);
        let lookahead = velocity * (32.0 / 1000.0) * self.config.velocity_multiplier;
        self.nodes[leaf].bounds = bounds.pad(self.config.bounds_padding).extend(lookahead);
        self.insert_leaf(leaf);
        true
    }

    fn insert_leaf(&mut self, leaf: usize) {
        self.nodes[leaf].parent = None;
        let Some(mut index) = self.root else {
            self.root = Some(leaf);
            return;
        };

        // Walk down to the cheapest sibling
        let leaf_bounds = self.nodes[leaf].bounds;
        while let Some((left, right)) = self.nodes[index].children {
            let area = self.nodes[index].bounds.perimeter();
            let combined_area = self.nodes[index].bounds.combine(&leaf_bounds).perimeter();

            // Cost of making a new parent here
            let cost = 2.0 * combined_area;
            // Minimum cost of pushing the leaf further down
            let inheritance_cost = 2.0 * (combined_area - area);

            let descend_cost = |child: usize| {
                let node = &self.nodes[child];
                let combined = leaf_bounds.combine(&node.bounds).perimeter();
                if node.is_leaf() {
                    combined + inheritance_cost
                } else {
                    combined - node.bounds.perimeter() + inheritance_cost
                }
            };
            let left_cost = descend_cost(left);
            let right_cost = descend_cost(right);

            if cost < left_cost && cost < right_cost {
                break;
            }
            index = if left_cost < right_cost { left } else { right };
        }

        let sibling = index;
        let old_parent = self.nodes[sibling].parent;
        let parent_node = TreeNode {
            parent: old_parent,
            children: Some((sibling, leaf)),
            bounds: leaf_bounds.combine(&self.nodes[sibling].bounds),
            height: self.nodes[sibling].height + 1,
            data: None,
        };
        let new_parent = self.allocate(parent_node);
        match old_parent {
            Some(parent) => self.replace_child(parent, sibling, new_parent),
            None => self.root = Some(new_parent),
        }
        self.nodes[sibling].parent = Some(new_parent);
        self.nodes[leaf].parent = Some(new_parent);

        self.refit_upwards(Some(new_parent));
    }

    fn remove_leaf(&mut self, leaf: usize) {
        if self.root == Some(leaf) {
            self.root = None;
            return;
        }
        let Some(parent) = self.nodes[leaf].parent else {
            return;
        };
        let Some((left, right)) = self.nodes[parent].children else {
            return;
        };
        let sibling = if left == leaf { right } else { left };
        let grand_parent = self.nodes[parent].parent;
        self.free.push(parent);

        match grand_parent {
            Some(grand_parent) => {
                self.replace_child(grand_parent, parent, sibling);
                self.nodes[sibling].parent = Some(grand_parent);
                self.refit_upwards(Some(grand_parent));
            }
            None => {
                self.root = Some(sibling);
                self.nodes[sibling].parent = None;
            }
        }
        self.nodes[leaf].parent = None;
    }

    fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        if let Some((left, right)) = self.nodes[parent].children {
            self.nodes[parent].children = Some(if left == old { (new, right) } else { (left, new) });
        }
    }

    /// Walks to the root rebalancing and refitting heights and bounds.
    fn refit_upwards(&mut self, mut current: Option<usize>) {
        while let Some(index) = current {
            let index = self.balance(index);
            if let Some((left, right)) = self.nodes[index].children {
                self.nodes[index].height = 1 + self.nodes[left].height.max(self.nodes[right].height);
                self.nodes[index].bounds = self.nodes[left].bounds.combine(&self.nodes[right].bounds);
            }
            current = self.nodes[index].parent;
        }
    }

    /// Rotates the taller child up when the subtree heights differ by more than one.
    /// Returns the index now at this position.
    fn balance(&mut self, a: usize) -> usize {
        let Some((b, c)) = self.nodes[a].children else {
            return a;
        };
        if self.nodes[a].height < 2 {
            return a;
        }

        let balance = self.nodes[c].height - self.nodes[b].height;
        if balance > 1 {
            let Some((f, g)) = self.nodes[c].children else {
                return a;
            };
            self.lift(a, c);
            let (kept, moved) = if self.nodes[f].height > self.nodes[g].height { (f, g) } else { (g, f) };
            self.nodes[c].children = Some((a, kept));
            self.nodes[a].children = Some((b, moved));
            self.nodes[moved].parent = Some(a);
            self.refit_pair(a, b, moved, c, kept);
            return c;
        }
        if balance < -1 {
            let Some((d, e)) = self.nodes[b].children else {
                return a;
            };
            self.lift(a, b);
            let (kept, moved) = if self.nodes[d].height > self.nodes[e].height { (d, e) } else { (e, d) };
            self.nodes[b].children = Some((a, kept));
            self.nodes[a].children = Some((moved, c));
            self.nodes[moved].parent = Some(a);
            self.refit_pair(a, c, moved, b, kept);
            return b;
        }
        a
    }

    /// Puts `child` where `a` was and makes it `a`'s parent.
    fn lift(&mut self, a: usize, child: usize) {
        let grand_parent = self.nodes[a].parent;
        self.nodes[child].parent = grand_parent;
        self.nodes[a].parent = Some(child);
        match grand_parent {
            Some(g) => self.replace_child(g, a, child),
            None => self.root = Some(child),
        }
    }

    fn refit_pair(&mut self, a: usize, a_first: usize, a_second: usize, top: usize, top_second: usize) {
        self.nodes[a].bounds = self.nodes[a_first].bounds.combine(&self.nodes[a_second].bounds);
        self.nodes[a].height = 1 + self.nodes[a_first].height.max(self.nodes[a_second].height);
        self.nodes[top].bounds = self.nodes[a].bounds.combine(&self.nodes[top_second].bounds);
        self.nodes[top].height = 1 + self.nodes[a].height.max(self.nodes[top_second].height);
    }

    /// Leaves whose fat bounds overlap `bounds`.
    pub fn query(&self, bounds: &AABB) -> Vec<ColliderId> {
        self.collect_leaves(|node_bounds| node_bounds.overlaps(bounds))
    }

    /// Leaves whose fat bounds the ray enters within `max_distance`.
    pub fn ray_cast_query(&self, ray: &Ray, max_distance: f64) -> Vec<ColliderId> {
        self.collect_leaves(|node_bounds| node_bounds.ray_cast(ray, max_distance))
    }

    fn collect_leaves(&self, visit: impl Fn(&AABB) -> bool) -> Vec<ColliderId> {
        let mut found = Vec::new();
        let mut stack: Vec<usize> = self.root.into_iter().collect();
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !visit(&node.bounds) {
                continue;
            }
            match node.children {
                Some((left, right)) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => found.extend(node.data),
            }
        }
        found
    }
}

/// Broadphase backed by a `DynamicTree`.
#[derive(Debug, Clone)]
pub struct DynamicTreeProcessor {
    tree: DynamicTree,
}

impl DynamicTreeProcessor {
    pub fn new(config: DynamicTreeConfig) -> Self {
        Self {
            tree: DynamicTree::new(config),
        }
    }

    pub fn tree(&self) -> &DynamicTree {
        &self.tree
    }
}

impl CollisionProcessor for DynamicTreeProcessor {
    fn track(&mut self, id: ColliderId, colliders: &ColliderSet, bodies: &BodySet) {
        match colliders.bounds(id, bodies) {
            Some(bounds) => self.tree.track(id, bounds),
            None => warn!("cannot track collider {id}: no geometry"),
        }
    }

    fn untrack(&mut self, id: ColliderId) {
        self.tree.untrack(id);
    }

    fn tracked(&self) -> Vec<ColliderId> {
        let mut ids: Vec<ColliderId> = self.tree.ids().collect();
        ids.sort();
        ids
    }

    fn update(&mut self, colliders: &ColliderSet, bodies: &BodySet) -> usize {
        let mut updated = 0;
        for id in self.tracked() {
            let Some(collider) = colliders.get(id) else {
                self.tree.untrack(id);
                continue;
            };
            let Some(bounds) = colliders.bounds(id, bodies) else {
                continue;
            };
            let velocity = collider
                .owner
                .and_then(|h| bodies.get(h))
                .map_or(Vec2::ZERO, |b| b.linear_velocity);
            if self.tree.update(id, bounds, velocity) {
                updated += 1;
            }
        }
        updated
    }

    fn query(&self, bounds: &AABB) -> Vec<ColliderId> {
        self.tree.query(bounds)
    }

    fn ray_query(&self, ray: &Ray, max_distance: f64) -> Vec<ColliderId> {
        self.tree.ray_cast_query(ray, max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(x: f64, y: f64, size: f64) -> AABB {
        AABB::from_center(Vec2::new(x, y), size, size)
    }

    fn tree() -> DynamicTree {
        DynamicTree::new(DynamicTreeConfig::default())
    }

    #[test]
    fn test_track_pads_initial_bounds() {
        let mut t = tree();
        t.track(ColliderId(1), boxed(0.0, 0.0, 10.0));
        let fat = t.fat_bounds(ColliderId(1)).unwrap();
        assert_eq!(fat.min, Vec2::new(-7.0, -7.0));
        assert_eq!(fat.max, Vec2::new(7.0, 7.0));
        assert_eq!(t.height(), 0);
    }

    #[test]
    fn test_query_finds_overlapping_leaves() {
        let mut t = tree();
        for i in 0..20 {
            t.track(ColliderId(i), boxed(i as f64 * 50.0, 0.0, 10.0));
        }
        let mut hits = t.query(&boxed(100.0, 0.0, 4.0));
        hits.sort();
        assert_eq!(hits, vec![ColliderId(2)]);
        assert!(t.query(&boxed(0.0, 500.0, 4.0)).is_empty());
    }

    #[test]
    fn test_tree_stays_balanced() {
        let mut t = tree();
        for i in 0..64 {
            t.track(ColliderId(i), boxed(i as f64 * 20.0, 0.0, 10.0));
        }
        assert_eq!(t.len(), 64);
        // A balanced tree of 64 leaves needs at least 6 levels; AVL keeps it within a small factor
        assert!(t.height() >= 6 && t.height() <= 16, "height {}", t.height());

        for i in 0..64 {
            let mut hits = t.query(&boxed(i as f64 * 20.0, 0.0, 1.0));
            hits.sort();
            assert_eq!(hits, vec![ColliderId(i)]);
        }
    }

    #[test]
    fn test_untrack_removes_leaf() {
        let mut t = tree();
        for i in 0..5 {
            t.track(ColliderId(i), boxed(i as f64 * 50.0, 0.0, 10.0));
        }
        t.untrack(ColliderId(2));
        assert!(!t.contains(ColliderId(2)));
        assert!(t.query(&boxed(100.0, 0.0, 4.0)).is_empty());
        assert_eq!(t.query(&boxed(150.0, 0.0, 4.0)), vec![ColliderId(3)]);

        for i in [0, 1, 3, 4] {
            t.untrack(ColliderId(i));
        }
        assert!(t.is_empty());
        assert_eq!(t.height(), 0);
    }

    #[test]
    fn test_update_reinserts_only_when_leaving_fat_bounds() {
        let mut t = tree();
        t.track(ColliderId(1), boxed(0.0, 0.0, 10.0));
        assert!(!t.update(ColliderId(1), boxed(1.0, 0.0, 10.0), Vec2::ZERO));
        assert!(t.update(ColliderId(1), boxed(10.0, 0.0, 10.0), Vec2::new(1000.0, 0.0)));

        let fat = t.fat_bounds(ColliderId(1)).unwrap();
        assert_eq!(fat.min.x, 0.0);
        // padding 5 plus velocity 1000 * 32/1000 * 2 = 64
        assert!((fat.max.x - (15.0 + 5.0 + 64.0)).abs() < 1e-9);
    }

    #[test]
    fn test_leaving_world_bounds_untracks() {
        let config = DynamicTreeConfig {
            world_bounds: AABB::new(Vec2::new(-100.0, -100.0), Vec2::new(100.0, 100.0)),
            ..DynamicTreeConfig::default()
        };
        let mut t = DynamicTree::new(config);
        t.track(ColliderId(1), boxed(0.0, 0.0, 10.0));
        assert!(!t.update(ColliderId(1), boxed(200.0, 0.0, 10.0), Vec2::ZERO));
        assert!(!t.contains(ColliderId(1)));
    }

    #[test]
    fn test_ray_cast_query() {
        let mut t = tree();
        t.track(ColliderId(1), boxed(50.0, 0.0, 10.0));
        t.track(ColliderId(2), boxed(50.0, 100.0, 10.0));
        let ray = Ray::new(Vec2::ZERO, Vec2::RIGHT);
        assert_eq!(t.ray_cast_query(&ray, f64::INFINITY), vec![ColliderId(1)]);
        assert!(t.ray_cast_query(&ray, 10.0).is_empty());
    }
}
