//! Dynamic AABB Tree
//!
//! A self-balancing binary tree of fattened AABBs used by the broad-phase.
//! Leaves are proxies carrying user data; internal nodes bound their
//! children.
//!
//! # Features
//!
//! - **Fat AABBs**: leaves are enlarged by `AABB_EXTENSION`, and moving
//!   proxies are further extended along their displacement, so small motions
//!   never touch the tree
//! - **Perimeter heuristic**: insertion descends towards the sibling that
//!   minimises combined-perimeter growth
//! - **Rotations**: AVL-style rebalancing keeps queries O(log n)
//! - **Moved flags**: re-inserted proxies are flagged so the broad-phase can
//!   limit pair searches to them

use crate::collision::{Aabb, RayCastInput};
use crate::math::Vec2;
use crate::settings::{AABB_EXTENSION, AABB_MULTIPLIER};

/// Null node sentinel
pub const NULL_NODE: u32 = u32::MAX;

/// A node in the dynamic AABB tree
#[derive(Clone, Debug)]
pub struct TreeNode<T> {
    /// Fat AABB
    pub aabb: Aabb,
    /// Parent node index (NULL_NODE if root), or next free node when pooled
    pub parent: u32,
    /// Left child (NULL_NODE if leaf)
    pub child1: u32,
    /// Right child (NULL_NODE if leaf)
    pub child2: u32,
    /// Height: 0 for leaves, -1 for free nodes
    pub height: i32,
    /// Payload, present on leaves only
    pub user_data: Option<T>,
    /// Re-inserted since the flag was last cleared
    pub moved: bool,
}

impl<T> TreeNode<T> {
    fn empty() -> Self {
        Self {
            aabb: Aabb::default(),
            parent: NULL_NODE,
            child1: NULL_NODE,
            child2: NULL_NODE,
            height: -1,
            user_data: None,
            moved: false,
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.child1 == NULL_NODE
    }
}

/// Dynamic AABB tree for the broad-phase.
#[derive(Clone, Debug)]
pub struct DynamicTree<T> {
    /// Node pool
    nodes: Vec<TreeNode<T>>,
    /// Indices of unused nodes
    free_list: Vec<u32>,
    /// Root node index
    root: u32,
    /// Live leaf count
    proxy_count: usize,
}

impl<T: Copy> DynamicTree<T> {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(16),
            free_list: Vec::new(),
            root: NULL_NODE,
            proxy_count: 0,
        }
    }

    /// Insert a proxy for the tight `aabb`; returns its id.
    pub fn create_proxy(&mut self, aabb: &Aabb, user_data: T) -> u32 {
        let proxy_id = self.alloc_node();
        let r = Vec2::new(AABB_EXTENSION, AABB_EXTENSION);
        {
            let node = &mut self.nodes[proxy_id as usize];
            node.aabb = Aabb::new(aabb.lower_bound - r, aabb.upper_bound + r);
            node.user_data = Some(user_data);
            node.height = 0;
            node.moved = true;
        }
        self.insert_leaf(proxy_id);
        self.proxy_count += 1;
        proxy_id
    }

    /// Remove a proxy.
    pub fn destroy_proxy(&mut self, proxy_id: u32) {
        if !self.is_leaf_id(proxy_id) {
            return;
        }
        self.remove_leaf(proxy_id);
        self.free_node(proxy_id);
        self.proxy_count -= 1;
    }

    /// Move a proxy to the tight `aabb` with a swept `displacement`.
    ///
    /// Returns true when the proxy was re-inserted. The fat AABB is kept as
    /// long as it still contains `aabb` and is not excessively large.
    pub fn move_proxy(&mut self, proxy_id: u32, aabb: &Aabb, displacement: Vec2) -> bool {
        if !self.is_leaf_id(proxy_id) {
            return false;
        }

        // extend by the margin, then predictively along the displacement
        let r = Vec2::new(AABB_EXTENSION, AABB_EXTENSION);
        let mut fat_aabb = Aabb::new(aabb.lower_bound - r, aabb.upper_bound + r);
        let d = displacement * AABB_MULTIPLIER;
        if d.x < 0.0 {
            fat_aabb.lower_bound.x += d.x;
        } else {
            fat_aabb.upper_bound.x += d.x;
        }
        if d.y < 0.0 {
            fat_aabb.lower_bound.y += d.y;
        } else {
            fat_aabb.upper_bound.y += d.y;
        }

        let tree_aabb = self.nodes[proxy_id as usize].aabb;
        if tree_aabb.contains(aabb) {
            // still enclosed, but it might have grown too large
            let big = r * 4.0;
            let huge_aabb = Aabb::new(fat_aabb.lower_bound - big, fat_aabb.upper_bound + big);
            if huge_aabb.contains(&tree_aabb) {
                return false;
            }
        }

        self.remove_leaf(proxy_id);
        self.nodes[proxy_id as usize].aabb = fat_aabb;
        self.insert_leaf(proxy_id);
        self.nodes[proxy_id as usize].moved = true;
        true
    }

    /// User data of a proxy
    #[inline]
    #[must_use]
    pub fn user_data(&self, proxy_id: u32) -> Option<T> {
        self.nodes.get(proxy_id as usize).and_then(|n| n.user_data)
    }

    /// Fat AABB of a proxy
    #[inline]
    #[must_use]
    pub fn fat_aabb(&self, proxy_id: u32) -> Aabb {
        self.nodes[proxy_id as usize].aabb
    }

    /// Whether the proxy was re-inserted since the last `clear_moved`
    #[inline]
    #[must_use]
    pub fn was_moved(&self, proxy_id: u32) -> bool {
        self.nodes[proxy_id as usize].moved
    }

    /// Reset the moved flag of a proxy
    #[inline]
    pub fn clear_moved(&mut self, proxy_id: u32) {
        self.nodes[proxy_id as usize].moved = false;
    }

    /// Number of live proxies
    #[inline]
    #[must_use]
    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }

    /// Visit every proxy whose fat AABB overlaps `aabb`.
    ///
    /// The callback returns false to stop the query.
    pub fn query<F: FnMut(u32) -> bool>(&self, aabb: &Aabb, mut callback: F) {
        if self.root == NULL_NODE {
            return;
        }

        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(node_id) = stack.pop() {
            if node_id == NULL_NODE {
                continue;
            }

            let node = &self.nodes[node_id as usize];
            if !node.aabb.overlaps(aabb) {
                continue;
            }

            if node.is_leaf() {
                if !callback(node_id) {
                    return;
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    /// Cast a ray against the proxies.
    ///
    /// The callback receives the (possibly clipped) input and a proxy id and
    /// returns the new maximum fraction: `0` terminates, a negative value
    /// ignores the proxy, a positive value clips the ray.
    pub fn ray_cast<F: FnMut(&RayCastInput, u32) -> f32>(&self, input: &RayCastInput, mut callback: F) {
        if self.root == NULL_NODE {
            return;
        }

        let p1 = input.p1;
        let p2 = input.p2;
        let r = (p2 - p1).normalize();

        // v is perpendicular to the segment
        let v = crate::math::cross_sv(1.0, r);
        let abs_v = v.abs();

        let mut max_fraction = input.max_fraction;

        let segment_aabb = |max_fraction: f32| {
            let t = p1 + (p2 - p1) * max_fraction;
            Aabb::new(p1.min(t), p1.max(t))
        };
        let mut seg_aabb = segment_aabb(max_fraction);

        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(node_id) = stack.pop() {
            if node_id == NULL_NODE {
                continue;
            }

            let node = &self.nodes[node_id as usize];
            if !node.aabb.overlaps(&seg_aabb) {
                continue;
            }

            // separating axis for segment: |dot(v, p1 - c)| > dot(|v|, h)
            let c = node.aabb.center();
            let h = node.aabb.extents();
            let separation = v.dot(p1 - c).abs() - abs_v.dot(h);
            if separation > 0.0 {
                continue;
            }

            if node.is_leaf() {
                let sub_input = RayCastInput {
                    p1,
                    p2,
                    max_fraction,
                };
                let value = callback(&sub_input, node_id);
                if value == 0.0 {
                    // client terminated the cast
                    return;
                }
                if value > 0.0 {
                    max_fraction = value;
                    seg_aabb = segment_aabb(max_fraction);
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    /// Tree height (0 when empty or a single leaf)
    #[must_use]
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.nodes[self.root as usize].height
        }
    }

    /// Largest height difference between two siblings
    #[must_use]
    pub fn max_balance(&self) -> i32 {
        self.nodes
            .iter()
            .filter(|n| n.height > 1)
            .map(|n| {
                let h1 = self.nodes[n.child1 as usize].height;
                let h2 = self.nodes[n.child2 as usize].height;
                (h2 - h1).abs()
            })
            .max()
            .unwrap_or(0)
    }

    /// Sum of node perimeters over the root perimeter.
    #[must_use]
    pub fn area_ratio(&self) -> f32 {
        if self.root == NULL_NODE {
            return 0.0;
        }
        let root_area = self.nodes[self.root as usize].aabb.perimeter();
        let total_area: f32 = self
            .nodes
            .iter()
            .filter(|n| n.height >= 0)
            .map(|n| n.aabb.perimeter())
            .sum();
        if root_area > 0.0 {
            total_area / root_area
        } else {
            0.0
        }
    }

    /// Check structure, heights, bounds and the free list.
    #[must_use]
    pub fn validate(&self) -> bool {
        if self.root != NULL_NODE && self.nodes[self.root as usize].parent != NULL_NODE {
            return false;
        }
        if !self.validate_node(self.root) {
            return false;
        }
        let free = self.nodes.iter().filter(|n| n.height < 0).count();
        if free != self.free_list.len() {
            return false;
        }
        let live = self.nodes.len() - free;
        let leaves = self.nodes.iter().filter(|n| n.height == 0).count();
        leaves == self.proxy_count && live == self.reachable(self.root) && self.height() == self.compute_height(self.root)
    }

    /// Rebuild an optimal-ish tree by greedy agglomeration. O(n^2).
    pub fn rebuild_bottom_up(&mut self) {
        let mut leaves: Vec<u32> = Vec::with_capacity(self.proxy_count);

        // free internal nodes, collect leaves
        for i in 0..self.nodes.len() {
            let id = i as u32;
            if self.nodes[i].height < 0 {
                continue;
            }
            if self.nodes[i].is_leaf() {
                self.nodes[i].parent = NULL_NODE;
                leaves.push(id);
            } else {
                self.free_node(id);
            }
        }

        while leaves.len() > 1 {
            let mut min_cost = f32::MAX;
            let (mut i_min, mut j_min) = (0, 1);
            for i in 0..leaves.len() {
                let aabb_i = self.nodes[leaves[i] as usize].aabb;
                for j in (i + 1)..leaves.len() {
                    let aabb_j = self.nodes[leaves[j] as usize].aabb;
                    let cost = aabb_i.combine(&aabb_j).perimeter();
                    if cost < min_cost {
                        i_min = i;
                        j_min = j;
                        min_cost = cost;
                    }
                }
            }

            let index1 = leaves[i_min];
            let index2 = leaves[j_min];

            let parent_id = self.alloc_node();
            let aabb = self.nodes[index1 as usize]
                .aabb
                .combine(&self.nodes[index2 as usize].aabb);
            let height = 1 + self.nodes[index1 as usize]
                .height
                .max(self.nodes[index2 as usize].height);
            {
                let parent = &mut self.nodes[parent_id as usize];
                parent.child1 = index1;
                parent.child2 = index2;
                parent.height = height;
                parent.aabb = aabb;
                parent.parent = NULL_NODE;
            }
            self.nodes[index1 as usize].parent = parent_id;
            self.nodes[index2 as usize].parent = parent_id;

            leaves[j_min] = leaves[leaves.len() - 1];
            leaves[i_min] = parent_id;
            leaves.pop();
        }

        self.root = leaves.first().copied().unwrap_or(NULL_NODE);
    }

    /// Shift every node by `-new_origin`.
    pub fn shift_origin(&mut self, new_origin: Vec2) {
        for node in &mut self.nodes {
            node.aabb.lower_bound -= new_origin;
            node.aabb.upper_bound -= new_origin;
        }
    }

    // =========== Internal methods ===========

    fn is_leaf_id(&self, proxy_id: u32) -> bool {
        self.nodes
            .get(proxy_id as usize)
            .is_some_and(|n| n.height == 0)
    }

    fn alloc_node(&mut self) -> u32 {
        let id = if let Some(id) = self.free_list.pop() {
            id
        } else {
            let id = self.nodes.len() as u32;
            self.nodes.push(TreeNode::empty());
            id
        };
        let node = &mut self.nodes[id as usize];
        *node = TreeNode::empty();
        node.height = 0;
        id
    }

    fn free_node(&mut self, node_id: u32) {
        self.nodes[node_id as usize] = TreeNode::empty();
        self.free_list.push(node_id);
    }

    fn insert_leaf(&mut self, leaf: u32) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf as usize].parent = NULL_NODE;
            return;
        }

        // find the best sibling
        let leaf_aabb = self.nodes[leaf as usize].aabb;
        let mut sibling = self.root;

        while !self.nodes[sibling as usize].is_leaf() {
            let child1 = self.nodes[sibling as usize].child1;
            let child2 = self.nodes[sibling as usize].child2;

            let area = self.nodes[sibling as usize].aabb.perimeter();
            let combined_area = leaf_aabb.combine(&self.nodes[sibling as usize].aabb).perimeter();

            // cost of creating a new parent for this node and the new leaf
            let cost = 2.0 * combined_area;
            // minimum cost of pushing the leaf further down
            let inheritance_cost = 2.0 * (combined_area - area);

            let cost1 = self.child_insertion_cost(child1, &leaf_aabb, inheritance_cost);
            let cost2 = self.child_insertion_cost(child2, &leaf_aabb, inheritance_cost);

            if cost < cost1 && cost < cost2 {
                break;
            }

            sibling = if cost1 < cost2 { child1 } else { child2 };
        }

        // new parent
        let old_parent = self.nodes[sibling as usize].parent;
        let new_parent = self.alloc_node();
        {
            let sibling_aabb = self.nodes[sibling as usize].aabb;
            let sibling_height = self.nodes[sibling as usize].height;
            let node = &mut self.nodes[new_parent as usize];
            node.parent = old_parent;
            node.aabb = leaf_aabb.combine(&sibling_aabb);
            node.height = sibling_height + 1;
            node.child1 = sibling;
            node.child2 = leaf;
        }

        if old_parent != NULL_NODE {
            if self.nodes[old_parent as usize].child1 == sibling {
                self.nodes[old_parent as usize].child1 = new_parent;
            } else {
                self.nodes[old_parent as usize].child2 = new_parent;
            }
        } else {
            self.root = new_parent;
        }
        self.nodes[sibling as usize].parent = new_parent;
        self.nodes[leaf as usize].parent = new_parent;

        // walk back up fixing heights and AABBs
        self.fix_upwards(self.nodes[leaf as usize].parent);
    }

    fn child_insertion_cost(&self, child: u32, leaf_aabb: &Aabb, inheritance: f32) -> f32 {
        let node = &self.nodes[child as usize];
        let combined = leaf_aabb.combine(&node.aabb);
        if node.is_leaf() {
            combined.perimeter() + inheritance
        } else {
            let old_area = node.aabb.perimeter();
            let new_area = combined.perimeter();
            (new_area - old_area) + inheritance
        }
    }

    fn remove_leaf(&mut self, leaf: u32) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf as usize].parent;
        let grand_parent = self.nodes[parent as usize].parent;
        let sibling = if self.nodes[parent as usize].child1 == leaf {
            self.nodes[parent as usize].child2
        } else {
            self.nodes[parent as usize].child1
        };

        if grand_parent != NULL_NODE {
            // reconnect the sibling to the grandparent
            if self.nodes[grand_parent as usize].child1 == parent {
                self.nodes[grand_parent as usize].child1 = sibling;
            } else {
                self.nodes[grand_parent as usize].child2 = sibling;
            }
            self.nodes[sibling as usize].parent = grand_parent;
            self.free_node(parent);

            self.fix_upwards(grand_parent);
        } else {
            self.root = sibling;
            self.nodes[sibling as usize].parent = NULL_NODE;
            self.free_node(parent);
        }
        self.nodes[leaf as usize].parent = NULL_NODE;
    }

    fn fix_upwards(&mut self, start: u32) {
        let mut node_id = start;
        while node_id != NULL_NODE {
            node_id = self.balance(node_id);

            let child1 = self.nodes[node_id as usize].child1;
            let child2 = self.nodes[node_id as usize].child2;
            let h1 = self.nodes[child1 as usize].height;
            let h2 = self.nodes[child2 as usize].height;
            let aabb = self.nodes[child1 as usize]
                .aabb
                .combine(&self.nodes[child2 as usize].aabb);

            let node = &mut self.nodes[node_id as usize];
            node.height = 1 + h1.max(h2);
            node.aabb = aabb;

            node_id = node.parent;
        }
    }

    /// Rotate `a` if its children's heights differ by more than one.
    /// Returns the index of the node now occupying `a`'s position.
    fn balance(&mut self, a: u32) -> u32 {
        let node = &self.nodes[a as usize];
        if node.is_leaf() || node.height < 2 {
            return a;
        }

        let b = node.child1;
        let c = node.child2;
        let balance = self.nodes[c as usize].height - self.nodes[b as usize].height;

        if balance > 1 {
            self.rotate_up(a, c, b, false)
        } else if balance < -1 {
            self.rotate_up(a, b, c, true)
        } else {
            a
        }
    }

    /// Promote child `up` of `a`; `other` is `a`'s remaining child.
    /// `up_is_child1` tells which slot of `a` `up` occupied.
    fn rotate_up(&mut self, a: u32, up: u32, other: u32, up_is_child1: bool) -> u32 {
        let f = self.nodes[up as usize].child1;
        let g = self.nodes[up as usize].child2;

        // swap a and up
        let a_parent = self.nodes[a as usize].parent;
        self.nodes[up as usize].child1 = a;
        self.nodes[up as usize].parent = a_parent;
        self.nodes[a as usize].parent = up;

        if a_parent != NULL_NODE {
            if self.nodes[a_parent as usize].child1 == a {
                self.nodes[a_parent as usize].child1 = up;
            } else {
                self.nodes[a_parent as usize].child2 = up;
            }
        } else {
            self.root = up;
        }

        // keep the taller grandchild under `up`, hand the other to `a`
        let (keep, give) = if self.nodes[f as usize].height > self.nodes[g as usize].height {
            (f, g)
        } else {
            (g, f)
        };
        self.nodes[up as usize].child2 = keep;
        if up_is_child1 {
            self.nodes[a as usize].child1 = give;
        } else {
            self.nodes[a as usize].child2 = give;
        }
        self.nodes[give as usize].parent = a;

        let a_aabb = self.nodes[other as usize]
            .aabb
            .combine(&self.nodes[give as usize].aabb);
        let a_height = 1 + self.nodes[other as usize]
            .height
            .max(self.nodes[give as usize].height);
        self.nodes[a as usize].aabb = a_aabb;
        self.nodes[a as usize].height = a_height;

        let up_aabb = a_aabb.combine(&self.nodes[keep as usize].aabb);
        let up_height = 1 + a_height.max(self.nodes[keep as usize].height);
        self.nodes[up as usize].aabb = up_aabb;
        self.nodes[up as usize].height = up_height;

        up
    }

    fn validate_node(&self, index: u32) -> bool {
        if index == NULL_NODE {
            return true;
        }
        let node = &self.nodes[index as usize];
        if node.is_leaf() {
            return node.child2 == NULL_NODE && node.height == 0 && node.user_data.is_some();
        }
        let (c1, c2) = (node.child1, node.child2);
        let (n1, n2) = (&self.nodes[c1 as usize], &self.nodes[c2 as usize]);
        if n1.parent != index || n2.parent != index {
            return false;
        }
        if node.height != 1 + n1.height.max(n2.height) {
            return false;
        }
        let aabb = n1.aabb.combine(&n2.aabb);
        if aabb.lower_bound != node.aabb.lower_bound || aabb.upper_bound != node.aabb.upper_bound {
            return false;
        }
        self.validate_node(c1) && self.validate_node(c2)
    }

    fn compute_height(&self, index: u32) -> i32 {
        if index == NULL_NODE {
            return 0;
        }
        let node = &self.nodes[index as usize];
        if node.is_leaf() {
            return 0;
        }
        1 + self.compute_height(node.child1).max(self.compute_height(node.child2))
    }

    fn reachable(&self, index: u32) -> usize {
        if index == NULL_NODE {
            return 0;
        }
        let node = &self.nodes[index as usize];
        if node.is_leaf() {
            1
        } else {
            1 + self.reachable(node.child1) + self.reachable(node.child2)
        }
    }
}

impl<T: Copy> Default for DynamicTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_aabb(x: f32, y: f32) -> Aabb {
        Aabb::new(Vec2::new(x, y), Vec2::new(x + 1.0, y + 1.0))
    }

    fn query_all(tree: &DynamicTree<u32>, aabb: &Aabb) -> Vec<u32> {
        let mut out = Vec::new();
        tree.query(aabb, |id| {
            if let Some(d) = tree.user_data(id) {
                out.push(d);
            }
            true
        });
        out
    }

    #[test]
    fn test_insert_and_query() {
        let mut tree = DynamicTree::new();
        tree.create_proxy(&make_aabb(0.0, 0.0), 0u32);
        tree.create_proxy(&make_aabb(10.0, 10.0), 1);
        tree.create_proxy(&make_aabb(20.0, 20.0), 2);
        assert_eq!(tree.proxy_count(), 3);
        assert!(tree.validate());

        let results = query_all(&tree, &make_aabb(-0.5, -0.5));
        assert!(results.contains(&0));
        assert!(!results.contains(&2));

        let all = query_all(&tree, &Aabb::new(Vec2::new(-100.0, -100.0), Vec2::new(100.0, 100.0)));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_fat_aabb_margin() {
        let mut tree = DynamicTree::new();
        let p = tree.create_proxy(&make_aabb(0.0, 0.0), 7u32);
        let fat = tree.fat_aabb(p);
        assert!((fat.lower_bound.x + AABB_EXTENSION).abs() < 1e-6);
        assert!((fat.upper_bound.y - 1.0 - AABB_EXTENSION).abs() < 1e-6);
        assert!(tree.was_moved(p));
        tree.clear_moved(p);
        assert!(!tree.was_moved(p));
    }

    #[test]
    fn test_destroy() {
        let mut tree = DynamicTree::new();
        let _p0 = tree.create_proxy(&make_aabb(0.0, 0.0), 0u32);
        let p1 = tree.create_proxy(&make_aabb(5.0, 5.0), 1);
        let _p2 = tree.create_proxy(&make_aabb(10.0, 10.0), 2);

        tree.destroy_proxy(p1);
        assert_eq!(tree.proxy_count(), 2);
        assert!(tree.validate());
        let all = query_all(&tree, &Aabb::new(Vec2::new(-100.0, -100.0), Vec2::new(100.0, 100.0)));
        assert!(!all.contains(&1));

        // destroying twice is harmless
        tree.destroy_proxy(p1);
        assert_eq!(tree.proxy_count(), 2);
    }

    #[test]
    fn test_move_within_fat_aabb_is_noop() {
        let mut tree = DynamicTree::new();
        let p0 = tree.create_proxy(&make_aabb(0.0, 0.0), 0u32);
        let tiny = Aabb::new(Vec2::new(0.05, 0.0), Vec2::new(1.05, 1.0));
        assert!(!tree.move_proxy(p0, &tiny, Vec2::new(0.05, 0.0)));
    }

    #[test]
    fn test_move_outside_reinserts_with_prediction() {
        let mut tree = DynamicTree::new();
        let p0 = tree.create_proxy(&make_aabb(0.0, 0.0), 0u32);
        tree.clear_moved(p0);

        let far = make_aabb(100.0, 100.0);
        assert!(tree.move_proxy(p0, &far, Vec2::new(1.0, 0.0)));
        assert!(tree.was_moved(p0));

        // extended along +x by AABB_MULTIPLIER * displacement
        let fat = tree.fat_aabb(p0);
        assert!((fat.upper_bound.x - (101.0 + AABB_EXTENSION + AABB_MULTIPLIER)).abs() < 1e-4);
        assert!((fat.lower_bound.x - (100.0 - AABB_EXTENSION)).abs() < 1e-4);

        assert!(query_all(&tree, &make_aabb(99.5, 99.5)).contains(&0));
    }

    #[test]
    fn test_ray_cast_clips_and_terminates() {
        let mut tree = DynamicTree::new();
        for i in 0..5 {
            tree.create_proxy(&make_aabb(2.0 * i as f32, 0.0), i as u32);
        }
        let input = RayCastInput {
            p1: Vec2::new(-1.0, 0.5),
            p2: Vec2::new(20.0, 0.5),
            max_fraction: 1.0,
        };

        let mut hits = 0;
        tree.ray_cast(&input, |sub, _| {
            hits += 1;
            sub.max_fraction
        });
        assert_eq!(hits, 5);

        let mut visited = 0;
        tree.ray_cast(&input, |_, _| {
            visited += 1;
            0.0
        });
        assert_eq!(visited, 1);
    }

    #[test]
    fn test_tree_balance() {
        let mut tree = DynamicTree::new();
        for i in 0..100 {
            tree.create_proxy(&make_aabb(3.0 * i as f32, 0.0), i as u32);
        }
        assert_eq!(tree.proxy_count(), 100);
        assert!(tree.validate());
        assert!(tree.height() < 20, "Tree should be balanced, height={}", tree.height());
        assert!(tree.max_balance() <= 2);
        assert!(tree.area_ratio() >= 1.0);
    }

    #[test]
    fn test_rebuild_bottom_up_and_shift() {
        let mut tree = DynamicTree::new();
        for i in 0..20 {
            tree.create_proxy(&make_aabb(i as f32, (i % 3) as f32), i as u32);
        }
        tree.rebuild_bottom_up();
        assert!(tree.validate());
        assert_eq!(query_all(&tree, &Aabb::new(Vec2::new(-5.0, -5.0), Vec2::new(50.0, 50.0))).len(), 20);

        tree.shift_origin(Vec2::new(100.0, 0.0));
        assert_eq!(query_all(&tree, &Aabb::new(Vec2::new(-105.0, -5.0), Vec2::new(-50.0, 50.0))).len(), 20);
    }

    #[test]
    fn test_empty_tree() {
        let tree: DynamicTree<u32> = DynamicTree::new();
        assert_eq!(tree.proxy_count(), 0);
        assert_eq!(tree.height(), 0);
        assert!(query_all(&tree, &make_aabb(0.0, 0.0)).is_empty());
        assert!(tree.validate());
    }
}
