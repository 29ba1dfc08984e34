//! Broad-Phase
//!
//! Wraps a [`DynamicTree`] and tracks which proxies moved since the last
//! pair update. `update_pairs` queries only around moved proxies and reports
//! every overlapping pair once, which is how new contacts are born.

use crate::collision::{Aabb, RayCastInput};
use crate::dynamic_tree::{DynamicTree, NULL_NODE};
use crate::math::Vec2;

/// Proxy id handed out by the broad-phase
pub type ProxyId = u32;

/// Sentinel for a proxy that does not exist
pub const NULL_PROXY: ProxyId = NULL_NODE;

/// Broad-phase pair management.
#[derive(Clone, Debug)]
pub struct BroadPhase<T> {
    tree: DynamicTree<T>,
    proxy_count: usize,
    move_buffer: Vec<ProxyId>,
    pair_buffer: Vec<(ProxyId, ProxyId)>,
}

impl<T: Copy> BroadPhase<T> {
    /// Create an empty broad-phase
    pub fn new() -> Self {
        Self {
            tree: DynamicTree::new(),
            proxy_count: 0,
            move_buffer: Vec::with_capacity(16),
            pair_buffer: Vec::with_capacity(16),
        }
    }

    /// Create a proxy with a tight AABB. Pairs are not reported until
    /// `update_pairs` is called.
    pub fn create_proxy(&mut self, aabb: &Aabb, user_data: T) -> ProxyId {
        let proxy_id = self.tree.create_proxy(aabb, user_data);
        self.proxy_count += 1;
        self.buffer_move(proxy_id);
        proxy_id
    }

    /// Destroy a proxy. Any pairs it belonged to are left to the caller.
    pub fn destroy_proxy(&mut self, proxy_id: ProxyId) {
        self.unbuffer_move(proxy_id);
        self.proxy_count = self.proxy_count.saturating_sub(1);
        self.tree.destroy_proxy(proxy_id);
    }

    /// Move a proxy; buffered for pair search only if the tree re-inserted it.
    pub fn move_proxy(&mut self, proxy_id: ProxyId, aabb: &Aabb, displacement: Vec2) {
        if self.tree.move_proxy(proxy_id, aabb, displacement) {
            self.buffer_move(proxy_id);
        }
    }

    /// Force a pair search for this proxy on the next update.
    pub fn touch_proxy(&mut self, proxy_id: ProxyId) {
        self.buffer_move(proxy_id);
    }

    /// Fat AABB of a proxy
    #[inline]
    #[must_use]
    pub fn fat_aabb(&self, proxy_id: ProxyId) -> Aabb {
        self.tree.fat_aabb(proxy_id)
    }

    /// User data of a proxy
    #[inline]
    #[must_use]
    pub fn user_data(&self, proxy_id: ProxyId) -> Option<T> {
        self.tree.user_data(proxy_id)
    }

    /// Whether two proxies' fat AABBs overlap
    #[inline]
    #[must_use]
    pub fn test_overlap(&self, proxy_a: ProxyId, proxy_b: ProxyId) -> bool {
        self.tree
            .fat_aabb(proxy_a)
            .overlaps(&self.tree.fat_aabb(proxy_b))
    }

    /// Number of live proxies
    #[inline]
    #[must_use]
    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }

    /// Report every new overlapping pair among moved proxies, sorted by
    /// proxy id and without duplicates.
    pub fn update_pairs<F: FnMut(T, T)>(&mut self, mut callback: F) {
        self.pair_buffer.clear();

        for &query_proxy in &self.move_buffer {
            if query_proxy == NULL_PROXY {
                continue;
            }

            let fat_aabb = self.tree.fat_aabb(query_proxy);
            let tree = &self.tree;
            let pairs = &mut self.pair_buffer;
            tree.query(&fat_aabb, |proxy_id| {
                if proxy_id == query_proxy {
                    return true;
                }
                // both moved: report the pair from the lower id only
                let moved = tree.was_moved(proxy_id);
                if moved && proxy_id > query_proxy {
                    return true;
                }
                pairs.push((proxy_id.min(query_proxy), proxy_id.max(query_proxy)));
                true
            });
        }

        self.pair_buffer.sort_unstable();
        self.pair_buffer.dedup();

        for &(a, b) in &self.pair_buffer {
            if let (Some(user_a), Some(user_b)) = (self.tree.user_data(a), self.tree.user_data(b)) {
                callback(user_a, user_b);
            }
        }

        for &proxy_id in &self.move_buffer {
            if proxy_id != NULL_PROXY {
                self.tree.clear_moved(proxy_id);
            }
        }
        self.move_buffer.clear();
    }

    /// Query proxies overlapping `aabb`; the callback returns false to stop.
    pub fn query<F: FnMut(ProxyId) -> bool>(&self, aabb: &Aabb, callback: F) {
        self.tree.query(aabb, callback);
    }

    /// Ray cast against proxies; see [`DynamicTree::ray_cast`].
    pub fn ray_cast<F: FnMut(&RayCastInput, ProxyId) -> f32>(&self, input: &RayCastInput, callback: F) {
        self.tree.ray_cast(input, callback);
    }

    /// Tree height
    #[inline]
    #[must_use]
    pub fn tree_height(&self) -> i32 {
        self.tree.height()
    }

    /// Tree balance
    #[inline]
    #[must_use]
    pub fn tree_balance(&self) -> i32 {
        self.tree.max_balance()
    }

    /// Tree quality (area ratio)
    #[inline]
    #[must_use]
    pub fn tree_quality(&self) -> f32 {
        self.tree.area_ratio()
    }

    /// Shift all proxies by `-new_origin`
    pub fn shift_origin(&mut self, new_origin: Vec2) {
        self.tree.shift_origin(new_origin);
    }

    fn buffer_move(&mut self, proxy_id: ProxyId) {
        self.move_buffer.push(proxy_id);
    }

    fn unbuffer_move(&mut self, proxy_id: ProxyId) {
        for slot in &mut self.move_buffer {
            if *slot == proxy_id {
                *slot = NULL_PROXY;
            }
        }
    }
}

impl<T: Copy> Default for BroadPhase<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(x: f32, y: f32) -> Aabb {
        Aabb::new(Vec2::new(x, y), Vec2::new(x + 1.0, y + 1.0))
    }

    fn collect_pairs(bp: &mut BroadPhase<u32>) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        bp.update_pairs(|a, b| out.push((a.min(b), a.max(b))));
        out.sort_unstable();
        out
    }

    #[test]
    fn test_new_proxies_report_pairs_once() {
        let mut bp = BroadPhase::new();
        bp.create_proxy(&unit_box(0.0, 0.0), 0u32);
        bp.create_proxy(&unit_box(0.5, 0.0), 1);
        bp.create_proxy(&unit_box(10.0, 0.0), 2);

        assert_eq!(collect_pairs(&mut bp), vec![(0, 1)]);
        // nothing moved since
        assert!(collect_pairs(&mut bp).is_empty());
    }

    #[test]
    fn test_move_into_overlap() {
        let mut bp = BroadPhase::new();
        bp.create_proxy(&unit_box(0.0, 0.0), 0u32);
        let p1 = bp.create_proxy(&unit_box(10.0, 0.0), 1);
        assert!(collect_pairs(&mut bp).is_empty());

        bp.move_proxy(p1, &unit_box(0.5, 0.0), Vec2::new(-9.5, 0.0));
        assert_eq!(collect_pairs(&mut bp), vec![(0, 1)]);
    }

    #[test]
    fn test_small_move_is_not_buffered() {
        let mut bp = BroadPhase::new();
        let p0 = bp.create_proxy(&unit_box(0.0, 0.0), 0u32);
        bp.create_proxy(&unit_box(0.5, 0.0), 1);
        collect_pairs(&mut bp);

        bp.move_proxy(p0, &unit_box(0.01, 0.0), Vec2::new(0.01, 0.0));
        assert!(collect_pairs(&mut bp).is_empty());

        bp.touch_proxy(p0);
        assert_eq!(collect_pairs(&mut bp), vec![(0, 1)]);
    }

    #[test]
    fn test_repeated_touch_reports_sorted_unique_pairs() {
        let mut bp = BroadPhase::new();
        let p0 = bp.create_proxy(&unit_box(0.0, 0.0), 0u32);
        bp.create_proxy(&unit_box(0.5, 0.0), 1);
        bp.create_proxy(&unit_box(0.2, 0.5), 2);
        collect_pairs(&mut bp);

        bp.touch_proxy(p0);
        bp.touch_proxy(p0);
        let mut raw = Vec::new();
        bp.update_pairs(|a, b| raw.push((a, b)));
        assert_eq!(raw, vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn test_destroyed_proxy_is_unbuffered() {
        let mut bp = BroadPhase::new();
        bp.create_proxy(&unit_box(0.0, 0.0), 0u32);
        let p1 = bp.create_proxy(&unit_box(0.5, 0.0), 1);
        bp.destroy_proxy(p1);
        assert_eq!(bp.proxy_count(), 1);
        assert!(collect_pairs(&mut bp).is_empty());
    }

    #[test]
    fn test_overlap_and_query() {
        let mut bp = BroadPhase::new();
        let a = bp.create_proxy(&unit_box(0.0, 0.0), 0u32);
        let b = bp.create_proxy(&unit_box(0.9, 0.0), 1);
        let c = bp.create_proxy(&unit_box(5.0, 0.0), 2);
        assert!(bp.test_overlap(a, b));
        assert!(!bp.test_overlap(a, c));

        let mut hits = 0;
        bp.query(&unit_box(4.5, 0.0), |_| {
            hits += 1;
            true
        });
        assert_eq!(hits, 1);
    }
}
