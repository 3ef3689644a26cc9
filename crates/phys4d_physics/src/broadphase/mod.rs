//! Broadphase: candidate pair discovery over the dynamic tree

mod dynamic_tree;

pub use dynamic_tree::{DynamicTree, NULL_NODE};

use phys4d_math::{Bounds4, Vec4};

use crate::collider::{ColliderKey, ProxyId};

/// Tracks collider proxies and reports overlapping pairs of moved proxies
#[derive(Debug)]
pub struct BroadPhase {
    tree: DynamicTree<ColliderKey>,
    /// Proxies inserted or re-fattened since the last pair update
    move_buffer: Vec<ProxyId>,
}

impl BroadPhase {
    pub fn new(margin: f32) -> Self {
        Self {
            tree: DynamicTree::new(margin),
            move_buffer: Vec::new(),
        }
    }

    pub fn tree(&self) -> &DynamicTree<ColliderKey> {
        &self.tree
    }

    pub fn proxy_count(&self) -> usize {
        self.tree.leaf_count()
    }

    pub fn insert_proxy(&mut self, aabb: Bounds4, collider: ColliderKey) -> ProxyId {
        let id = self.tree.insert(aabb, collider);
        self.move_buffer.push(id);
        id
    }

    pub fn remove_proxy(&mut self, id: ProxyId) {
        self.move_buffer.retain(|&moved| moved != id);
        self.tree.remove(id);
    }

    /// Refit a proxy; it is queued for pairing only if it left its fat bounds
    pub fn update_proxy(&mut self, id: ProxyId, aabb: Bounds4) {
        if self.tree.update(id, aabb) {
            self.move_buffer.push(id);
        }
    }

    /// Fat-bounds overlap test used to prune stale contacts
    pub fn test_overlap(&self, a: ProxyId, b: ProxyId) -> bool {
        self.tree.fat_aabb(a).overlaps(self.tree.fat_aabb(b))
    }

    pub fn fat_aabb(&self, id: ProxyId) -> &Bounds4 {
        self.tree.fat_aabb(id)
    }

    /// Append a pair for every proxy overlapping a moved proxy.
    ///
    /// Pairs are ordered by collider id. The same pair may be reported more
    /// than once when both of its proxies moved.
    pub fn update_pairs(&mut self, pairs: &mut Vec<(ColliderKey, ColliderKey)>) {
        for &moved in &self.move_buffer {
            let query = *self.tree.fat_aabb(moved);
            let a = self.tree.data(moved);
            self.tree.query(&query, |other| {
                if other != moved {
                    let b = self.tree.data(other);
                    pairs.push(if a.id() < b.id() { (a, b) } else { (b, a) });
                }
                true
            });
        }
        self.move_buffer.clear();
    }

    pub fn query<F>(&self, aabb: &Bounds4, mut callback: F)
    where
        F: FnMut(ColliderKey) -> bool,
    {
        self.tree.query(aabb, |id| callback(self.tree.data(id)));
    }

    pub fn raycast<F>(&self, start: Vec4, dir: Vec4, max_toi: f32, mut callback: F)
    where
        F: FnMut(ColliderKey, f32) -> Option<f32>,
    {
        self.tree
            .raycast(start, dir, max_toi, |id, best| callback(self.tree.data(id), best));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn cube(c: Vec4) -> Bounds4 {
        Bounds4::from_center_half_extents(c, Vec4::splat(0.5))
    }

    #[test]
    fn test_pairs_for_moved_proxies() {
        let mut keys: SlotMap<ColliderKey, ()> = SlotMap::with_key();
        let (a, b, c) = (keys.insert(()), keys.insert(()), keys.insert(()));
        let mut bp = BroadPhase::new(0.1);
        bp.insert_proxy(cube(Vec4::ZERO), a);
        bp.insert_proxy(cube(Vec4::new(0.5, 0.0, 0.0, 0.0)), b);
        bp.insert_proxy(cube(Vec4::new(0.0, 0.0, 0.0, 20.0)), c);

        let mut pairs = Vec::new();
        bp.update_pairs(&mut pairs);
        assert!(!pairs.is_empty());
        assert!(pairs.iter().all(|&p| p == (a, b)));

        // nothing moved, nothing reported
        pairs.clear();
        bp.update_pairs(&mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_small_move_not_buffered() {
        let mut keys: SlotMap<ColliderKey, ()> = SlotMap::with_key();
        let (a, b) = (keys.insert(()), keys.insert(()));
        let mut bp = BroadPhase::new(0.5);
        let pa = bp.insert_proxy(cube(Vec4::ZERO), a);
        bp.insert_proxy(cube(Vec4::new(0.5, 0.0, 0.0, 0.0)), b);
        let mut pairs = Vec::new();
        bp.update_pairs(&mut pairs);

        pairs.clear();
        bp.update_proxy(pa, cube(Vec4::new(0.1, 0.0, 0.0, 0.0)));
        bp.update_pairs(&mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_removed_proxy_leaves_move_buffer() {
        let mut keys: SlotMap<ColliderKey, ()> = SlotMap::with_key();
        let (a, b) = (keys.insert(()), keys.insert(()));
        let mut bp = BroadPhase::new(0.1);
        let pa = bp.insert_proxy(cube(Vec4::ZERO), a);
        bp.insert_proxy(cube(Vec4::ZERO), b);
        bp.remove_proxy(pa);
        let mut pairs = Vec::new();
        bp.update_pairs(&mut pairs);
        assert!(pairs.is_empty());
        assert_eq!(bp.proxy_count(), 1);
    }
}
