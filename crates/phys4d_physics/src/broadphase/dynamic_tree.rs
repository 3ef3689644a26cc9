//! Dynamic AABB tree
//!
//! A binary tree of fattened 4D bounds supporting incremental insert,
//! remove and update. Leaves carry a payload (the collider key); internal
//! nodes bound their two children.
//!
//! Nodes live in one contiguous array and are recycled through a singly
//! linked free list threaded through `next`. Storage doubles when the free
//! list runs dry, so a tree at steady state never allocates.
//!
//! Insertion descends toward the child whose bounds are closer to the new
//! leaf. There is no rebalancing pass: adversarial insert/remove patterns
//! can skew the tree, which costs query time but never correctness.

use phys4d_math::{Bounds4, Vec4};

/// Null node sentinel
pub const NULL_NODE: usize = usize::MAX;

const INITIAL_CAPACITY: usize = 16;
const INLINE_STACK: usize = 256;

#[derive(Clone, Debug)]
struct Node<T> {
    /// Fat bounds for leaves, union of children for internal nodes
    aabb: Bounds4,
    parent: usize,
    left: usize,
    right: usize,
    /// Free-list link, only meaningful for free nodes
    next: usize,
    /// 0 for leaves, -1 for free nodes
    height: i32,
    data: T,
}

impl<T: Copy + Default> Node<T> {
    fn free(next: usize) -> Self {
        Self {
            aabb: Bounds4::default(),
            parent: NULL_NODE,
            left: NULL_NODE,
            right: NULL_NODE,
            next,
            height: -1,
            data: T::default(),
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.right == NULL_NODE
    }
}

/// Traversal stack with inline storage; spills to the heap only for very deep trees
struct NodeStack {
    inline: [usize; INLINE_STACK],
    len: usize,
    spill: Vec<usize>,
}

impl NodeStack {
    fn new(root: usize) -> Self {
        let mut stack = Self {
            inline: [NULL_NODE; INLINE_STACK],
            len: 0,
            spill: Vec::new(),
        };
        stack.push(root);
        stack
    }

    #[inline]
    fn push(&mut self, id: usize) {
        if self.len < INLINE_STACK {
            self.inline[self.len] = id;
            self.len += 1;
        } else {
            self.spill.push(id);
        }
    }

    #[inline]
    fn pop(&mut self) -> Option<usize> {
        if let Some(id) = self.spill.pop() {
            return Some(id);
        }
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.inline[self.len])
    }
}

/// Incremental bounding-volume tree over fattened bounds
#[derive(Clone, Debug)]
pub struct DynamicTree<T> {
    nodes: Vec<Node<T>>,
    root: usize,
    free_list: usize,
    leaf_count: usize,
    margin: f32,
}

impl<T: Copy + Default> DynamicTree<T> {
    pub fn new(margin: f32) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NULL_NODE,
            free_list: NULL_NODE,
            leaf_count: 0,
            margin,
        };
        tree.grow(INITIAL_CAPACITY);
        tree
    }

    /// Fattening margin applied to inserted bounds
    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root == NULL_NODE
    }

    /// Height of the root, -1 when empty
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            -1
        } else {
            self.nodes[self.root].height
        }
    }

    /// Number of nodes reachable from the free list
    pub fn free_count(&self) -> usize {
        let mut count = 0;
        let mut id = self.free_list;
        while id != NULL_NODE {
            count += 1;
            id = self.nodes[id].next;
        }
        count
    }

    /// Insert a leaf and return its id
    pub fn insert(&mut self, aabb: Bounds4, data: T) -> usize {
        let id = self.allocate();
        {
            let node = &mut self.nodes[id];
            node.aabb = aabb.fattened(self.margin);
            node.data = data;
            node.height = 0;
        }
        self.insert_leaf(id);
        self.leaf_count += 1;
        id
    }

    /// Remove a leaf
    pub fn remove(&mut self, id: usize) {
        debug_assert!(id < self.nodes.len() && self.nodes[id].height == 0);
        self.remove_leaf(id);
        self.deallocate(id);
        self.leaf_count -= 1;
    }

    /// Move a leaf to new tight bounds.
    ///
    /// Returns false when the stored fat bounds still contain `aabb`;
    /// otherwise reinserts with freshly fattened bounds and returns true.
    pub fn update(&mut self, id: usize, aabb: Bounds4) -> bool {
        if self.nodes[id].aabb.contains(&aabb) {
            return false;
        }
        self.remove_leaf(id);
        self.nodes[id].aabb = aabb.fattened(self.margin);
        self.insert_leaf(id);
        true
    }

    pub fn fat_aabb(&self, id: usize) -> &Bounds4 {
        &self.nodes[id].aabb
    }

    pub fn data(&self, id: usize) -> T {
        self.nodes[id].data
    }

    /// Visit every leaf whose fat bounds overlap `aabb`.
    ///
    /// The callback returns false to stop the traversal.
    pub fn query<F>(&self, aabb: &Bounds4, mut callback: F)
    where
        F: FnMut(usize) -> bool,
    {
        if self.root == NULL_NODE {
            return;
        }
        let mut stack = NodeStack::new(self.root);
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !node.aabb.overlaps(aabb) {
                continue;
            }
            if node.is_leaf() {
                if !callback(id) {
                    return;
                }
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
    }

    /// Cast a ray through the tree.
    ///
    /// For each leaf whose fat bounds the ray touches within the current
    /// best distance, `callback(id, best)` may return a closer hit distance,
    /// which then prunes the rest of the traversal.
    pub fn raycast<F>(&self, start: Vec4, dir: Vec4, max_toi: f32, mut callback: F)
    where
        F: FnMut(usize, f32) -> Option<f32>,
    {
        if self.root == NULL_NODE {
            return;
        }
        let mut best = max_toi;
        let mut stack = NodeStack::new(self.root);
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.aabb.ray_intersect(start, dir, best).is_none() {
                continue;
            }
            if node.is_leaf() {
                if let Some(toi) = callback(id, best) {
                    if toi < best {
                        best = toi;
                    }
                }
            } else {
                stack.push(node.left);
                stack.push(node.right);
            }
        }
    }

    /// Check every structural invariant, returning a description of the first violation
    pub fn validate(&self) -> Result<(), String> {
        if self.root != NULL_NODE && self.nodes[self.root].parent != NULL_NODE {
            return Err("root has a parent".to_string());
        }

        let mut reachable = 0;
        let mut leaves = 0;
        if self.root != NULL_NODE {
            let mut stack = NodeStack::new(self.root);
            while let Some(id) = stack.pop() {
                reachable += 1;
                let node = &self.nodes[id];
                if node.height < 0 {
                    return Err(format!("free node {} is linked into the tree", id));
                }
                if node.is_leaf() {
                    leaves += 1;
                    if node.left != NULL_NODE || node.height != 0 {
                        return Err(format!("leaf {} has children or height", id));
                    }
                    continue;
                }
                let (l, r) = (node.left, node.right);
                if self.nodes[l].parent != id || self.nodes[r].parent != id {
                    return Err(format!("children of {} do not point back", id));
                }
                let expected = 1 + self.nodes[l].height.max(self.nodes[r].height);
                if node.height != expected {
                    return Err(format!("node {} height {} != {}", id, node.height, expected));
                }
                if !node.aabb.contains(&self.nodes[l].aabb) || !node.aabb.contains(&self.nodes[r].aabb) {
                    return Err(format!("node {} does not enclose its children", id));
                }
                stack.push(l);
                stack.push(r);
            }
        }

        if leaves != self.leaf_count {
            return Err(format!("found {} leaves, expected {}", leaves, self.leaf_count));
        }
        let free = self.free_count();
        if reachable + free != self.nodes.len() {
            return Err(format!(
                "{} tree nodes + {} free nodes != capacity {}",
                reachable,
                free,
                self.nodes.len()
            ));
        }
        Ok(())
    }

    fn grow(&mut self, new_capacity: usize) {
        let old = self.nodes.len();
        // link the new nodes in order, ending at the existing free list
        for i in old..new_capacity {
            let next = if i + 1 < new_capacity { i + 1 } else { self.free_list };
            self.nodes.push(Node::free(next));
        }
        self.free_list = old;
    }

    fn allocate(&mut self) -> usize {
        if self.free_list == NULL_NODE {
            let capacity = (self.nodes.len() * 2).max(INITIAL_CAPACITY);
            self.grow(capacity);
        }
        let id = self.free_list;
        self.free_list = self.nodes[id].next;
        let node = &mut self.nodes[id];
        node.parent = NULL_NODE;
        node.left = NULL_NODE;
        node.right = NULL_NODE;
        node.next = NULL_NODE;
        node.height = 0;
        id
    }

    fn deallocate(&mut self, id: usize) {
        self.nodes[id] = Node::free(self.free_list);
        self.free_list = id;
    }

    fn insert_leaf(&mut self, leaf: usize) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf].parent = NULL_NODE;
            return;
        }

        let leaf_aabb = self.nodes[leaf].aabb;
        let mut search = self.root;
        while !self.nodes[search].is_leaf() {
            let left = self.nodes[search].left;
            let right = self.nodes[search].right;
            let dl = self.nodes[left].aabb.proximity(&leaf_aabb);
            let dr = self.nodes[right].aabb.proximity(&leaf_aabb);
            search = if dl < dr { left } else { right };
        }

        let sibling = search;
        let old_parent = self.nodes[sibling].parent;
        let new_parent = self.allocate();
        {
            let sibling_aabb = self.nodes[sibling].aabb;
            let sibling_height = self.nodes[sibling].height;
            let node = &mut self.nodes[new_parent];
            node.parent = old_parent;
            node.left = sibling;
            node.right = leaf;
            node.aabb = leaf_aabb.union(&sibling_aabb);
            node.height = sibling_height + 1;
        }

        if old_parent == NULL_NODE {
            self.root = new_parent;
        } else if self.nodes[old_parent].left == sibling {
            self.nodes[old_parent].left = new_parent;
        } else {
            self.nodes[old_parent].right = new_parent;
        }
        self.nodes[sibling].parent = new_parent;
        self.nodes[leaf].parent = new_parent;

        self.sync_hierarchy(old_parent);
    }

    fn remove_leaf(&mut self, leaf: usize) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf].parent;
        let grandparent = self.nodes[parent].parent;
        let sibling = if self.nodes[parent].left == leaf {
            self.nodes[parent].right
        } else {
            self.nodes[parent].left
        };

        if grandparent == NULL_NODE {
            self.root = sibling;
            self.nodes[sibling].parent = NULL_NODE;
        } else {
            if self.nodes[grandparent].left == parent {
                self.nodes[grandparent].left = sibling;
            } else {
                self.nodes[grandparent].right = sibling;
            }
            self.nodes[sibling].parent = grandparent;
        }
        self.deallocate(parent);
        self.nodes[leaf].parent = NULL_NODE;
        self.sync_hierarchy(grandparent);
    }

    /// Refit heights and bounds from `id` up to the root
    fn sync_hierarchy(&mut self, mut id: usize) {
        while id != NULL_NODE {
            let left = self.nodes[id].left;
            let right = self.nodes[id].right;
            let height = 1 + self.nodes[left].height.max(self.nodes[right].height);
            let aabb = self.nodes[left].aabb.union(&self.nodes[right].aabb);
            let node = &mut self.nodes[id];
            node.height = height;
            node.aabb = aabb;
            id = node.parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(c: Vec4, half: f32) -> Bounds4 {
        Bounds4::from_center_half_extents(c, Vec4::splat(half))
    }

    fn grid_point(i: usize) -> Vec4 {
        Vec4::new((i % 5) as f32 * 3.0, (i / 5 % 5) as f32 * 3.0, 0.0, (i / 25) as f32 * 3.0)
    }

    #[test]
    fn test_insert_and_query() {
        let mut tree: DynamicTree<u32> = DynamicTree::new(0.1);
        let a = tree.insert(cube(Vec4::ZERO, 0.5), 1);
        let _b = tree.insert(cube(Vec4::new(10.0, 0.0, 0.0, 0.0), 0.5), 2);
        let c = tree.insert(cube(Vec4::new(0.0, 0.0, 0.0, 0.8), 0.5), 3);

        let mut found = Vec::new();
        tree.query(&cube(Vec4::ZERO, 0.5), |id| {
            found.push(tree.data(id));
            true
        });
        found.sort();
        assert_eq!(found, vec![1, 3]);
        assert!(tree.fat_aabb(a).contains(&cube(Vec4::ZERO, 0.5)));
        assert_eq!(tree.data(c), 3);
        tree.validate().unwrap();
    }

    #[test]
    fn test_query_stops_early() {
        let mut tree: DynamicTree<u32> = DynamicTree::new(0.1);
        for i in 0..10 {
            tree.insert(cube(Vec4::ZERO, 1.0), i);
        }
        let mut visits = 0;
        tree.query(&cube(Vec4::ZERO, 1.0), |_| {
            visits += 1;
            false
        });
        assert_eq!(visits, 1);
    }

    #[test]
    fn test_round_trip_returns_to_empty() {
        let mut tree: DynamicTree<usize> = DynamicTree::new(0.2);
        let ids: Vec<usize> = (0..100).map(|i| tree.insert(cube(grid_point(i), 0.5), i)).collect();
        assert_eq!(tree.leaf_count(), 100);
        tree.validate().unwrap();

        // remove in an interleaved order
        for &id in ids.iter().step_by(2).chain(ids.iter().skip(1).step_by(2)) {
            tree.remove(id);
            tree.validate().unwrap();
        }
        assert!(tree.is_empty());
        assert_eq!(tree.leaf_count(), 0);
        assert_eq!(tree.free_count(), tree.capacity());
    }

    #[test]
    fn test_update_within_fat_bounds() {
        let mut tree: DynamicTree<u32> = DynamicTree::new(0.5);
        let id = tree.insert(cube(Vec4::ZERO, 1.0), 7);
        assert!(!tree.update(id, cube(Vec4::new(0.2, 0.0, 0.0, 0.0), 1.0)));
        assert!(tree.update(id, cube(Vec4::new(5.0, 0.0, 0.0, 0.0), 1.0)));
        assert!(tree.fat_aabb(id).contains(&cube(Vec4::new(5.0, 0.0, 0.0, 0.0), 1.0)));
        assert_eq!(tree.data(id), 7);
        tree.validate().unwrap();
    }

    #[test]
    fn test_growth_keeps_ids_stable() {
        let mut tree: DynamicTree<usize> = DynamicTree::new(0.1);
        let first = tree.insert(cube(Vec4::ZERO, 0.5), 0);
        for i in 1..64 {
            tree.insert(cube(grid_point(i), 0.5), i);
        }
        assert!(tree.capacity() >= 127);
        assert_eq!(tree.data(first), 0);
        tree.validate().unwrap();
    }

    #[test]
    fn test_raycast_finds_closest() {
        let mut tree: DynamicTree<u32> = DynamicTree::new(0.0);
        let near = tree.insert(cube(Vec4::new(0.0, 0.0, 0.0, 3.0), 0.5), 1);
        let _far = tree.insert(cube(Vec4::new(0.0, 0.0, 0.0, 8.0), 0.5), 2);
        let _off = tree.insert(cube(Vec4::new(5.0, 0.0, 0.0, 3.0), 0.5), 3);

        let mut best = None;
        tree.raycast(Vec4::ZERO, Vec4::W, 20.0, |id, max| {
            let t = tree.fat_aabb(id).ray_intersect(Vec4::ZERO, Vec4::W, max)?;
            best = Some(id);
            Some(t)
        });
        assert_eq!(best, Some(near));
    }
}
