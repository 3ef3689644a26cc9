//! Clipping scratch space and contact reduction
//!
//! The incident hyperface of a box is a 3-cube: 8 vertices joined by 12
//! edges. It is clipped as an edge list against half-spaces; every cut
//! appends its intersection point to the shared vertex buffer and the edge
//! keeps its inside end. Buffers are cleared, never freed, so clipping does
//! not allocate once they have grown to their working size.

use phys4d_math::Vec4;

use super::{ContactPoint, Manifold, MAX_MANIFOLD_POINTS};

/// Points closer than this are merged
const MERGE_DISTANCE_SQ: f32 = 1.0e-6;

/// Reusable buffers for box clipping
#[derive(Clone, Debug, Default)]
pub struct ClipBuffers {
    pub(crate) vertices: Vec<Vec4>,
    edges: Vec<(usize, usize)>,
    next_edges: Vec<(usize, usize)>,
    used: Vec<bool>,
    pub(crate) candidates: Vec<ContactPoint>,
}

impl ClipBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a 3-cube: 8 corners indexed by 3 sign bits, edges join corners one bit apart
    pub(crate) fn load_cell(&mut self, corners: &[Vec4; 8]) {
        self.vertices.clear();
        self.edges.clear();
        self.candidates.clear();
        self.vertices.extend_from_slice(corners);
        for i in 0..8usize {
            for bit in [1usize, 2, 4] {
                let j = i | bit;
                if j != i {
                    self.edges.push((i, j));
                }
            }
        }
    }

    /// Keep the part of every edge where `normal · x <= offset`
    pub(crate) fn clip(&mut self, normal: Vec4, offset: f32) {
        self.next_edges.clear();
        for &(i, j) in &self.edges {
            let (vi, vj) = (self.vertices[i], self.vertices[j]);
            let di = normal.dot(vi) - offset;
            let dj = normal.dot(vj) - offset;
            match (di <= 0.0, dj <= 0.0) {
                (true, true) => self.next_edges.push((i, j)),
                (false, false) => {}
                (inside_i, _) => {
                    let t = di / (di - dj);
                    let k = self.vertices.len();
                    self.vertices.push(vi + (vj - vi) * t);
                    self.next_edges.push(if inside_i { (i, k) } else { (k, j) });
                }
            }
        }
        std::mem::swap(&mut self.edges, &mut self.next_edges);
    }

    /// Visit every vertex still referenced by an edge, once
    pub(crate) fn for_each_survivor<F: FnMut(Vec4)>(&mut self, mut f: F) {
        self.used.clear();
        self.used.resize(self.vertices.len(), false);
        for &(i, j) in &self.edges {
            for v in [i, j] {
                if !self.used[v] {
                    self.used[v] = true;
                    f(self.vertices[v]);
                }
            }
        }
    }
}

/// Merge near-duplicate candidates and write at most [`MAX_MANIFOLD_POINTS`] into the manifold.
///
/// Selection keeps the deepest point first, then repeatedly the candidate
/// farthest from everything already chosen, which preserves the spread of
/// the contact region.
pub(crate) fn reduce_into(candidates: &mut Vec<ContactPoint>, manifold: &mut Manifold) {
    // merge duplicates, keeping the deeper of each pair
    let mut i = 0;
    while i < candidates.len() {
        let mut j = i + 1;
        while j < candidates.len() {
            if (candidates[i].position - candidates[j].position).length_squared() < MERGE_DISTANCE_SQ {
                if candidates[j].depth > candidates[i].depth {
                    candidates[i] = candidates[j];
                }
                candidates.swap_remove(j);
            } else {
                j += 1;
            }
        }
        i += 1;
    }

    if candidates.len() <= MAX_MANIFOLD_POINTS {
        for c in candidates.iter() {
            manifold.push(c.position, c.depth);
        }
        return;
    }

    let deepest = candidates
        .iter()
        .enumerate()
        .fold(0, |best, (idx, c)| if c.depth > candidates[best].depth { idx } else { best });
    let first = candidates.swap_remove(deepest);
    manifold.push(first.position, first.depth);

    while manifold.len() < MAX_MANIFOLD_POINTS && !candidates.is_empty() {
        let mut best = 0;
        let mut best_dist = f32::NEG_INFINITY;
        for (idx, c) in candidates.iter().enumerate() {
            let nearest = manifold
                .points()
                .iter()
                .map(|p| (p.position - c.position).length_squared())
                .fold(f32::INFINITY, f32::min);
            if nearest > best_dist {
                best_dist = nearest;
                best = idx;
            }
        }
        let chosen = candidates.swap_remove(best);
        manifold.push(chosen.position, chosen.depth);
    }
}
