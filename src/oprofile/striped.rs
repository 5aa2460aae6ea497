//!
//! Striped layout of per-node values
//!
//! For a model of M nodes and lane width W the values are stored in
//! `nq = max(2, ceil(M/W))` blocks, and node `k` (1-based) lives at
//!
//! ```text
//! q = (k - 1) % nq
//! z = (k - 1) / nq
//! k = q + 1 + z * nq
//! ```
//!
//! Lanes past M are padding and hold a track-specific "impossible" value.
//!
use super::lanes::Lanes;

///
/// Number of blocks for a model of `m` nodes with `w` lanes per block
///
pub fn nq_for(m: usize, w: usize) -> usize {
    std::cmp::max(2, (m + w - 1) / w)
}

///
/// node index of lane `z` of block `q`
///
#[inline]
pub fn node_of(q: usize, z: usize, nq: usize) -> usize {
    q + 1 + z * nq
}

///
/// `(q, z)` of node `k >= 1`
///
#[inline]
pub fn position_of(k: usize, nq: usize) -> (usize, usize) {
    ((k - 1) % nq, (k - 1) / nq)
}

///
/// Blocks of lane vectors. The allocation is kept across `reset`s.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Striped<V: Lanes> {
    blocks: Vec<V>,
}

impl<V: Lanes> Striped<V> {
    ///
    /// Create with `nq` blocks filled with `fill`
    ///
    pub fn new(nq: usize, fill: V::Elem) -> Self {
        Striped {
            blocks: vec![V::splat(fill); nq],
        }
    }
    ///
    /// Create with room for `alloc_nq` blocks and no active block
    ///
    pub fn with_capacity(alloc_nq: usize) -> Self {
        Striped {
            blocks: Vec::with_capacity(alloc_nq),
        }
    }
    ///
    /// Set the number of active blocks to `nq` and fill all lanes.
    /// Does not reallocate if `nq` is within the capacity.
    ///
    pub fn reset(&mut self, nq: usize, fill: V::Elem) {
        self.blocks.clear();
        self.blocks.resize(nq, V::splat(fill));
    }
    /// number of active blocks
    pub fn nq(&self) -> usize {
        self.blocks.len()
    }
    /// number of blocks that fit without reallocation
    pub fn capacity(&self) -> usize {
        self.blocks.capacity()
    }
    #[inline]
    pub fn block(&self, q: usize) -> V {
        self.blocks[q]
    }
    #[inline]
    pub fn block_mut(&mut self, q: usize) -> &mut V {
        &mut self.blocks[q]
    }
    #[inline]
    pub fn set_block(&mut self, q: usize, v: V) {
        self.blocks[q] = v;
    }
    pub fn blocks(&self) -> &[V] {
        &self.blocks
    }
    ///
    /// value of node `k` (`1 <= k <= nq * W`)
    ///
    pub fn get(&self, k: usize) -> V::Elem {
        let (q, z) = position_of(k, self.nq());
        self.blocks[q].lane(z)
    }
    ///
    /// set the value of node `k` (`1 <= k <= nq * W`)
    ///
    pub fn set(&mut self, k: usize, value: V::Elem) {
        let (q, z) = position_of(k, self.nq());
        self.blocks[q].set_lane(z, value);
    }
    ///
    /// Iterate `(k, value)` in block-then-lane order
    ///
    pub fn iter(&self) -> impl Iterator<Item = (usize, V::Elem)> + '_ {
        let nq = self.nq();
        self.blocks
            .iter()
            .enumerate()
            .flat_map(move |(q, v)| (0..V::W).map(move |z| (node_of(q, z, nq), v.lane(z))))
    }
    ///
    /// Values of nodes `1..=m` in node order
    ///
    pub fn to_nodes(&self, m: usize) -> Vec<V::Elem> {
        (1..=m).map(|k| self.get(k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::lanes::*;
    use super::*;

    #[test]
    fn striped_block_counts() {
        assert_eq!(nq_for(1, 4), 2);
        assert_eq!(nq_for(8, 4), 2);
        assert_eq!(nq_for(9, 4), 3);
        assert_eq!(nq_for(100, 16), 7);
        assert_eq!(nq_for(100, 8), 13);
    }
    #[test]
    fn striped_node_formula() {
        // M=10, W=4: nq=3
        //   q=0: 1 4 7 10
        //   q=1: 2 5 8 (11)
        //   q=2: 3 6 9 (12)
        let nq = nq_for(10, 4);
        assert_eq!(nq, 3);
        assert_eq!(node_of(0, 3, nq), 10);
        assert_eq!(node_of(2, 1, nq), 6);
        for k in 1..=12 {
            let (q, z) = position_of(k, nq);
            assert_eq!(node_of(q, z, nq), k);
        }
        let mut s: Striped<F32x4> = Striped::new(nq, 0.0);
        for k in 1..=10 {
            s.set(k, k as f32);
        }
        assert_eq!(s.block(0), F32x4([1.0, 4.0, 7.0, 10.0]));
        assert_eq!(s.block(2), F32x4([3.0, 6.0, 9.0, 0.0]));
        assert_eq!(s.to_nodes(4), vec![1.0, 2.0, 3.0, 4.0]);
        let order: Vec<usize> = s.iter().map(|(k, _)| k).take(5).collect();
        assert_eq!(order, vec![1, 4, 7, 10, 2]);
    }
    #[test]
    fn striped_predecessor_by_shift() {
        // rightshift of the last block gives the predecessors of block 0
        let nq = 3;
        let mut s: Striped<F32x4> = Striped::new(nq, 0.0);
        for k in 1..=12 {
            s.set(k, k as f32);
        }
        let prev = s.block(nq - 1).rightshift(0.0);
        for z in 0..4 {
            let k = node_of(0, z, nq);
            assert_eq!(prev.lane(z), (k - 1) as f32);
        }
    }
    #[test]
    fn striped_reset_keeps_allocation() {
        let mut s: Striped<I16x8> = Striped::with_capacity(10);
        s.reset(4, -32768);
        assert_eq!(s.nq(), 4);
        assert_eq!(s.get(17), -32768);
        s.reset(10, 0);
        assert_eq!(s.nq(), 10);
        assert!(s.capacity() >= 10);
    }
}
