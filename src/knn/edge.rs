//! Describes an outgoing edge from a point to one of its neighbours,
//! and the bounded insertion used to keep the k nearest ones.

use num_traits::Float;

use std::cmp::Ordering;

/// keep a node index compatible with NdArray
pub type NodeIdx = usize;

/// an outEdge gives the destination node and the distance to it.
#[derive(Clone, Copy, Debug)]
pub struct OutEdge<F> {
    pub node: NodeIdx,
    pub weight: F,
} // end of struct OutEdge<F>

impl<F> OutEdge<F> {
    pub fn new(node: NodeIdx, weight: F) -> Self {
        OutEdge { node, weight }
    }
}

impl<F> PartialEq for OutEdge<F>
where
    F: Float,
{
    fn eq(&self, other: &OutEdge<F>) -> bool {
        self.weight == other.weight && self.node == other.node
    } // end eq
}

/// order edges by distance, then by node index
impl<F: Float> PartialOrd for OutEdge<F> {
    fn partial_cmp(&self, other: &OutEdge<F>) -> Option<Ordering> {
        match self.weight.partial_cmp(&other.weight) {
            Some(Ordering::Equal) => Some(self.node.cmp(&other.node)),
            order => order,
        }
    } // end cmp
} // end impl PartialOrd

/// Keeps the k smallest edges seen so far, sorted by increasing weight.
///
/// Candidates must be offered by increasing node index: a candidate equal in distance to an edge
/// already kept is placed after it and never evicts it, so among equal distances the lower index wins.
/// A NaN distance compares as greater than everything and is only kept while the buffer is not full.
pub(crate) struct KBest<F> {
    k: usize,
    edges: Vec<OutEdge<F>>,
}

impl<F: Float> KBest<F> {
    pub(crate) fn new(k: usize) -> Self {
        KBest {
            k,
            edges: Vec::with_capacity(k + 1),
        }
    }

    #[inline]
    fn is_before(d: F, other: F) -> bool {
        // NaN is never before anything
        d < other || (other.is_nan() && !d.is_nan())
    }

    /// offer a candidate, O(k) at worst
    pub(crate) fn insert(&mut self, node: NodeIdx, d: F) {
        if self.k == 0 {
            return;
        }
        if self.edges.len() == self.k {
            let last = self.edges[self.k - 1].weight;
            if !Self::is_before(d, last) {
                return;
            }
            self.edges.pop();
        }
        // find insertion slot scanning from the end, strict comparison keeps earlier candidates first
        let mut pos = self.edges.len();
        while pos > 0 && Self::is_before(d, self.edges[pos - 1].weight) {
            pos -= 1;
        }
        self.edges.insert(pos, OutEdge::new(node, d));
    } // end of insert

    pub(crate) fn into_edges(self) -> Vec<OutEdge<F>> {
        self.edges
    }
} // end of impl KBest

//========================================================================================

// end of mod tests
