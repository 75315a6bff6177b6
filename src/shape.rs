//! Structure helpers: broadcasting, index-tree merging, and the counter cell
//! used by fill and ungroup traversals.

use crate::value::Value;
use crate::vine::Rhs;

/// How two index sets (or index trees) combine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOp {
    Intersection,
    Union,
    SymmetricDifference,
}

/// Broadcasts `rhs` to `len` per-position values.
///
/// Permissive mode: any sequence of exactly `len` items supplies one item per
/// position. Strict mode: only a genuine collection of that length passes
/// through per-position; a plain sequence of matching length is still treated
/// as a single replicated value. Everything else replicates whole. This is
/// the sole broadcasting rule used by call and operator dispatch — it is what
/// decides whether a supplied argument is "per-element" or "shared".
pub fn broadcast(len: usize, rhs: &Rhs, strict: bool) -> Vec<Value> {
    match rhs {
        Rhs::Vine(v) if v.len() == len => (0..len).map(|i| v.elem_value(i)).collect(),
        Rhs::Seq(items) if !strict && items.len() == len => items.clone(),
        other => {
            let whole = other.as_value();
            vec![whole; len]
        }
    }
}

/// Positions selected by a comparison, mirroring the nesting of the
/// collection they were computed over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexTree {
    Flat(Vec<usize>),
    Nested(Vec<IndexTree>),
}

impl IndexTree {
    pub fn empty() -> Self {
        Self::Flat(Vec::new())
    }

    /// Total number of selected leaf positions.
    pub fn count(&self) -> usize {
        match self {
            Self::Flat(ids) => ids.len(),
            Self::Nested(children) => children.iter().map(IndexTree::count).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Set-merges two index structures. Both flat: ordered set combination.
    /// Both nested with equal arity: pairwise recursion. Incompatible shapes
    /// fall back to concatenation as sibling trees.
    pub fn merge(a: &IndexTree, b: &IndexTree, op: SetOp) -> IndexTree {
        match (a, b) {
            (Self::Flat(x), Self::Flat(y)) => Self::Flat(merge_sets(x, y, op)),
            (Self::Nested(x), Self::Nested(y)) if x.len() == y.len() => Self::Nested(
                x.iter()
                    .zip(y.iter())
                    .map(|(m, n)| Self::merge(m, n, op))
                    .collect(),
            ),
            (x, y) => Self::Nested(vec![x.clone(), y.clone()]),
        }
    }
}

/// Ordered set combination of two index lists. Union and symmetric
/// difference keep left-hand matches first; intersection keeps the left
/// side's order.
pub fn merge_sets(a: &[usize], b: &[usize], op: SetOp) -> Vec<usize> {
    match op {
        SetOp::Union => {
            let mut out = a.to_vec();
            out.extend(b.iter().copied().filter(|i| !a.contains(i)));
            out
        }
        SetOp::Intersection => a.iter().copied().filter(|i| b.contains(i)).collect(),
        SetOp::SymmetricDifference => {
            let mut out: Vec<usize> = a.iter().copied().filter(|i| !b.contains(i)).collect();
            out.extend(b.iter().copied().filter(|i| !a.contains(i)));
            out
        }
    }
}

/// A mutable value cell whose step operations mutate and return the new
/// value. Used to hand out sequential fill values (or count down remaining
/// leaves) during deep recursive traversal without threading extra return
/// values up the call stack.
#[derive(Clone, Copy, Debug)]
pub struct Counter(i64);

impl Counter {
    pub fn new(start: i64) -> Self {
        Self(start)
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    /// Increments, then returns the new value.
    pub fn succ(&mut self) -> i64 {
        self.0 += 1;
        self.0
    }

    /// Decrements, then returns the new value.
    pub fn pred(&mut self) -> i64 {
        self.0 -= 1;
        self.0
    }
}
