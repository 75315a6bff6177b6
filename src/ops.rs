//! Operator factories: the comparison, logical, binary, and unary operations
//! the collection engine installs.
//!
//! The factories are macros: one table row per operator wires a value-level
//! predicate to the shared dispatch machinery, the way the whole operator
//! family should stay in lockstep.
//!
//! Comparisons *filter*. `v.filter_eq(0)` does not answer true/false — it
//! selects, from the collection's root, the elements whose values satisfy
//! the predicate, so a chain can filter a derived view and get the matching
//! source records back. The `inds_*` variants return the raw (possibly
//! nested) index structure instead. Boolean equality is a separate method
//! ([`Vine::all_eq`] / `PartialEq`).
//!
//! Dispatch rules for `v.filter_op(rhs)`:
//!
//! 1. rhs identity-equal to the view itself: per-operator shortcut (`eq`,
//!    `le`, `ge` select everything; `ne`, `lt`, `gt` select nothing);
//! 2. rhs a sequence of the same length: element-for-element, recursing into
//!    nested collections and collecting nested index trees;
//! 3. rhs a sequence of a different, nonzero length: compare against each
//!    rhs element in turn and set-merge the index trees — union for
//!    `eq`/`le`/`ge`, intersection for the exclusive `ne`/`lt`/`gt`;
//! 4. rhs an empty sequence: `eq` selects nothing; every other operator
//!    returns the view unfiltered (a documented policy, not an accident);
//! 5. rhs a scalar: compare every element against it, recursing into nested
//!    collections.
//!
//! The logical set ops (`&`, `|`, `^`) try equal-length element-wise boolean
//! combination first and fall back to identity-set combination over the
//! flattened leaves, keyed by node identity tags rather than value equality.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::ops::{BitAnd, BitOr, BitXor};

use uuid::Uuid;

use crate::error::{BrambleError, Result};
use crate::shape::{IndexTree, SetOp, broadcast};
use crate::value::{self, BinOp, Node, UnOp, Value, cmp_values, eq_values};
use crate::vine::{Elem, Rhs, Vine};

#[derive(Clone, Copy)]
enum IdentityPolicy {
    All,
    None,
}

struct CmpSpec {
    pred: fn(&Value, &Value) -> bool,
    merge: SetOp,
    empty_selects_all: bool,
    identity: IdentityPolicy,
}

/// Element-identity-wise sameness: equal structure with the same node tag at
/// every position. This is what "comparing a collection against itself"
/// means for views that share their nodes.
fn same_view(a: &Vine, b: &Vine) -> bool {
    a.len() == b.len()
        && a.elems()
            .iter()
            .zip(b.elems().iter())
            .all(|(x, y)| match (x, y) {
                (Elem::Node(m), Elem::Node(n)) => m.same(n),
                (Elem::Vine(m), Elem::Vine(n)) => same_view(m, n),
                _ => false,
            })
}

/// Every position, mirroring the nesting.
fn full_tree(v: &Vine) -> IndexTree {
    if v.is_nested() {
        IndexTree::Nested(
            v.elems()
                .iter()
                .filter_map(Elem::as_vine)
                .map(full_tree)
                .collect(),
        )
    } else {
        IndexTree::Flat((0..v.len()).collect())
    }
}

/// No position, mirroring the nesting.
fn empty_tree(v: &Vine) -> IndexTree {
    if v.is_nested() {
        IndexTree::Nested(
            v.elems()
                .iter()
                .filter_map(Elem::as_vine)
                .map(empty_tree)
                .collect(),
        )
    } else {
        IndexTree::Flat(Vec::new())
    }
}

fn compare_tree(vine: &Vine, rhs: &Rhs, spec: &CmpSpec) -> Result<IndexTree> {
    if let Rhs::Vine(other) = rhs {
        if same_view(vine, other) {
            return Ok(match spec.identity {
                IdentityPolicy::All => full_tree(vine),
                IdentityPolicy::None => empty_tree(vine),
            });
        }
    }
    match rhs.len() {
        Some(0) => Ok(if spec.empty_selects_all {
            full_tree(vine)
        } else {
            empty_tree(vine)
        }),
        Some(m) if m == vine.len() => elementwise_tree(vine, rhs, spec),
        Some(m) => {
            let mut acc: Option<IndexTree> = None;
            for i in 0..m {
                let t = compare_tree(vine, &rhs.item(i), spec)?;
                acc = Some(match acc {
                    None => t,
                    Some(prev) => IndexTree::merge(&prev, &t, spec.merge),
                });
            }
            Ok(acc.unwrap_or_else(|| empty_tree(vine)))
        }
        None => {
            let v = rhs.as_value();
            scalar_tree(vine, &v, spec)
        }
    }
}

fn elementwise_tree(vine: &Vine, rhs: &Rhs, spec: &CmpSpec) -> Result<IndexTree> {
    if vine.is_nested() {
        let mut trees = Vec::with_capacity(vine.len());
        for (i, e) in vine.elems().iter().enumerate() {
            match e {
                Elem::Vine(sub) => trees.push(compare_tree(sub, &rhs.item(i), spec)?),
                Elem::Node(_) => unreachable!("is_nested guarantees vine elements"),
            }
        }
        Ok(IndexTree::Nested(trees))
    } else {
        let mut ids = Vec::new();
        for (i, e) in vine.elems().iter().enumerate() {
            if (spec.pred)(&e.value(), &rhs.item(i).as_value()) {
                ids.push(i);
            }
        }
        Ok(IndexTree::Flat(ids))
    }
}

fn scalar_tree(vine: &Vine, v: &Value, spec: &CmpSpec) -> Result<IndexTree> {
    if vine.is_nested() {
        let mut trees = Vec::with_capacity(vine.len());
        for e in vine.elems() {
            match e {
                Elem::Vine(sub) => trees.push(scalar_tree(sub, v, spec)?),
                Elem::Node(_) => unreachable!("is_nested guarantees vine elements"),
            }
        }
        Ok(IndexTree::Nested(trees))
    } else {
        let mut ids = Vec::new();
        for (i, e) in vine.elems().iter().enumerate() {
            if (spec.pred)(&e.value(), v) {
                ids.push(i);
            }
        }
        Ok(IndexTree::Flat(ids))
    }
}

macro_rules! comparators {
    ($( ($filter:ident, $inds:ident, $pred:expr, $merge:expr, $empty_all:expr, $identity:expr) ),+ $(,)?) => {
        impl Vine {
            $(
                /// Filtering comparison; see the module docs for the
                /// dispatch rules.
                pub fn $filter<R: Into<Rhs>>(&self, rhs: R) -> Result<Vine> {
                    let spec = CmpSpec {
                        pred: $pred,
                        merge: $merge,
                        empty_selects_all: $empty_all,
                        identity: $identity,
                    };
                    let tree = compare_tree(self, &rhs.into(), &spec)?;
                    self.root().select_tree(&tree)
                }

                /// The raw index structure for the matching comparison.
                pub fn $inds<R: Into<Rhs>>(&self, rhs: R) -> Result<IndexTree> {
                    let spec = CmpSpec {
                        pred: $pred,
                        merge: $merge,
                        empty_selects_all: $empty_all,
                        identity: $identity,
                    };
                    compare_tree(self, &rhs.into(), &spec)
                }
            )+
        }
    };
}

comparators![
    (filter_eq, inds_eq, |a, b| eq_values(a, b), SetOp::Union, false, IdentityPolicy::All),
    (filter_ne, inds_ne, |a, b| !eq_values(a, b), SetOp::Intersection, true, IdentityPolicy::None),
    (filter_lt, inds_lt, |a, b| cmp_values(a, b) == Ordering::Less, SetOp::Intersection, true, IdentityPolicy::None),
    (filter_le, inds_le, |a, b| cmp_values(a, b) != Ordering::Greater, SetOp::Union, true, IdentityPolicy::All),
    (filter_gt, inds_gt, |a, b| cmp_values(a, b) == Ordering::Greater, SetOp::Intersection, true, IdentityPolicy::None),
    (filter_ge, inds_ge, |a, b| cmp_values(a, b) != Ordering::Less, SetOp::Union, true, IdentityPolicy::All),
];

// ===================== Binary / unary operators =====================

impl Vine {
    fn zip_arith(&self, rhs: &Rhs, op: BinOp) -> Result<Vine> {
        let items = broadcast(self.len(), rhs, false);
        let mut elems = Vec::with_capacity(self.len());
        for (e, item) in self.elems().iter().zip(items) {
            match e {
                Elem::Node(n) => {
                    elems.push(Elem::Node(Node::new(value::arith(
                        op,
                        &n.value(),
                        &item,
                    )?)));
                }
                Elem::Vine(v) => {
                    elems.push(Elem::Vine(
                        v.zip_arith(&Rhs::from_broadcast_item(item), op)?,
                    ));
                }
            }
        }
        Ok(Vine::from_elems(elems))
    }

    fn zip_store(&self, rhs: &Rhs, op: BinOp) -> Result<()> {
        let items = broadcast(self.len(), rhs, false);
        for (e, item) in self.elems().iter().zip(items) {
            match e {
                Elem::Node(n) => {
                    let out = value::arith(op, &n.value(), &item)?;
                    n.set(out);
                }
                Elem::Vine(v) => v.zip_store(&Rhs::from_broadcast_item(item), op)?,
            }
        }
        Ok(())
    }

    fn map_unary(&self, op: UnOp) -> Result<Vine> {
        let mut elems = Vec::with_capacity(self.len());
        for e in self.elems() {
            match e {
                Elem::Node(n) => {
                    elems.push(Elem::Node(Node::new(value::unary(
                        op,
                        &n.value(),
                    )?)));
                }
                Elem::Vine(v) => elems.push(Elem::Vine(v.map_unary(op)?)),
            }
        }
        Ok(Vine::from_elems(elems))
    }

    /// Element-wise floor division and remainder, paired per leaf.
    pub fn divmod<R: Into<Rhs>>(&self, rhs: R) -> Result<Vine> {
        self.apply_with(&|a: &Value, b: &Value| value::divmod(a, b), rhs)
    }
}

macro_rules! binary_ops {
    ($( ($method:ident, $assign:ident, $op:expr) ),+ $(,)?) => {
        impl Vine {
            $(
                /// Element-wise operation with right-operand broadcasting.
                pub fn $method<R: Into<Rhs>>(&self, rhs: R) -> Result<Vine> {
                    self.zip_arith(&rhs.into(), $op)
                }

                /// In-place variant: writes results into the shared leaf
                /// cells, visible through every aliasing view. Chainable.
                pub fn $assign<R: Into<Rhs>>(&self, rhs: R) -> Result<&Self> {
                    self.zip_store(&rhs.into(), $op)?;
                    Ok(self)
                }
            )+
        }
    };
}

binary_ops![
    (add, add_assign, BinOp::Add),
    (sub, sub_assign, BinOp::Sub),
    (mul, mul_assign, BinOp::Mul),
    (div, div_assign, BinOp::Div),
    (floordiv, floordiv_assign, BinOp::FloorDiv),
    (rem, rem_assign, BinOp::Rem),
    (pow, pow_assign, BinOp::Pow),
    (shl, shl_assign, BinOp::Shl),
    (shr, shr_assign, BinOp::Shr),
];

macro_rules! unary_ops {
    ($( ($method:ident, $op:expr) ),+ $(,)?) => {
        impl Vine {
            $(
                /// Element-wise unary operation, recursing to the leaves.
                pub fn $method(&self) -> Result<Vine> {
                    self.map_unary($op)
                }
            )+
        }
    };
}

unary_ops![(neg, UnOp::Neg), (invert, UnOp::Not), (abs, UnOp::Abs)];

// ===================== Logical set operations =====================

impl Vine {
    fn bool_zip(&self, other: &Vine, f: fn(bool, bool) -> bool) -> Result<Vine> {
        if self.len() != other.len() {
            return Err(BrambleError::ShapeMismatch {
                expected: self.len(),
                got: other.len(),
            });
        }
        let mut elems = Vec::with_capacity(self.len());
        for (a, b) in self.elems().iter().zip(other.elems().iter()) {
            match (a, b) {
                (Elem::Vine(x), Elem::Vine(y)) => elems.push(Elem::Vine(x.bool_zip(y, f)?)),
                (Elem::Node(x), Elem::Node(y)) => {
                    let (xb, yb) = match (x.value().as_bool(), y.value().as_bool()) {
                        (Some(xb), Some(yb)) => (xb, yb),
                        _ => {
                            return Err(BrambleError::Type(
                                "elements are not boolean-combinable".to_owned(),
                            ));
                        }
                    };
                    elems.push(Elem::Node(Node::new(Value::Bool(f(xb, yb)))));
                }
                _ => {
                    return Err(BrambleError::Type(
                        "elements are not boolean-combinable".to_owned(),
                    ));
                }
            }
        }
        Ok(Vine::from_elems(elems))
    }

    fn identity_set(&self, other: &Vine, op: SetOp) -> Vine {
        let a = self.leaves();
        let b = other.leaves();
        let a_ids: HashSet<Uuid> = a.iter().map(|n| n.id()).collect();
        let b_ids: HashSet<Uuid> = b.iter().map(|n| n.id()).collect();

        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut out = Vec::new();
        let mut keep = |node: &Node, wanted: bool| {
            if wanted && seen.insert(node.id()) {
                out.push(Elem::Node(node.clone()));
            }
        };
        match op {
            SetOp::Intersection => {
                for n in &a {
                    keep(n, b_ids.contains(&n.id()));
                }
            }
            SetOp::Union => {
                for n in &a {
                    keep(n, true);
                }
                for n in &b {
                    keep(n, true);
                }
            }
            SetOp::SymmetricDifference => {
                for n in &a {
                    keep(n, !b_ids.contains(&n.id()));
                }
                for n in &b {
                    keep(n, !a_ids.contains(&n.id()));
                }
            }
        }
        Vine::from_elems(out)
    }

    fn logical(&self, other: &Vine, op: SetOp, f: fn(bool, bool) -> bool) -> Vine {
        match self.bool_zip(other, f) {
            Ok(v) => v,
            Err(_) => self.identity_set(other, op),
        }
    }

    /// Element-wise boolean AND when possible, identity-set intersection
    /// otherwise.
    pub fn logical_and(&self, other: &Vine) -> Vine {
        self.logical(other, SetOp::Intersection, |a, b| a && b)
    }

    /// Element-wise boolean OR when possible, identity-set union otherwise.
    pub fn logical_or(&self, other: &Vine) -> Vine {
        self.logical(other, SetOp::Union, |a, b| a || b)
    }

    /// Element-wise boolean XOR when possible, identity-set symmetric
    /// difference otherwise.
    pub fn logical_xor(&self, other: &Vine) -> Vine {
        self.logical(other, SetOp::SymmetricDifference, |a, b| a ^ b)
    }
}

impl BitAnd<&Vine> for &Vine {
    type Output = Vine;

    fn bitand(self, rhs: &Vine) -> Vine {
        self.logical_and(rhs)
    }
}

impl BitOr<&Vine> for &Vine {
    type Output = Vine;

    fn bitor(self, rhs: &Vine) -> Vine {
        self.logical_or(rhs)
    }
}

impl BitXor<&Vine> for &Vine {
    type Output = Vine;

    fn bitxor(self, rhs: &Vine) -> Vine {
        self.logical_xor(rhs)
    }
}
