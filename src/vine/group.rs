//! Grouping, ungrouping, sorting, uniqueness-reduction, and empty-group
//! filtering.
//!
//! Grouping reads this view's leaves as keys and partitions the *root*
//! elements by key equality in first-seen order — that is what makes
//! `records.field("bar")?.group_by()?` come back as groups of records, not
//! groups of bar values. When the view is already nested, grouping recurses
//! and only true leaves gain a new nesting level.

use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;

use crate::error::{BrambleError, Result};
use crate::value::{HashKey, Value, cmp_values, hash_key};

use super::depth::Depth;
use super::model::{Elem, Vine};

/// Per-level partition of leaf positions, mirroring the nesting of the
/// collection the keys came from.
enum GroupTree {
    Leaf(Vec<Vec<usize>>),
    Nested(Vec<GroupTree>),
}

/// Positions kept by a structural filter, per level. `None` keeps the
/// element whole; `Some` recurses.
struct KeepPlan {
    kept: Vec<(usize, Option<KeepPlan>)>,
}

fn apply_plan(v: &Vine, plan: &KeepPlan) -> Result<Vine> {
    let mut elems = Vec::with_capacity(plan.kept.len());
    for (i, sub) in &plan.kept {
        let e = v.elems.get(*i).ok_or_else(|| {
            BrambleError::Structure("filter plan does not match collection shape".to_owned())
        })?;
        match (e, sub) {
            (Elem::Vine(child), Some(p)) => elems.push(Elem::Vine(apply_plan(child, p)?)),
            (e, None) => elems.push(e.clone()),
            (Elem::Node(_), Some(_)) => {
                return Err(BrambleError::Structure(
                    "filter plan recurses into a leaf element".to_owned(),
                ));
            }
        }
    }
    Ok(Vine::from_elems(elems))
}

fn apply_grouping(v: &Vine, tree: &GroupTree) -> Result<Vine> {
    match tree {
        GroupTree::Leaf(groups) => {
            let mut elems = Vec::with_capacity(groups.len());
            for group in groups {
                let mut members = Vec::with_capacity(group.len());
                for &i in group {
                    members.push(v.elems.get(i).cloned().ok_or_else(|| {
                        BrambleError::Structure(
                            "grouping does not match the root collection's shape".to_owned(),
                        )
                    })?);
                }
                elems.push(Elem::Vine(Vine::from_elems(members)));
            }
            Ok(Vine::from_elems(elems))
        }
        GroupTree::Nested(trees) => {
            if trees.len() != v.len() {
                return Err(BrambleError::Structure(format!(
                    "grouping arity {} does not match collection length {}",
                    trees.len(),
                    v.len()
                )));
            }
            let mut elems = Vec::with_capacity(trees.len());
            for (e, t) in v.elems.iter().zip(trees.iter()) {
                match e {
                    Elem::Vine(child) => elems.push(Elem::Vine(apply_grouping(child, t)?)),
                    Elem::Node(_) => {
                        return Err(BrambleError::Structure(
                            "grouping recurses into a leaf element".to_owned(),
                        ));
                    }
                }
            }
            Ok(Vine::from_elems(elems))
        }
    }
}

impl Vine {
    /// Partitions the root elements by this view's leaf values, equal keys
    /// together, groups in first-seen key order. Nested views recurse; only
    /// true leaves get newly grouped. Leaf values must have a hashable
    /// surrogate.
    pub fn group_by(&self) -> Result<Vine> {
        let tree = self.grouping()?;
        apply_grouping(&self.root(), &tree)
    }

    fn grouping(&self) -> Result<GroupTree> {
        if self.is_nested() {
            let mut trees = Vec::with_capacity(self.len());
            for e in &self.elems {
                match e {
                    Elem::Vine(v) => trees.push(v.grouping()?),
                    Elem::Node(_) => unreachable!("is_nested guarantees vine elements"),
                }
            }
            return Ok(GroupTree::Nested(trees));
        }
        let mut seen: HashMap<HashKey, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (i, e) in self.elems.iter().enumerate() {
            let key = hash_key(&e.value())?;
            match seen.entry(key) {
                MapEntry::Occupied(slot) => groups[*slot.get()].push(i),
                MapEntry::Vacant(slot) => {
                    slot.insert(groups.len());
                    groups.push(vec![i]);
                }
            }
        }
        Ok(GroupTree::Leaf(groups))
    }

    /// Removes `levels` levels of nesting from the top. Fails when the
    /// structure runs out first.
    pub fn ungroup(&self, levels: usize) -> Result<Vine> {
        let mut out = self.clone();
        for _ in 0..levels {
            out = out.flatten_once()?;
        }
        Ok(out)
    }

    /// Removes as many nesting levels as exist; never fails.
    pub fn ungroup_all(&self) -> Vine {
        let mut out = self.clone();
        while out.is_nested() {
            match out.flatten_once() {
                Ok(next) => out = next,
                Err(_) => break,
            }
        }
        out
    }

    fn flatten_once(&self) -> Result<Vine> {
        let mut elems = Vec::new();
        for (i, e) in self.elems.iter().enumerate() {
            match e {
                Elem::Vine(v) => elems.extend(v.elems.iter().cloned()),
                Elem::Node(_) => {
                    return Err(BrambleError::Structure(format!(
                        "cannot remove a nesting level: leaf element at position {i}"
                    )));
                }
            }
        }
        let root = match &self.root {
            Some(r) => Some(Box::new(r.flatten_once().unwrap_or_else(|_| (**r).clone()))),
            None => None,
        };
        Ok(Vine { elems, root })
    }

    /// Removes empty sub-collections at the given recursive depth (`At(0)`
    /// filters direct children; `Deepest` filters bottom-up as deep as
    /// possible). The derivation history is filtered in parallel.
    pub fn nonempty(&self, depth: Depth) -> Result<Vine> {
        let plan = self.nonempty_plan(depth);
        let filtered = apply_plan(self, &plan)?;
        let root = apply_plan(&self.root(), &plan)?;
        Ok(filtered.with_root(root))
    }

    fn nonempty_plan(&self, depth: Depth) -> KeepPlan {
        let mut kept = Vec::with_capacity(self.len());
        for (i, e) in self.elems.iter().enumerate() {
            match e {
                Elem::Node(_) => kept.push((i, None)),
                Elem::Vine(v) => match depth {
                    Depth::At(0) => {
                        if !v.is_empty() {
                            kept.push((i, None));
                        }
                    }
                    d => {
                        let sub = v.nonempty_plan(d.descend());
                        if !sub.kept.is_empty() {
                            kept.push((i, Some(sub)));
                        }
                    }
                },
            }
        }
        KeepPlan { kept }
    }

    /// Keeps the first occurrence of each distinct value per group,
    /// recursing into nested groups. The surviving root elements are exactly
    /// the first-seen ones.
    pub fn unique(&self) -> Result<Vine> {
        let plan = self.unique_plan()?;
        let filtered = apply_plan(self, &plan)?;
        let root = apply_plan(&self.root(), &plan)?;
        Ok(filtered.with_root(root))
    }

    fn unique_plan(&self) -> Result<KeepPlan> {
        let mut kept = Vec::with_capacity(self.len());
        if self.is_nested() {
            for (i, e) in self.elems.iter().enumerate() {
                match e {
                    Elem::Vine(v) => kept.push((i, Some(v.unique_plan()?))),
                    Elem::Node(_) => unreachable!("is_nested guarantees vine elements"),
                }
            }
        } else {
            let mut seen: HashMap<HashKey, ()> = HashMap::new();
            for (i, e) in self.elems.iter().enumerate() {
                let key = hash_key(&e.value())?;
                if let MapEntry::Vacant(slot) = seen.entry(key) {
                    slot.insert(());
                    kept.push((i, None));
                }
            }
        }
        Ok(KeepPlan { kept })
    }

    /// In-place stable sort by the natural value ordering, applying the same
    /// permutation to the carried root view.
    pub fn sort(&mut self) -> &mut Self {
        self.sort_by(Elem::value)
    }

    /// In-place stable sort by a key function, applying the same permutation
    /// to the carried root view so derived and source stay index-aligned.
    pub fn sort_by<F: Fn(&Elem) -> Value>(&mut self, key: F) -> &mut Self {
        let keys: Vec<Value> = self.elems.iter().map(|e| key(e)).collect();
        let mut idx: Vec<usize> = (0..self.elems.len()).collect();
        idx.sort_by(|&a, &b| cmp_values(&keys[a], &keys[b]));

        permute(&mut self.elems, &idx);
        if let Some(root) = self.root.as_deref_mut() {
            if root.elems.len() == idx.len() {
                permute(&mut root.elems, &idx);
            }
        }
        self
    }
}

fn permute(elems: &mut Vec<Elem>, idx: &[usize]) {
    let old = std::mem::take(elems);
    *elems = idx.iter().map(|&i| old[i].clone()).collect();
}
