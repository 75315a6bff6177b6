//! Record: the mapping proxy held at the leaves of a collection.
//!
//! A [`Record`] maps string keys to shared [`Node`] handles. Keys double as
//! the field names the engine's field access resolves against. Listing order
//! is sorted key order throughout (`keys`, `values`, `entries`).
//!
//! Batch access is where records meet the engine: indexing a record with a
//! *list* of keys yields a [`Vine`] of the value nodes whose root is a vine
//! of [`Value::Entry`] pairs, so a filtered view can be folded back into a
//! mapping later with [`Record::from_entries`].

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{BrambleError, Result};
use crate::value::{Node, Value, eq_values};
use crate::vine::{Elem, Rhs, Vine};

/// A mapping whose keys behave like fields.
#[derive(Clone, Debug, Default)]
pub struct Record {
    fields: BTreeMap<String, Node>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut record = Self::new();
        for (k, v) in pairs {
            record.set(k, v);
        }
        record
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// The value node for `key`, or a lookup error naming the known keys.
    pub fn get(&self, key: &str) -> Result<Node> {
        self.try_get(key).ok_or_else(|| self.missing(key))
    }

    pub fn try_get(&self, key: &str) -> Option<Node> {
        self.fields.get(key).cloned()
    }

    fn missing(&self, key: &str) -> BrambleError {
        BrambleError::Lookup {
            container: format!("record has no key '{key}'"),
            element: format!("known keys: [{}]", self.keys().join(", ")),
        }
    }

    /// Binds `key` to a fresh node holding `value`. Chainable.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(key.into(), Node::new(value.into()));
        self
    }

    /// Binds `key` to an existing node handle (shares the cell).
    pub fn set_node(&mut self, key: impl Into<String>, node: Node) -> &mut Self {
        self.fields.insert(key.into(), node);
        self
    }

    pub fn remove(&mut self, key: &str) -> Result<Node> {
        self.fields.remove(key).ok_or_else(|| BrambleError::Lookup {
            container: format!("record has no key '{key}' to remove"),
            element: "delete by key".to_owned(),
        })
    }

    /// Merges `other`'s bindings (sharing its node handles). Chainable.
    pub fn update(&mut self, other: &Record) -> &mut Self {
        for (k, n) in &other.fields {
            self.fields.insert(k.clone(), n.clone());
        }
        self
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    /// Value nodes in sorted key order.
    pub fn values(&self) -> Vec<Node> {
        self.fields.values().cloned().collect()
    }

    /// (key, node) pairs in sorted key order.
    pub fn entries(&self) -> Vec<(String, Node)> {
        self.fields
            .iter()
            .map(|(k, n)| (k.clone(), n.clone()))
            .collect()
    }

    /// Batch get: the value vine for `keys`, rooted at a vine of
    /// [`Value::Entry`] pairs so the keys survive filtering.
    pub fn get_keys(&self, keys: &[&str]) -> Result<Vine> {
        let mut values = Vec::with_capacity(keys.len());
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let node = self.get(key)?;
            entries.push(Elem::Node(Node::new(Value::Entry {
                key: (*key).to_owned(),
                value: node.clone(),
            })));
            values.push(Elem::Node(node));
        }
        Ok(Vine::from_elems(values).with_root(Vine::from_elems(entries)))
    }

    /// Batch set: one value broadcasts across all keys; a sequence must match
    /// the key-list length, else the mismatch is an error at assignment time.
    pub fn set_keys(&mut self, keys: &[&str], rhs: impl Into<Rhs>) -> Result<&mut Self> {
        let values: Vec<Value> = match rhs.into() {
            Rhs::Value(v) => vec![v; keys.len()],
            Rhs::Seq(items) => {
                if items.len() != keys.len() {
                    return Err(BrambleError::ShapeMismatch {
                        expected: keys.len(),
                        got: items.len(),
                    });
                }
                items
            }
            Rhs::Vine(v) => {
                if v.len() != keys.len() {
                    return Err(BrambleError::ShapeMismatch {
                        expected: keys.len(),
                        got: v.len(),
                    });
                }
                v.to_values()
            }
        };
        for (key, value) in keys.iter().zip(values) {
            self.set(*key, value);
        }
        Ok(self)
    }

    /// Rebuilds a record from a vine of [`Value::Entry`] leaves (typically a
    /// filtered view rooted by [`Record::get_keys`]). Value nodes are shared,
    /// not copied.
    pub fn from_entries(vine: &Vine) -> Result<Record> {
        let mut record = Record::new();
        for node in vine.leaves() {
            match &*node.value() {
                Value::Entry { key, value } => {
                    record.set_node(key.clone(), value.clone());
                }
                other => {
                    return Err(BrambleError::Type(format!(
                        "expected entry leaves, found {}",
                        other.type_name()
                    )));
                }
            }
        }
        Ok(record)
    }

    /// Recursive copy with fresh nodes.
    pub fn deep_copy(&self) -> Record {
        let mut record = Record::new();
        for (k, n) in &self.fields {
            record.set_node(k.clone(), n.deep_copy());
        }
        record
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && eq_values(&va.value(), &vb.value()))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, n)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}: {}", n.value())?;
        }
        write!(f, "}}")
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

/// A record that synthesises missing values with a factory on read, in the
/// manner of a default-dictionary.
#[derive(Clone)]
pub struct DefaultRecord {
    record: Record,
    factory: Rc<dyn Fn() -> Value>,
}

impl DefaultRecord {
    pub fn new(factory: impl Fn() -> Value + 'static) -> Self {
        Self {
            record: Record::new(),
            factory: Rc::new(factory),
        }
    }

    pub fn with_record(record: Record, factory: impl Fn() -> Value + 'static) -> Self {
        Self {
            record,
            factory: Rc::new(factory),
        }
    }

    /// The node for `key`; on a miss, stores the factory value first.
    pub fn get(&mut self, key: &str) -> Node {
        if let Some(node) = self.record.try_get(key) {
            return node;
        }
        let node = Node::new((self.factory)());
        self.record.set_node(key, node.clone());
        node
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut Record {
        &mut self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }
}

impl fmt::Debug for DefaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DefaultRecord({})", self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_key_roundtrip() -> Result<()> {
        let mut r = Record::new();
        r.set("name", "ada").set("age", 36);
        assert!(eq_values(&r.get("name")?.value(), &Value::from("ada")));
        assert!(r.get("missing").is_err());
        Ok(())
    }

    #[test]
    fn test_keys_are_sorted() {
        let r = Record::from_pairs([("b", 1i64), ("a", 2), ("c", 3)]);
        assert_eq!(r.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_update_chains_and_shares_nodes() -> Result<()> {
        let mut a = Record::from_pairs([("x", 1i64)]);
        let b = Record::from_pairs([("y", 2i64)]);
        a.update(&b).set("z", 3);
        assert_eq!(a.keys(), vec!["x", "y", "z"]);

        // the merged binding aliases b's cell
        b.get("y")?.set(Value::Int(9));
        assert!(eq_values(&a.get("y")?.value(), &Value::Int(9)));
        Ok(())
    }

    #[test]
    fn test_batch_get_roots_entries() -> Result<()> {
        let r = Record::from_pairs([("a", 1i64), ("b", 2), ("c", 3)]);
        let picked = r.get_keys(&["a", "c"])?;
        assert_eq!(picked.len(), 2);

        let rebuilt = Record::from_entries(&picked.root())?;
        assert_eq!(rebuilt.keys(), vec!["a", "c"]);
        // the rebuilt record shares cells with the original
        rebuilt.get("a")?.set(Value::Int(42));
        assert!(eq_values(&r.get("a")?.value(), &Value::Int(42)));
        Ok(())
    }

    #[test]
    fn test_batch_set_broadcast_and_mismatch() -> Result<()> {
        let mut r = Record::new();
        r.set_keys(&["a", "b"], 0i64)?;
        assert!(eq_values(&r.get("a")?.value(), &Value::Int(0)));
        assert!(eq_values(&r.get("b")?.value(), &Value::Int(0)));

        r.set_keys(&["a", "b"], vec![Value::Int(1), Value::Int(2)])?;
        assert!(eq_values(&r.get("b")?.value(), &Value::Int(2)));

        let err = r.set_keys(&["a", "b"], Rhs::Seq(vec![Value::Int(1)]));
        assert!(err.is_err(), "length-1 sequence must not fit 2 keys");
        Ok(())
    }

    #[test]
    fn test_default_record_synthesises_and_stores() {
        let mut d = DefaultRecord::new(|| Value::Int(0));
        let n = d.get("hits");
        n.set(Value::Int(5));
        assert!(eq_values(&d.get("hits").value(), &Value::Int(5)));
        assert_eq!(d.record().keys(), vec!["hits"]);
    }
}
