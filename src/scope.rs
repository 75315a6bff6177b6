//! Explicit context-passing bindings.
//!
//! The original system injected derived collections straight into the
//! caller's frame; that relies on host-language stack introspection and is
//! not portable. [`Scope`] is the explicit replacement: the caller threads
//! it through the chain, binds views under names, and reads them back. The
//! observable contract is preserved — a bound view writes through to the
//! same shared elements, a binding that already holds an accumulated tuple
//! cannot be silently overwritten as a single view, and tuple accumulation
//! enforces shape agreement across calls.

use std::collections::HashMap;

use crate::error::{BrambleError, Result};
use crate::vine::Vine;

enum Binding {
    One(Vine),
    Tuple(Vec<Vine>),
}

/// A named store of collection bindings threaded through a chain.
#[derive(Default)]
pub struct Scope {
    bindings: HashMap<String, Binding>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `vine` under `name`, replacing a previous single binding.
    /// Errors when the binding holds an accumulated tuple.
    pub fn bind(&mut self, name: &str, vine: Vine) -> Result<&Vine> {
        match self.bindings.get(name) {
            Some(Binding::Tuple(_)) => Err(BrambleError::Type(format!(
                "binding '{name}' holds an accumulated tuple, not a single collection"
            ))),
            _ => {
                self.bindings.insert(name.to_owned(), Binding::One(vine));
                match self.bindings.get(name) {
                    Some(Binding::One(v)) => Ok(v),
                    _ => unreachable!("binding was just inserted"),
                }
            }
        }
    }

    /// Accumulates `vine` into an aligned tuple under `name`. Every
    /// accumulated collection must share the first one's length.
    pub fn bind_also(&mut self, name: &str, vine: Vine) -> Result<&[Vine]> {
        let entry = self
            .bindings
            .remove(name)
            .map(|b| match b {
                Binding::One(v) => vec![v],
                Binding::Tuple(vs) => vs,
            })
            .unwrap_or_default();

        let mut tuple = entry;
        if let Some(first) = tuple.first() {
            if first.len() != vine.len() {
                let expected = first.len();
                let got = vine.len();
                // restore before failing so the scope stays consistent
                self.bindings.insert(name.to_owned(), Binding::Tuple(tuple));
                return Err(BrambleError::ShapeMismatch { expected, got });
            }
        }
        tuple.push(vine);
        self.bindings.insert(name.to_owned(), Binding::Tuple(tuple));
        match self.bindings.get(name) {
            Some(Binding::Tuple(vs)) => Ok(vs),
            _ => unreachable!("binding was just inserted"),
        }
    }

    /// The single collection bound under `name`.
    pub fn get(&self, name: &str) -> Result<&Vine> {
        match self.bindings.get(name) {
            Some(Binding::One(v)) => Ok(v),
            Some(Binding::Tuple(_)) => Err(BrambleError::Type(format!(
                "binding '{name}' holds an accumulated tuple, not a single collection"
            ))),
            None => Err(BrambleError::Lookup {
                container: format!("no binding named '{name}'"),
                element: "scope lookup".to_owned(),
            }),
        }
    }

    /// The accumulated tuple bound under `name` (a single binding reads as a
    /// one-element tuple).
    pub fn get_tuple(&self, name: &str) -> Result<&[Vine]> {
        match self.bindings.get(name) {
            Some(Binding::Tuple(vs)) => Ok(vs),
            Some(Binding::One(v)) => Ok(std::slice::from_ref(v)),
            None => Err(BrambleError::Lookup {
                container: format!("no binding named '{name}'"),
                element: "scope lookup".to_owned(),
            }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.bindings.remove(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_bind_writes_through() -> Result<()> {
        let mut scope = Scope::new();
        let v = Vine::from_iter([1i64, 2, 3]);
        scope.bind("xs", v.clone())?;

        // the binding aliases the same cells
        v.leaves()[0].set(Value::Int(9));
        assert!(crate::value::eq_values(
            &scope.get("xs")?.leaves()[0].value(),
            &Value::Int(9)
        ));
        Ok(())
    }

    #[test]
    fn test_bind_also_accumulates_and_checks_shape() -> Result<()> {
        let mut scope = Scope::new();
        scope.bind_also("pair", Vine::from_iter([1i64, 2]))?;
        scope.bind_also("pair", Vine::from_iter([3i64, 4]))?;
        assert_eq!(scope.get_tuple("pair")?.len(), 2);

        let err = scope.bind_also("pair", Vine::from_iter([1i64])).unwrap_err();
        assert!(matches!(err, BrambleError::ShapeMismatch { .. }));
        // the earlier accumulation survives the failed call
        assert_eq!(scope.get_tuple("pair")?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_tuple_binding_rejects_single_rebind() -> Result<()> {
        let mut scope = Scope::new();
        scope.bind_also("acc", Vine::from_iter([1i64]))?;
        let err = scope.bind("acc", Vine::from_iter([2i64])).unwrap_err();
        assert!(err.to_string().contains("accumulated tuple"));
        Ok(())
    }
}
