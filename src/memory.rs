//! Per-scope variable bindings.
//!
//! One `Memory` exists per function invocation: mutable `refs` and
//! immutable `consts`. Dotted names resolve attribute by attribute, which
//! is how method dispatch works (`xs.push`, `s.to_int`); the walk never
//! creates intermediate entries.

use crate::error::{ErrorKind, RawError};
use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Memory {
    pub refs: HashMap<String, Value>,
    pub consts: HashMap<String, Value>,
}

impl Memory {
    pub fn new() -> Self {
        Memory::default()
    }

    /// Build a scope from (name, value) pairs. Consts can only be
    /// established here; updating one later is an error.
    pub fn with_bindings(
        refs: Vec<(String, Value)>,
        consts: Vec<(String, Value)>,
    ) -> Self {
        Memory {
            refs: refs.into_iter().collect(),
            consts: consts.into_iter().collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.refs.contains_key(name) || self.consts.contains_key(name)
    }

    /// Look up a possibly dotted name: fetch the first segment from the
    /// bindings, then resolve each remaining segment as an attribute of
    /// the value found so far.
    pub fn get(&self, name: &str) -> Result<Value, RawError> {
        let mut segments = name.split('.');
        let base = segments.next().unwrap_or(name);

        // Consts shadow refs when both hold the name.
        let mut result = self
            .consts
            .get(base)
            .or_else(|| self.refs.get(base))
            .cloned()
            .ok_or_else(|| {
                RawError::new(ErrorKind::NotFound, format!("'{}' not found in memory.", base))
            })?;

        for attr in segments {
            result = result.attr(attr).ok_or_else(|| {
                RawError::new(
                    ErrorKind::NotFound,
                    format!("A {} has no attribute '{}'.", result.type_name(), attr),
                )
            })?;
        }

        Ok(result)
    }

    /// Bind or overwrite a ref. Writing a const fails.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), RawError> {
        if self.consts.contains_key(name) {
            return Err(RawError::new(
                ErrorKind::WriteConst,
                format!("Modifying constant '{}' not allowed.", name),
            ));
        }
        self.refs.insert(name.to_string(), value);
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Option<Value> {
        self.refs.remove(name)
    }

    /// Copy back every ref from `other` that this scope already binds.
    /// This is how a call's reference arguments propagate to the caller.
    pub fn update_refs(&mut self, other: &Memory) {
        for (key, value) in &other.refs {
            if self.refs.contains_key(key) {
                self.refs.insert(key.clone(), value.clone());
            }
        }
    }

    /// Shallow clone: lists and strings stay shared with the original.
    pub fn copy(&self) -> Memory {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::Num;

    fn num(n: i64) -> Value {
        Value::Num(Num::from(n))
    }

    #[test]
    fn test_set_get_delete() {
        let mut memory = Memory::new();
        memory.set("x", num(3)).unwrap();
        assert!(memory.contains("x"));
        assert_eq!(memory.get("x").unwrap(), num(3));
        memory.delete("x");
        assert!(memory.get("x").is_err());
    }

    #[test]
    fn test_consts_are_immutable() {
        let mut memory =
            Memory::with_bindings(Vec::new(), vec![("k".to_string(), num(1))]);
        assert_eq!(memory.get("k").unwrap(), num(1));
        let err = memory.set("k", num(2)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::WriteConst);
    }

    #[test]
    fn test_dotted_lookup_resolves_methods() {
        let mut memory = Memory::new();
        memory.set("xs", Value::list_from(Vec::new())).unwrap();
        let method = memory.get("xs.push").unwrap();
        assert!(matches!(method, Value::Method(_)));
        // The walk must not have created an "xs.push" entry.
        assert!(!memory.refs.contains_key("xs.push"));
    }

    #[test]
    fn test_dotted_lookup_unknown_attribute() {
        let mut memory = Memory::new();
        memory.set("xs", Value::list_from(Vec::new())).unwrap();
        let err = memory.get("xs.reverse").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_copy_is_shallow() {
        let mut memory = Memory::new();
        memory
            .set("xs", Value::list_from(vec![num(1)]))
            .unwrap();

        let copied = memory.copy();
        // The clone has its own maps, but the list itself is shared.
        if let (Ok(Value::List(a)), Ok(Value::List(b))) =
            (memory.get("xs"), copied.get("xs"))
        {
            a.borrow_mut().push(num(2));
            assert_eq!(b.borrow().len(), 2);
        } else {
            panic!("expected lists in both scopes");
        }
    }

    #[test]
    fn test_update_refs_only_overwrites_existing() {
        let mut caller = Memory::new();
        caller.set("x", num(1)).unwrap();

        let mut callee = Memory::new();
        callee.set("x", num(10)).unwrap();
        callee.set("y", num(20)).unwrap();

        caller.update_refs(&callee);
        assert_eq!(caller.get("x").unwrap(), num(10));
        assert!(!caller.contains("y"));
    }
}
