//! Runtime values for Arrow.
//!
//! Rationals, booleans and strings behave as immutable data; lists (and
//! strings, through their prefix builtins) are shared by reference, so
//! mutating through one binding is visible through every alias. Functions
//! are first-class; a builtin method is a value too, carrying its
//! receiver and a (forward, inverse) pair of native operations.

use crate::ast::Function;
use crate::error::{ErrorKind, RawError};
use crate::memory::Memory;
use crate::num::Num;
use num_bigint::BigUint;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A list shared between bindings.
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// A string shared between bindings; `left_add`/`left_del` mutate it.
pub type StrRef = Rc<RefCell<String>>;

/// The body of a builtin method. Receives the method's receiver and a
/// memory holding the named const arguments; returns the result value,
/// if the operation produces one.
pub type NativeOp = fn(&Value, &Memory) -> Result<Option<Value>, RawError>;

/// A builtin method: a forward native operation and the native operation
/// that undoes it. Pure observers are their own inverses.
pub struct MethodDef {
    pub name: &'static str,
    pub const_params: &'static [&'static str],
    pub forward: NativeOp,
    pub inverse: NativeOp,
}

/// A method looked up on a value, ready to invoke.
#[derive(Clone)]
pub struct BoundMethod {
    pub receiver: Box<Value>,
    pub method: &'static MethodDef,
}

#[derive(Clone)]
pub enum Value {
    Num(Num),
    Bool(bool),
    Str(StrRef),
    List(ListRef),
    Function(Rc<Function>),
    Method(BoundMethod),
}

impl Value {
    pub fn str_from(text: &str) -> Value {
        Value::Str(Rc::new(RefCell::new(text.to_string())))
    }

    pub fn list_from(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Num(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Method(_) => "method",
        }
    }

    /// Look up a builtin method by name, binding this value as the
    /// receiver. This is how a dotted lookup like `xs.push` resolves.
    pub fn attr(&self, name: &str) -> Option<Value> {
        let table: &'static [MethodDef] = match self {
            Value::List(_) => LIST_METHODS,
            Value::Str(_) => STRING_METHODS,
            _ => return None,
        };
        table.iter().find(|m| m.name == name).map(|method| {
            Value::Method(BoundMethod {
                receiver: Box::new(self.clone()),
                method,
            })
        })
    }
}

impl PartialEq for Value {
    /// Structural equality for data values; identity for callables.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => *a.borrow() == *b.borrow(),
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Method(a), Value::Method(b)) => {
                std::ptr::eq(a.method, b.method) && a.receiver == b.receiver
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => write!(f, "{}", s.borrow()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Function(func) => write!(f, "<function {}>", func.name),
            Value::Method(m) => write!(f, "<method {}>", m.method.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Num(n) => write!(f, "Num({})", n),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Str(s) => write!(f, "Str({:?})", s.borrow()),
            Value::List(items) => write!(f, "List({:?})", items.borrow()),
            Value::Function(func) => write!(f, "Function({})", func.name),
            Value::Method(m) => write!(f, "Method({})", m.method.name),
        }
    }
}

fn type_error(expected: &str, found: &Value) -> RawError {
    RawError::new(
        ErrorKind::TypeMismatch,
        format!("Expected a {}, but found a {}.", expected, found.type_name()),
    )
}

fn expect_list(value: &Value) -> Result<&ListRef, RawError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(type_error("list", other)),
    }
}

fn expect_str(value: &Value) -> Result<&StrRef, RawError> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(type_error("string", other)),
    }
}

// ---------------------------------------------------------------------
// List builtins
// ---------------------------------------------------------------------

/// `push` and `pop` are each other's inverses; the observers invert to
/// themselves.
pub static LIST_METHODS: &[MethodDef] = &[
    MethodDef {
        name: "push",
        const_params: &["data"],
        forward: list_push,
        inverse: list_pop,
    },
    MethodDef {
        name: "pop",
        const_params: &[],
        forward: list_pop,
        inverse: list_push,
    },
    MethodDef {
        name: "peek",
        const_params: &[],
        forward: list_peek,
        inverse: list_peek,
    },
    MethodDef {
        name: "empty",
        const_params: &[],
        forward: list_empty,
        inverse: list_empty,
    },
    MethodDef {
        name: "len",
        const_params: &[],
        forward: list_len,
        inverse: list_len,
    },
];

fn list_push(receiver: &Value, table: &Memory) -> Result<Option<Value>, RawError> {
    let items = expect_list(receiver)?;
    let data = table.get("data")?;
    items.borrow_mut().push(data);
    Ok(None)
}

fn list_pop(receiver: &Value, _table: &Memory) -> Result<Option<Value>, RawError> {
    let items = expect_list(receiver)?;
    let popped = items.borrow_mut().pop().ok_or_else(|| {
        RawError::new(ErrorKind::BadIndex, "Cannot pop from an empty list.")
    })?;
    Ok(Some(popped))
}

fn list_peek(receiver: &Value, _table: &Memory) -> Result<Option<Value>, RawError> {
    let items = expect_list(receiver)?;
    let top = items.borrow().last().cloned().ok_or_else(|| {
        RawError::new(ErrorKind::BadIndex, "Cannot peek at an empty list.")
    })?;
    Ok(Some(top))
}

fn list_empty(receiver: &Value, _table: &Memory) -> Result<Option<Value>, RawError> {
    let items = expect_list(receiver)?;
    let empty = items.borrow().is_empty();
    Ok(Some(Value::Bool(empty)))
}

fn list_len(receiver: &Value, _table: &Memory) -> Result<Option<Value>, RawError> {
    let items = expect_list(receiver)?;
    let len = items.borrow().len();
    Ok(Some(Value::Num(Num::from_biguint(BigUint::from(len)))))
}

// ---------------------------------------------------------------------
// String builtins
// ---------------------------------------------------------------------

/// `left_add` prepends and `left_del` removes the same prefix; they are
/// declared inverses so string edits stay reversible.
pub static STRING_METHODS: &[MethodDef] = &[
    MethodDef {
        name: "len",
        const_params: &[],
        forward: string_len,
        inverse: string_len,
    },
    MethodDef {
        name: "get",
        const_params: &["index"],
        forward: string_get,
        inverse: string_get,
    },
    MethodDef {
        name: "left_add",
        const_params: &["other"],
        forward: string_left_add,
        inverse: string_left_del,
    },
    MethodDef {
        name: "left_del",
        const_params: &["other"],
        forward: string_left_del,
        inverse: string_left_add,
    },
    MethodDef {
        name: "to_int",
        const_params: &[],
        forward: string_to_int,
        inverse: string_to_int,
    },
];

fn string_len(receiver: &Value, _table: &Memory) -> Result<Option<Value>, RawError> {
    let s = expect_str(receiver)?;
    let len = s.borrow().chars().count();
    Ok(Some(Value::Num(Num::from_biguint(BigUint::from(len)))))
}

fn string_get(receiver: &Value, table: &Memory) -> Result<Option<Value>, RawError> {
    let s = expect_str(receiver)?;
    let index = match table.get("index")? {
        Value::Num(n) => n,
        other => return Err(type_error("number", &other)),
    };
    let s = s.borrow();
    let i = index.to_index().ok_or_else(|| {
        RawError::new(
            ErrorKind::BadIndex,
            format!("'{}' is not a valid string index.", index),
        )
    })?;
    match s.chars().nth(i) {
        Some(c) => Ok(Some(Value::str_from(&c.to_string()))),
        None => Err(RawError::new(
            ErrorKind::BadIndex,
            format!("Index {} is out of bounds for a string of length {}.", index, s.chars().count()),
        )),
    }
}

fn string_left_add(receiver: &Value, table: &Memory) -> Result<Option<Value>, RawError> {
    let s = expect_str(receiver)?;
    let other = table.get("other")?;
    let prefix = expect_str(&other)?.borrow().clone();
    s.borrow_mut().insert_str(0, &prefix);
    Ok(None)
}

fn string_left_del(receiver: &Value, table: &Memory) -> Result<Option<Value>, RawError> {
    let s = expect_str(receiver)?;
    let other = table.get("other")?;
    let prefix = expect_str(&other)?.borrow().clone();
    let mut s = s.borrow_mut();
    if !s.starts_with(&prefix) {
        return Err(RawError::new(
            ErrorKind::ConditionViolation,
            format!("'{}' is not a prefix of '{}', so it cannot be removed.", prefix, s),
        ));
    }
    s.drain(..prefix.len());
    Ok(None)
}

fn string_to_int(receiver: &Value, _table: &Memory) -> Result<Option<Value>, RawError> {
    let s = expect_str(receiver)?;
    let s = s.borrow();
    let (digits, sign) = match s.strip_prefix('-') {
        Some(rest) => (rest, -1),
        None => (s.as_str(), 1),
    };
    let magnitude = BigUint::parse_bytes(digits.as_bytes(), 10).ok_or_else(|| {
        RawError::new(
            ErrorKind::TypeMismatch,
            format!("'{}' is not an integer.", s),
        )
    })?;
    let number = Num::from_parts(magnitude, BigUint::from(1u8), sign)
        .map_err(|_| RawError::new(ErrorKind::DivByZero, "division by zero"))?;
    Ok(Some(Value::Num(number)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consts(pairs: &[(&str, Value)]) -> Memory {
        Memory::with_bindings(
            Vec::new(),
            pairs.iter().map(|(n, v)| (n.to_string(), v.clone())).collect(),
        )
    }

    #[test]
    fn test_list_push_pop_are_inverses() {
        let list = Value::list_from(vec![Value::Num(Num::from(1))]);
        let table = consts(&[("data", Value::Num(Num::from(2)))]);

        list_push(&list, &table).unwrap();
        assert_eq!(
            list,
            Value::list_from(vec![Value::Num(Num::from(1)), Value::Num(Num::from(2))])
        );

        let popped = list_pop(&list, &Memory::new()).unwrap();
        assert_eq!(popped, Some(Value::Num(Num::from(2))));
        assert_eq!(list, Value::list_from(vec![Value::Num(Num::from(1))]));
    }

    #[test]
    fn test_list_observers() {
        let list = Value::list_from(vec![Value::Num(Num::from(7))]);
        assert_eq!(
            list_peek(&list, &Memory::new()).unwrap(),
            Some(Value::Num(Num::from(7)))
        );
        assert_eq!(
            list_empty(&list, &Memory::new()).unwrap(),
            Some(Value::Bool(false))
        );
        assert_eq!(
            list_len(&list, &Memory::new()).unwrap(),
            Some(Value::Num(Num::from(1)))
        );
    }

    #[test]
    fn test_pop_from_empty_fails() {
        let list = Value::list_from(Vec::new());
        assert!(list_pop(&list, &Memory::new()).is_err());
    }

    #[test]
    fn test_string_prefix_roundtrip() {
        let s = Value::str_from("world");
        let table = consts(&[("other", Value::str_from("hello "))]);

        string_left_add(&s, &table).unwrap();
        assert_eq!(s, Value::str_from("hello world"));

        string_left_del(&s, &table).unwrap();
        assert_eq!(s, Value::str_from("world"));
    }

    #[test]
    fn test_left_del_requires_matching_prefix() {
        let s = Value::str_from("world");
        let table = consts(&[("other", Value::str_from("xyz"))]);
        let err = string_left_del(&s, &table).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConditionViolation);
    }

    #[test]
    fn test_string_get_and_to_int() {
        let s = Value::str_from("abc");
        let table = consts(&[("index", Value::Num(Num::from(1)))]);
        assert_eq!(string_get(&s, &table).unwrap(), Some(Value::str_from("b")));

        let n = Value::str_from("-42");
        assert_eq!(
            string_to_int(&n, &Memory::new()).unwrap(),
            Some(Value::Num(Num::from(-42)))
        );
        assert!(string_to_int(&Value::str_from("4a"), &Memory::new()).is_err());
    }

    #[test]
    fn test_method_lookup() {
        let list = Value::list_from(Vec::new());
        assert!(list.attr("push").is_some());
        assert!(list.attr("left_add").is_none());
        let s = Value::str_from("x");
        assert!(s.attr("left_add").is_some());
        assert!(Value::Bool(true).attr("len").is_none());
    }

    #[test]
    fn test_list_aliasing() {
        let shared = Value::list_from(vec![Value::Num(Num::from(1))]);
        let alias = shared.clone();
        let table = consts(&[("data", Value::Num(Num::from(2)))]);
        list_push(&shared, &table).unwrap();
        // Mutation through one binding is visible through the other.
        assert_eq!(
            alias,
            Value::list_from(vec![Value::Num(Num::from(1)), Value::Num(Num::from(2))])
        );
    }
}
