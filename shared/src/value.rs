use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    rc::Rc,
};

use serde::{Deserialize, Serialize};

use crate::{class::Registry, instance::{InstanceAddr, InstanceId}};

/// Signal returned by script callbacks.
///
/// `Detach` is the event bus's "stop" signal: the callback that returned it
/// is unsubscribed from the event it was invoked for. `Cancel` is only
/// meaningful from a `Destruct` hook, where it vetoes the teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Pass,
    Detach,
    Cancel,
}

type ScriptFnInner = dyn Fn(&mut Registry, &[Value]) -> HookOutcome;

/// A script callback. Cheap to clone; compared by identity, like the
/// function values of the scripting runtime it stands in for.
#[derive(Clone)]
pub struct ScriptFn(Rc<ScriptFnInner>);

impl ScriptFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Registry, &[Value]) -> HookOutcome + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn call(&self, registry: &mut Registry, args: &[Value]) -> HookOutcome {
        (self.0)(registry, args)
    }

    /// Identity comparison. Two clones of the same callback are the same.
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ScriptFn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ScriptFn({:p})", Rc::as_ptr(&self.0))
    }
}

impl PartialEq for ScriptFn {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

pub type ValueList = Rc<RefCell<Vec<Value>>>;
pub type ValueMap = Rc<RefCell<BTreeMap<String, Value>>>;

/// A host value whose concrete type is foreign to this subsystem. It passes
/// through the value store and the wire untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueValue {
    pub tag: String,
    pub bytes: Vec<u8>,
}

/// The closed set of values representable in an instance's attribute bag.
///
/// Lists and maps are shared mutable structures, matching the semantics of
/// the scripting runtime; two bindings of the same table alias the same
/// storage, and equality on them is identity, not contents.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Number(f64),
    Str(String),
    List(ValueList),
    Map(ValueMap),
    Instance(InstanceAddr),
    Opaque(OpaqueValue),
    Function(ScriptFn),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<InstanceAddr> {
        match self {
            Value::Instance(addr) => Some(*addr),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            // tables compare by identity, like the runtime they model
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => a == b,
            (Value::Opaque(a), Value::Opaque(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.same(b),
            _ => false,
        }
    }
}

/// The wire twin of [`Value`]: fully owned, no sharing, no functions, and
/// live instance references replaced by `(className, id)` handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireValue {
    Nil,
    Bool(bool),
    Int(i64),
    Number(f64),
    Str(String),
    List(Vec<WireValue>),
    Map(BTreeMap<String, WireValue>),
    Instance { class: String, id: InstanceId },
    Opaque(OpaqueValue),
}
