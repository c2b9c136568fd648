use std::collections::HashMap;

use crate::value::ScriptFn;

/// The fixed set of overridable behavior slots a class carries.
///
/// A child class receives a copy of its parent's table at creation time, so
/// overloaded behaviors inherit by default until the child overrides a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookSlot {
    /// User constructor, run after identity allocation with `[instance, args...]`
    Construct,
    /// User destructor; returning `Cancel` vetoes the teardown
    Destruct,
    /// String conversion
    ToString,
    /// Call overload
    Call,
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Lt,
    Len,
    Concat,
}

/// Per-class table of hook slots.
#[derive(Debug, Clone, Default)]
pub struct HookTable {
    slots: HashMap<HookSlot, ScriptFn>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the parent's table, taken once at class creation.
    pub fn inherited(parent: &HookTable) -> Self {
        Self {
            slots: parent.slots.clone(),
        }
    }

    pub fn get(&self, slot: HookSlot) -> Option<&ScriptFn> {
        self.slots.get(&slot)
    }

    pub fn set(&mut self, slot: HookSlot, hook: ScriptFn) {
        self.slots.insert(slot, hook);
    }

    pub fn clear(&mut self, slot: HookSlot) {
        self.slots.remove(&slot);
    }
}
