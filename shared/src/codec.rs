//! Conversion between live values and their wire representation.
//!
//! Live instance references become `(className, id)` handles; shared
//! lists/maps are deep-copied with cycle cutting (re-entering a structure
//! already on the encoding stack yields `Nil`). Decoding resolves handles
//! back against the local registry; a handle whose target is not mirrored
//! yet decodes to `Nil`; deferred remote events re-decode at replay time,
//! so early-arriving handles resolve once the mirror exists.

use std::{collections::BTreeMap, rc::Rc};

use log::warn;

use crate::{
    class::Registry,
    error::CodecError,
    value::{Value, WireValue},
};

pub fn encode(registry: &Registry, value: &Value) -> Result<WireValue, CodecError> {
    let mut visiting = Vec::new();
    encode_inner(registry, value, &mut visiting)
}

fn encode_inner(
    registry: &Registry,
    value: &Value,
    visiting: &mut Vec<usize>,
) -> Result<WireValue, CodecError> {
    Ok(match value {
        Value::Nil => WireValue::Nil,
        Value::Bool(b) => WireValue::Bool(*b),
        Value::Int(i) => WireValue::Int(*i),
        Value::Number(n) => WireValue::Number(*n),
        Value::Str(s) => WireValue::Str(s.clone()),
        Value::List(list) => {
            let marker = Rc::as_ptr(list) as usize;
            if visiting.contains(&marker) {
                // cycle: cut it here
                WireValue::Nil
            } else {
                visiting.push(marker);
                let mut items = Vec::with_capacity(list.borrow().len());
                for item in list.borrow().iter() {
                    items.push(encode_inner(registry, item, visiting)?);
                }
                visiting.pop();
                WireValue::List(items)
            }
        }
        Value::Map(map) => {
            let marker = Rc::as_ptr(map) as usize;
            if visiting.contains(&marker) {
                WireValue::Nil
            } else {
                visiting.push(marker);
                let mut entries = BTreeMap::new();
                for (key, item) in map.borrow().iter() {
                    entries.insert(key.clone(), encode_inner(registry, item, visiting)?);
                }
                visiting.pop();
                WireValue::Map(entries)
            }
        }
        Value::Instance(addr) => WireValue::Instance {
            class: registry.class_name(addr.class).to_owned(),
            id: addr.id,
        },
        Value::Opaque(opaque) => WireValue::Opaque(opaque.clone()),
        Value::Function(_) => return Err(CodecError::FunctionValue),
    })
}

pub fn decode(registry: &Registry, wire: &WireValue) -> Value {
    match wire {
        WireValue::Nil => Value::Nil,
        WireValue::Bool(b) => Value::Bool(*b),
        WireValue::Int(i) => Value::Int(*i),
        WireValue::Number(n) => Value::Number(*n),
        WireValue::Str(s) => Value::Str(s.clone()),
        WireValue::List(items) => {
            Value::list(items.iter().map(|item| decode(registry, item)).collect())
        }
        WireValue::Map(entries) => Value::map(
            entries
                .iter()
                .map(|(key, item)| (key.clone(), decode(registry, item)))
                .collect(),
        ),
        WireValue::Instance { class, id } => {
            let Some(class_id) = registry.class_by_name(class) else {
                warn!("instance handle references unknown class `{}`", class);
                return Value::Nil;
            };
            match registry.instance_by_id(class_id, *id) {
                Some(addr) => Value::Instance(addr),
                None => {
                    warn!("instance handle {}:{} is not mirrored here", class, id);
                    Value::Nil
                }
            }
        }
        WireValue::Opaque(opaque) => Value::Opaque(opaque.clone()),
    }
}
