//! Deep merge of JSON layers.

use serde_json::{Map, Value};

/// Recursively overlay `upper` onto `base`; non-object values replace.
pub(super) fn overlay(base: &mut Value, upper: &Value) {
    match (base, upper) {
        (Value::Object(base_map), Value::Object(upper_map)) => {
            for (key, value) in upper_map {
                match base_map.get_mut(key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (slot, value) => *slot = value.clone(),
    }
}

/// Overlay `upper` onto `base`, skipping leaves that `locked` pins.
///
/// An object in `locked` only pins the keys it names; any other locked value
/// pins the whole subtree.
pub(super) fn overlay_unlocked(base: &mut Value, upper: &Value, locked: Option<&Value>) {
    let locked_map = match locked {
        None => return overlay(base, upper),
        Some(Value::Object(map)) => map,
        Some(_) => return,
    };
    let (Value::Object(base_map), Value::Object(upper_map)) = (base, upper) else {
        return;
    };
    for (key, value) in upper_map {
        match locked_map.get(key) {
            None => match base_map.get_mut(key) {
                Some(existing) => overlay(existing, value),
                None => {
                    base_map.insert(key.clone(), value.clone());
                }
            },
            Some(pinned @ Value::Object(_)) => {
                let entry = base_map
                    .entry(key.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                overlay_unlocked(entry, value, Some(pinned));
            }
            Some(_) => {}
        }
    }
}
