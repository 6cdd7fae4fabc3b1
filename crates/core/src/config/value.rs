//! Helpers over the untyped YAML value tree that configurations are made of.

use serde_yaml::{Mapping, Value};

/// Build a mapping key from a string.
pub fn key(name: &str) -> Value {
    Value::String(name.to_owned())
}

/// Get a human-readable type name for a YAML value.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "dict",
        Value::Tagged(_) => "tagged",
    }
}

/// Render a value on a single line for error messages.
pub fn repr(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{s}'"),
        Value::Sequence(items) => {
            let items: Vec<String> = items.iter().map(repr).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(map) => {
            let pairs: Vec<String> =
                map.iter().map(|(k, v)| format!("{}: {}", repr(k), repr(v))).collect();
            format!("{{{}}}", pairs.join(", "))
        }
        Value::Tagged(tagged) => format!("{} {}", tagged.tag, repr(&tagged.value)),
    }
}

/// Render the keys of a mapping as a tuple, e.g. `('a', 'b')`.
pub fn repr_keys(map: &Mapping) -> String {
    let keys: Vec<String> = map.keys().map(repr).collect();
    match keys.as_slice() {
        [single] => format!("({single},)"),
        _ => format!("({})", keys.join(", ")),
    }
}

/// Convert a mapping key into the string used for option names.
pub fn key_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => repr(other),
    }
}

/// Python-style truthiness: null, false, zero and empty collections are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Sequence(items) => !items.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(_) => true,
    }
}

/// Insert `value` at a dot-separated path such as `foo.bar`.
///
/// Intermediate mappings are created when missing or null; entries already
/// present alongside the destination are kept. When an intermediate entry
/// exists but is not a mapping the value is handed back untouched.
pub fn insert_path(target: &mut Mapping, path: &str, value: Value) -> Result<(), Value> {
    let segments: Vec<&str> = path.split('.').collect();
    insert_segments(target, &segments, value)
}

fn insert_segments(target: &mut Mapping, segments: &[&str], value: Value) -> Result<(), Value> {
    match segments {
        [] => Err(value),
        [last] => {
            target.insert(key(last), value);
            Ok(())
        }
        [first, rest @ ..] => {
            if target.get(*first).is_none_or(Value::is_null) {
                target.insert(key(first), Value::Mapping(Mapping::new()));
            }
            match target.get_mut(*first) {
                Some(Value::Mapping(child)) => insert_segments(child, rest, value),
                _ => Err(value),
            }
        }
    }
}

/// Recursively merge `overlay` into `base`; overlay entries win, nested
/// mappings are merged key by key.
pub fn deep_merge(base: &mut Mapping, overlay: Mapping) {
    for (k, v) in overlay {
        let incoming = match v {
            Value::Mapping(incoming) => incoming,
            other => {
                base.insert(k, other);
                continue;
            }
        };
        if let Some(Value::Mapping(existing)) = base.get_mut(&k) {
            deep_merge(existing, incoming);
            continue;
        }
        base.insert(k, Value::Mapping(incoming));
    }
}
