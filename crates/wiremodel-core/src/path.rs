//! Object-path accessor
//!
//! Paths use dotted keys with bracketed array indices, e.g. `items[0].name`.
//! Model values are traversed through their property bags.

use crate::value::{Object, Value};
use crate::{Error, Result};

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Parse `a.b[0].c` into segments
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>> {
    let invalid = |message: &str| Error::InvalidPath {
        path: path.to_string(),
        message: message.to_string(),
    };

    if path.is_empty() {
        return Err(invalid("path is empty"));
    }

    let mut segments = Vec::new();
    for (part_index, part) in path.split('.').enumerate() {
        let (name, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if name.is_empty() && (part_index > 0 || rest.is_empty()) {
            return Err(invalid("empty key"));
        }
        if !name.is_empty() {
            if name.contains(']') {
                return Err(invalid("unexpected ']'"));
            }
            segments.push(PathSegment::Key(name.to_string()));
        }
        while !rest.is_empty() {
            let close = rest.find(']').ok_or_else(|| invalid("unclosed '['"))?;
            let index = rest[1..close]
                .trim()
                .parse::<usize>()
                .map_err(|_| invalid("array index must be a non-negative integer"))?;
            segments.push(PathSegment::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(invalid("expected '[' or '.' after ']'"));
            }
        }
    }
    Ok(segments)
}

/// Read the value at `path`, or `None` when the path is malformed or leads nowhere
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = match parse_path(path) {
        Ok(segments) => segments,
        Err(err) => {
            log::debug!("{}", err);
            return None;
        }
    };
    segments
        .iter()
        .try_fold(root, |current, segment| step(current, segment))
}

pub(crate) fn step<'a>(current: &'a Value, segment: &PathSegment) -> Option<&'a Value> {
    match (current, segment) {
        (Value::Object(map), PathSegment::Key(key)) => map.get(key),
        (Value::Model(model), PathSegment::Key(key)) => model.get(key),
        (Value::Array(items), PathSegment::Index(index)) => items.get(*index),
        (Value::Model(model), PathSegment::Index(index)) => model.array_item(*index),
        _ => None,
    }
}

/// Write `value` at `path`, creating missing intermediate objects.
///
/// An index may address an existing element or append one past the end.
pub fn set_path(root: &mut Value, path: &str, value: Value) -> Result<()> {
    let segments = parse_path(path)?;
    let unreachable = |message: String| Error::InvalidPath {
        path: path.to_string(),
        message,
    };

    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return Err(unreachable("path is empty".to_string())),
    };

    let mut current = root;
    for segment in parents {
        if current.is_nullish() {
            *current = Value::Object(Object::new());
        }
        current = step_mut(current, segment, true).map_err(unreachable)?;
    }

    if current.is_nullish() {
        *current = Value::Object(Object::new());
    }
    match (current, last) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (Value::Model(model), PathSegment::Key(key)) => {
            model.set(key.clone(), value);
            Ok(())
        }
        (Value::Array(items), PathSegment::Index(index)) => {
            if *index < items.len() {
                items[*index] = value;
                Ok(())
            } else if *index == items.len() {
                items.push(value);
                Ok(())
            } else {
                Err(unreachable(format!(
                    "index {} is out of bounds for length {}",
                    index,
                    items.len()
                )))
            }
        }
        (other, segment) => Err(unreachable(format!(
            "can not write {:?} into a {}",
            segment,
            other.kind_name()
        ))),
    }
}

fn step_mut<'a>(
    current: &'a mut Value,
    segment: &PathSegment,
    create: bool,
) -> std::result::Result<&'a mut Value, String> {
    let kind = current.kind_name();
    match (current, segment) {
        (Value::Object(map), PathSegment::Key(key)) => {
            if create && !map.contains_key(key) {
                map.insert(key.clone(), Value::Object(Object::new()));
            }
            map.get_mut(key).ok_or_else(|| format!("key '{}' not found", key))
        }
        (Value::Model(model), PathSegment::Key(key)) => {
            if create && model.get(key).is_none() {
                model.set(key.clone(), Value::Object(Object::new()));
            }
            model
                .properties_mut()
                .get_mut(key)
                .ok_or_else(|| format!("key '{}' not found", key))
        }
        (Value::Array(items), PathSegment::Index(index)) => {
            let len = items.len();
            items
                .get_mut(*index)
                .ok_or_else(|| format!("index {} is out of bounds for length {}", index, len))
        }
        (_, segment) => Err(format!("can not step into a {} with {:?}", kind, segment)),
    }
}
