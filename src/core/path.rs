//! Dotted key paths into nested JSON objects and arrays.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static KEY_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]+(\.[\w-]+)*$").expect("key path pattern"));

/// A validated `a.b.c` key path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath<'a> {
    segments: Vec<&'a str>,
}

impl<'a> KeyPath<'a> {
    pub fn parse(raw: &'a str) -> Option<Self> {
        if !KEY_PATH.is_match(raw) {
            return None;
        }
        Some(KeyPath {
            segments: raw.split('.').collect(),
        })
    }

    pub fn head(&self) -> &'a str {
        self.segments[0]
    }
}

fn index_of(segment: &str) -> Option<usize> {
    segment.parse().ok()
}

fn child<'v>(value: &'v Value, segment: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(index_of(segment)?),
        _ => None,
    }
}

fn child_mut<'v>(value: &'v mut Value, segment: &str) -> Option<&'v mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => items.get_mut(index_of(segment)?),
        _ => None,
    }
}

/// Slot for `segment` under `slot`, created as `null` if missing.
///
/// An array is entered when `segment` indexes an element or the position
/// just past the end. Anything else that cannot hold `segment` is replaced
/// with an empty object first.
fn child_or_insert<'v>(slot: &'v mut Value, segment: &str) -> Option<&'v mut Value> {
    let index = match &*slot {
        Value::Array(items) => index_of(segment).filter(|i| *i <= items.len()),
        _ => None,
    };
    match (slot, index) {
        (Value::Array(items), Some(index)) => {
            if index == items.len() {
                items.push(Value::Null);
            }
            items.get_mut(index)
        }
        (slot, _) => {
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            slot.as_object_mut()
                .map(|map| map.entry(segment.to_string()).or_insert(Value::Null))
        }
    }
}

/// Follow `path` through nested objects and arrays.
pub fn lookup<'v>(data: &'v Map<String, Value>, path: &KeyPath<'_>) -> Option<&'v Value> {
    let (first, rest) = path.segments.split_first()?;
    rest.iter()
        .try_fold(data.get(*first)?, |cursor, segment| child(cursor, segment))
}

/// Write `value` at `path`. Missing intermediates become empty objects, as
/// do scalars in the way; arrays are kept and indexed by numeric segments.
pub fn assign(data: &mut Map<String, Value>, path: &KeyPath<'_>, value: Value) {
    let Some((first, rest)) = path.segments.split_first() else {
        return;
    };
    let mut slot = data.entry(first.to_string()).or_insert(Value::Null);
    for segment in rest {
        let Some(next) = child_or_insert(slot, segment) else {
            return;
        };
        slot = next;
    }
    *slot = value;
}

/// Remove the leaf at `path`. Missing intermediates make this a no-op.
///
/// Removing an array element shifts the later elements down.
pub fn remove(data: &mut Map<String, Value>, path: &KeyPath<'_>) -> Option<Value> {
    let (last, parents) = path.segments.split_last()?;
    let Some((first, middle)) = parents.split_first() else {
        return data.remove(*last);
    };
    let mut cursor = data.get_mut(*first)?;
    for segment in middle {
        cursor = child_mut(cursor, segment)?;
    }
    match cursor {
        Value::Object(map) => map.remove(*last),
        Value::Array(items) => {
            let index = index_of(last).filter(|i| *i < items.len())?;
            Some(items.remove(index))
        }
        _ => None,
    }
}
