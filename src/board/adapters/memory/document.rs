//! JSON document helpers shared by the in-memory record store.

use crate::board::ports::{FieldPath, FieldUpdate, RecordStoreError, RecordStoreResult};
use serde_json::{Map, Value};

fn invalid_path(path: &FieldPath, reason: impl Into<String>) -> RecordStoreError {
    RecordStoreError::InvalidPath {
        path: path.clone(),
        reason: reason.into(),
    }
}

/// Walks to the object that holds the last segment of `path`.
///
/// With `create` set, missing intermediate objects are inserted; otherwise a
/// missing intermediate yields `None`.
fn parent_object<'d, 'p>(
    document: &'d mut Value,
    path: &'p FieldPath,
    create: bool,
) -> RecordStoreResult<Option<(&'d mut Map<String, Value>, &'p str)>> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Err(invalid_path(path, "path has no segments"));
    };

    let mut current = document;
    for segment in parents {
        let Value::Object(object) = current else {
            return Err(invalid_path(
                path,
                format!("cannot descend into '{segment}' of a non-object value"),
            ));
        };
        if !create && !object.contains_key(segment) {
            return Ok(None);
        }
        current = object
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    match current {
        Value::Object(object) => Ok(Some((object, last.as_str()))),
        _ => Err(invalid_path(path, "parent of the final segment is not an object")),
    }
}

/// Appends `element` to the array at `path` unless an equal value exists.
///
/// Returns `true` when the document changed.
pub(super) fn append_unique(
    document: &mut Value,
    path: &FieldPath,
    element: Value,
) -> RecordStoreResult<bool> {
    let Some((object, field)) = parent_object(document, path, true)? else {
        return Ok(false);
    };
    match object.get_mut(field) {
        None => {
            object.insert(field.to_owned(), Value::Array(vec![element]));
            Ok(true)
        }
        Some(Value::Array(items)) => {
            if items.contains(&element) {
                return Ok(false);
            }
            items.push(element);
            Ok(true)
        }
        Some(_) => Err(invalid_path(path, "target is not an array")),
    }
}

/// Applies one path-scoped update to `document`.
pub(super) fn apply_update(document: &mut Value, update: FieldUpdate) -> RecordStoreResult<()> {
    match update {
        FieldUpdate::Set { path, value } => {
            if let Some((object, field)) = parent_object(document, &path, true)? {
                object.insert(field.to_owned(), value);
            }
            Ok(())
        }
        FieldUpdate::Remove { path } => {
            if let Some((object, field)) = parent_object(document, &path, false)? {
                object.remove(field);
            }
            Ok(())
        }
        FieldUpdate::AppendUnique { path, element } => {
            append_unique(document, &path, element).map(|_| ())
        }
    }
}
