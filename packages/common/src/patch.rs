//! # Content Patches
//!
//! Structural deltas between two [`Content`] values, used by delta-encoded
//! history entries.
//!
//! ## Operations
//!
//! - `set(path, value)`: replace the value at `path`; on an object the key is
//!   inserted if absent, on an array the index may equal the length (append)
//! - `remove(path)`: delete an object key
//! - `truncate(path, len)`: shorten the array at `path`
//!
//! `diff(a, b)` only emits operations whose preconditions hold on `a`, so
//! `apply(a, diff(a, b)) == b` always.

use crate::content::Content;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// One step of a path into a content tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// A single patch operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    Set { path: Vec<PathSegment>, value: Value },
    Remove { path: Vec<PathSegment> },
    Truncate { path: Vec<PathSegment>, len: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    #[error("Path {0} does not exist")]
    MissingPath(String),

    #[error("Path {0} has the wrong node type for this operation")]
    TypeMismatch(String),

    #[error("Index {index} is out of bounds at {path}")]
    IndexOutOfBounds { path: String, index: usize },

    #[error("Patch produced a malformed document root")]
    InvalidRoot,
}

/// Ordered list of patch operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentPatch {
    ops: Vec<PatchOp>,
}

impl ContentPatch {
    /// Compute the patch that turns `from` into `to`
    pub fn diff(from: &Content, to: &Content) -> Self {
        let mut ops = Vec::new();
        let mut path = Vec::new();
        diff_value(&mut path, from.as_value(), to.as_value(), &mut ops);
        Self { ops }
    }

    /// Apply this patch to `base`, producing a new value
    pub fn apply(&self, base: &Content) -> Result<Content, PatchError> {
        let mut value = base.as_value().clone();
        for op in &self.ops {
            apply_op(&mut value, op)?;
        }
        Content::try_from(value).map_err(|_| PatchError::InvalidRoot)
    }

    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl From<Vec<PatchOp>> for ContentPatch {
    fn from(ops: Vec<PatchOp>) -> Self {
        Self { ops }
    }
}

fn diff_value(path: &mut Vec<PathSegment>, from: &Value, to: &Value, ops: &mut Vec<PatchOp>) {
    if from == to {
        return;
    }

    match (from, to) {
        (Value::Object(old), Value::Object(new)) => {
            for key in old.keys() {
                if !new.contains_key(key) {
                    ops.push(PatchOp::Remove {
                        path: child_path(path, PathSegment::Key(key.clone())),
                    });
                }
            }
            for (key, new_value) in new {
                match old.get(key) {
                    Some(old_value) => {
                        path.push(PathSegment::Key(key.clone()));
                        diff_value(path, old_value, new_value, ops);
                        path.pop();
                    }
                    None => ops.push(PatchOp::Set {
                        path: child_path(path, PathSegment::Key(key.clone())),
                        value: new_value.clone(),
                    }),
                }
            }
        }
        (Value::Array(old), Value::Array(new)) => {
            let shared = old.len().min(new.len());
            for index in 0..shared {
                path.push(PathSegment::Index(index));
                diff_value(path, &old[index], &new[index], ops);
                path.pop();
            }
            if new.len() < old.len() {
                ops.push(PatchOp::Truncate {
                    path: path.clone(),
                    len: new.len(),
                });
            }
            for (index, value) in new.iter().enumerate().skip(shared) {
                ops.push(PatchOp::Set {
                    path: child_path(path, PathSegment::Index(index)),
                    value: value.clone(),
                });
            }
        }
        _ => ops.push(PatchOp::Set {
            path: path.clone(),
            value: to.clone(),
        }),
    }
}

fn child_path(parent: &[PathSegment], segment: PathSegment) -> Vec<PathSegment> {
    let mut path = parent.to_vec();
    path.push(segment);
    path
}

fn apply_op(root: &mut Value, op: &PatchOp) -> Result<(), PatchError> {
    match op {
        PatchOp::Set { path, value } => {
            let Some((last, parent_path)) = path.split_last() else {
                *root = value.clone();
                return Ok(());
            };
            let parent = resolve_mut(root, parent_path)?;
            match (parent, last) {
                (Value::Object(map), PathSegment::Key(key)) => {
                    map.insert(key.clone(), value.clone());
                }
                (Value::Array(items), PathSegment::Index(index)) => {
                    if *index < items.len() {
                        items[*index] = value.clone();
                    } else if *index == items.len() {
                        items.push(value.clone());
                    } else {
                        return Err(PatchError::IndexOutOfBounds {
                            path: PathDisplay(parent_path).to_string(),
                            index: *index,
                        });
                    }
                }
                _ => return Err(PatchError::TypeMismatch(PathDisplay(path).to_string())),
            }
        }
        PatchOp::Remove { path } => {
            let Some((last, parent_path)) = path.split_last() else {
                return Err(PatchError::TypeMismatch(PathDisplay(path).to_string()));
            };
            match (resolve_mut(root, parent_path)?, last) {
                (Value::Object(map), PathSegment::Key(key)) => {
                    if map.remove(key).is_none() {
                        return Err(PatchError::MissingPath(PathDisplay(path).to_string()));
                    }
                }
                _ => return Err(PatchError::TypeMismatch(PathDisplay(path).to_string())),
            }
        }
        PatchOp::Truncate { path, len } => match resolve_mut(root, path)? {
            Value::Array(items) => items.truncate(*len),
            _ => return Err(PatchError::TypeMismatch(PathDisplay(path).to_string())),
        },
    }
    Ok(())
}

fn resolve_mut<'a>(root: &'a mut Value, path: &[PathSegment]) -> Result<&'a mut Value, PatchError> {
    let mut current = root;
    for (depth, segment) in path.iter().enumerate() {
        let next = match (current, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key),
            (Value::Array(items), PathSegment::Index(index)) => items.get_mut(*index),
            _ => {
                return Err(PatchError::TypeMismatch(
                    PathDisplay(&path[..=depth]).to_string(),
                ))
            }
        };
        current =
            next.ok_or_else(|| PatchError::MissingPath(PathDisplay(&path[..=depth]).to_string()))?;
    }
    Ok(current)
}

/// Renders a path JSON-pointer style (`/content/0/text`)
pub struct PathDisplay<'a>(pub &'a [PathSegment]);

impl fmt::Display for PathDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in self.0 {
            match segment {
                PathSegment::Key(key) => write!(f, "/{}", key)?,
                PathSegment::Index(index) => write!(f, "/{}", index)?,
            }
        }
        Ok(())
    }
}
