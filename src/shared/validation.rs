//! Validation Utilities
//!
//! Nested field-error tree used as the structured payload of validation
//! failures. Paths nest by field name:
//! `{"parent": {"child": [{"msg": "...", "type": "..."}]}}`.

use std::collections::BTreeMap;

use serde::Serialize;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Key under which errors without a field path are collected.
pub const ROOT_KEY: &str = "__root__";

/// Key used when a leaf collides with an existing branch.
pub const COLLISION_KEY: &str = "_errors";

/// Single field-level error
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Node of the error tree: either a list of errors or a nested branch
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FieldErrorNode {
    Leaf(Vec<FieldError>),
    Branch(FieldErrorTree),
}

/// Nested field-error tree
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrorTree(BTreeMap<String, FieldErrorNode>);

impl FieldErrorTree {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&FieldErrorNode> {
        self.0.get(key)
    }

    /// Record an error at `path`. An empty path lands under [`ROOT_KEY`].
    pub fn push(&mut self, path: &[&str], msg: impl Into<String>, kind: impl Into<String>) {
        let error = FieldError {
            msg: msg.into(),
            kind: kind.into(),
        };
        let path: Vec<&str> = if path.is_empty() { vec![ROOT_KEY] } else { path.to_vec() };
        self.insert(&path, error);
    }

    fn insert(&mut self, path: &[&str], error: FieldError) {
        let (head, rest) = match path.split_first() {
            Some(split) => split,
            None => return,
        };

        if rest.is_empty() {
            match self.0.get_mut(*head) {
                None => {
                    self.0.insert(head.to_string(), FieldErrorNode::Leaf(vec![error]));
                }
                Some(FieldErrorNode::Leaf(errors)) => errors.push(error),
                Some(FieldErrorNode::Branch(branch)) => {
                    branch.insert(&[COLLISION_KEY], error);
                }
            }
            return;
        }

        let node = self
            .0
            .entry(head.to_string())
            .or_insert_with(|| FieldErrorNode::Branch(FieldErrorTree::default()));
        if let FieldErrorNode::Leaf(existing) = node {
            // Keep the leaf errors when the key turns into a branch.
            let mut branch = FieldErrorTree::default();
            for e in existing.drain(..) {
                branch.insert(&[COLLISION_KEY], e);
            }
            *node = FieldErrorNode::Branch(branch);
        }
        if let FieldErrorNode::Branch(branch) = node {
            branch.insert(rest, error);
        }
    }

    /// Convert `validator` errors, recursing into nested structs and lists.
    pub fn from_validation_errors(errors: &ValidationErrors) -> Self {
        let mut tree = FieldErrorTree::default();
        collect(&mut tree, &mut Vec::new(), errors);
        tree
    }

    /// Convert a payload deserialization error.
    ///
    /// serde_json reports missing fields by name, which is recoverable as a
    /// path; anything else is filed under the root.
    pub fn from_deserialize_error(err: &serde_json::Error) -> Self {
        let mut tree = FieldErrorTree::default();
        let text = err.to_string();
        match missing_field_name(&text) {
            Some(field) => tree.push(&[field.as_str()], "field required", "missing"),
            None => tree.push(&[], text, "parse_error"),
        }
        tree
    }
}

fn collect(tree: &mut FieldErrorTree, prefix: &mut Vec<String>, errors: &ValidationErrors) {
    for (field, kind) in errors.errors() {
        prefix.push(field.to_string());
        match kind {
            ValidationErrorsKind::Field(errs) => {
                let path: Vec<&str> = prefix.iter().map(String::as_str).collect();
                for e in errs {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid value ({})", e.code));
                    tree.push(&path, msg, e.code.to_string());
                }
            }
            ValidationErrorsKind::Struct(inner) => collect(tree, prefix, inner),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    prefix.push(index.to_string());
                    collect(tree, prefix, inner);
                    prefix.pop();
                }
            }
        }
        prefix.pop();
    }
}

fn missing_field_name(text: &str) -> Option<String> {
    let rest = text.strip_prefix("missing field `")?;
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}
