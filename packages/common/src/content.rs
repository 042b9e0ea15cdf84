//! # Content Model
//!
//! The editable document body: a generic JSON tree emitted by the rich-text
//! editor on every change. Two values are compared by deep structural
//! equality only; there is no semantic diffing at this layer.
//!
//! A well-formed root is either a JSON object (the usual editor document)
//! or a bare string. The empty document is `{}`.

use crate::error::CommonError;
use crate::visitor::{CharCounter, TextCollector, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Editable document body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Content(Value);

impl Content {
    /// The empty document (`{}`)
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Build a single-paragraph editor document
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self(json!({
            "type": "doc",
            "content": [{
                "type": "paragraph",
                "content": [{ "type": "text", "text": text.into() }]
            }]
        }))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Number of visible characters
    pub fn char_count(&self) -> usize {
        match &self.0 {
            Value::String(text) => text.chars().count(),
            value => {
                let mut counter = CharCounter::default();
                counter.visit_value(value);
                counter.count
            }
        }
    }

    /// Visible text, concatenated in document order
    pub fn text(&self) -> String {
        match &self.0 {
            Value::String(text) => text.clone(),
            value => {
                let mut collector = TextCollector::default();
                collector.visit_value(value);
                collector.text
            }
        }
    }

    /// True for `{}` and `""`
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Object(map) => map.is_empty(),
            Value::String(text) => text.is_empty(),
            _ => false,
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<Value> for Content {
    type Error = CommonError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(_) | Value::String(_) => Ok(Self(value)),
            Value::Null => Err(CommonError::Validation("content is missing".to_string())),
            other => Err(CommonError::Validation(format!(
                "content must be an object or a string, got {}",
                kind_of(&other)
            ))),
        }
    }
}

impl From<Content> for Value {
    fn from(content: Content) -> Self {
        content.0
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self(Value::String(text.to_string()))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
