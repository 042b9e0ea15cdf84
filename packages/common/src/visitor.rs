use serde_json::{Map, Value};

/// Visitor pattern for traversing a content tree immutably
///
/// Default implementations walk the entire tree. Override specific
/// visit_* methods to act on the nodes you care about.
pub trait Visitor: Sized {
    fn visit_value(&mut self, value: &Value) {
        walk_value(self, value);
    }

    fn visit_node(&mut self, node: &Map<String, Value>) {
        walk_node(self, node);
    }

    /// Called for every `text` field of a node
    fn visit_text(&mut self, _text: &str) {
        // Leaf, no children to walk
    }

    fn visit_attribute(&mut self, _key: &str, value: &Value) {
        walk_value(self, value);
    }
}

pub fn walk_value<V: Visitor>(visitor: &mut V, value: &Value) {
    match value {
        Value::Object(node) => visitor.visit_node(node),
        Value::Array(children) => {
            for child in children {
                visitor.visit_value(child);
            }
        }
        _ => {}
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, node: &Map<String, Value>) {
    for (key, value) in node {
        match value {
            Value::String(text) if key == "text" => visitor.visit_text(text),
            _ => visitor.visit_attribute(key, value),
        }
    }
}

/// Counts visible characters
#[derive(Debug, Default)]
pub struct CharCounter {
    pub count: usize,
}

impl Visitor for CharCounter {
    fn visit_text(&mut self, text: &str) {
        self.count += text.chars().count();
    }
}

/// Collects visible text in document order
#[derive(Debug, Default)]
pub struct TextCollector {
    pub text: String,
}

impl Visitor for TextCollector {
    fn visit_text(&mut self, text: &str) {
        self.text.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counter_skips_non_text_strings() {
        let value = json!({
            "type": "doc",
            "content": [
                { "type": "paragraph", "attrs": { "align": "left" }, "content": [
                    { "type": "text", "text": "héllo" }
                ]}
            ]
        });

        let mut counter = CharCounter::default();
        counter.visit_value(&value);
        assert_eq!(counter.count, 5);
    }

    #[test]
    fn test_collector_keeps_order() {
        let value = json!({
            "content": [
                { "text": "one " },
                { "content": [{ "text": "two" }] }
            ]
        });

        let mut collector = TextCollector::default();
        collector.visit_value(&value);
        assert_eq!(collector.text, "one two");
    }
}
