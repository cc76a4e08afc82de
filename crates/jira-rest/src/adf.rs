//! Atlassian Document Format helpers.
//!
//! Jira Cloud (API v3) stores descriptions and comment bodies as ADF trees.
//! Jira Server (API v2) uses plain strings. Both are accepted on input and
//! flattened to plain text on output.

use serde_json::{json, Value};

const BLOCK_NODES: &[&str] = &[
    "paragraph",
    "heading",
    "blockquote",
    "codeBlock",
    "listItem",
    "panel",
    "rule",
    "tableRow",
];

/// Flatten an ADF document (or a plain string) into plain text.
pub fn to_plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        _ => {
            let mut out = String::new();
            collect_text(value, &mut out);
            out.trim_end().to_string()
        }
    }
}

fn collect_text(node: &Value, out: &mut String) {
    let node_type = node.get("type").and_then(Value::as_str).unwrap_or("");
    let start = out.len();

    match node_type {
        "text" => {
            if let Some(text) = node.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
            return;
        }
        "hardBreak" => {
            out.push('\n');
            return;
        }
        "mention" => {
            if let Some(text) = node.pointer("/attrs/text").and_then(Value::as_str) {
                out.push_str(text);
            }
            return;
        }
        "listItem" => out.push_str("- "),
        _ => {}
    }

    if let Some(children) = node.get("content").and_then(Value::as_array) {
        for child in children {
            collect_text(child, out);
        }
    }

    // Empty blocks still end a line.
    if BLOCK_NODES.contains(&node_type) && (out.len() == start || !out.ends_with('\n')) {
        out.push('\n');
    }
}

/// Build an ADF document from plain text, one paragraph per line.
pub fn from_plain_text(text: &str) -> Value {
    let paragraphs: Vec<Value> = text
        .lines()
        .map(|line| {
            if line.is_empty() {
                json!({ "type": "paragraph", "content": [] })
            } else {
                json!({
                    "type": "paragraph",
                    "content": [{ "type": "text", "text": line }]
                })
            }
        })
        .collect();

    json!({
        "type": "doc",
        "version": 1,
        "content": paragraphs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_string_passthrough() {
        assert_eq!(to_plain_text(&json!("already text")), "already text");
        assert_eq!(to_plain_text(&Value::Null), "");
    }

    #[test]
    fn test_paragraphs_and_breaks() {
        let doc = json!({
            "type": "doc",
            "version": 1,
            "content": [
                { "type": "paragraph", "content": [
                    { "type": "text", "text": "first" },
                    { "type": "hardBreak" },
                    { "type": "text", "text": "second" }
                ]},
                { "type": "paragraph", "content": [
                    { "type": "text", "text": "third" }
                ]}
            ]
        });
        assert_eq!(to_plain_text(&doc), "first\nsecond\nthird");
    }

    #[test]
    fn test_bullet_list() {
        let doc = json!({
            "type": "doc",
            "content": [{
                "type": "bulletList",
                "content": [
                    { "type": "listItem", "content": [
                        { "type": "paragraph", "content": [{ "type": "text", "text": "a" }] }
                    ]},
                    { "type": "listItem", "content": [
                        { "type": "paragraph", "content": [{ "type": "text", "text": "b" }] }
                    ]}
                ]
            }]
        });
        assert_eq!(to_plain_text(&doc), "- a\n- b");
    }

    #[test]
    fn test_from_plain_text_shape() {
        let doc = from_plain_text("line one\n\nline three");
        assert_eq!(doc["type"], "doc");
        assert_eq!(doc["content"].as_array().map(Vec::len), Some(3));
        assert_eq!(doc["content"][0]["content"][0]["text"], "line one");
        assert_eq!(to_plain_text(&doc), "line one\n\nline three");
    }
}
