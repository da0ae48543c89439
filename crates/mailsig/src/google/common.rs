//! Shared utilities for Google API responses

use serde_json::Value;

const ENTITIES: [(&str, char); 5] = [
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&#39;", '\''),
    ("&quot;", '"'),
];

/// Decode the five HTML entities Gmail escapes in string fields.
///
/// Single pass, so `&amp;lt;` becomes `&lt;` rather than `<`. Any other
/// entity is left as is.
pub fn unescape_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        match ENTITIES.iter().find(|(entity, _)| tail.starts_with(entity)) {
            Some((entity, decoded)) => {
                out.push(*decoded);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Unescape the `snippet` string field of a result item in place.
pub fn unescape_snippet(item: &mut Value) {
    if let Some(Value::String(snippet)) = item.get_mut("snippet") {
        *snippet = unescape_entities(snippet);
    }
}

/// Apply [`unescape_snippet`] to every item, preserving order.
pub fn unescape_snippets(items: Vec<Value>) -> Vec<Value> {
    items
        .into_iter()
        .map(|mut item| {
            unescape_snippet(&mut item);
            item
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unescape_known_entities() {
        assert_eq!(
            unescape_entities("Hi &amp; welcome &lt;b&gt;&#39;s&#39;&quot;"),
            "Hi & welcome <b>'s'\""
        );
    }

    #[test]
    fn test_unknown_entities_left_verbatim() {
        assert_eq!(unescape_entities("&copy; 2024 &amp co &"), "&copy; 2024 &amp co &");
    }

    #[test]
    fn test_single_pass() {
        assert_eq!(unescape_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_unescape_snippets() {
        let items = vec![
            json!({"id": "1", "snippet": "Tom &amp; Jerry"}),
            json!({"id": "2"}),
            json!({"id": "3", "snippet": 42}),
        ];

        let result = unescape_snippets(items);
        assert_eq!(
            result,
            vec![
                json!({"id": "1", "snippet": "Tom & Jerry"}),
                json!({"id": "2"}),
                json!({"id": "3", "snippet": 42}),
            ]
        );
    }
}
