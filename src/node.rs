//! Tree access helpers over borrowed `serde_json::Value` nodes.
//!
//! A value is a *node* iff it is an object whose type-tag field holds a
//! string. Everything else (scalars, arrays, tag-less objects) is plain data
//! that matching can inspect through dotted paths but traversal never
//! descends into as a node.

use serde_json::Value;

/// The type tag of a node, if the value is one.
pub(crate) fn tag_of<'t>(value: &'t Value, type_field: &str) -> Option<&'t str> {
    value.as_object()?.get(type_field)?.as_str()
}

/// Whether a value is a node under the given type-tag field.
pub(crate) fn is_node(value: &Value, type_field: &str) -> bool {
    tag_of(value, type_field).is_some()
}

/// The result of resolving a dotted path against a node.
///
/// `Length` is synthesized for the `length` segment on arrays and strings,
/// so attribute tests like `[params.length=1]` work without the tree
/// carrying explicit counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Resolved<'t> {
    Value(&'t Value),
    Length(usize),
}

/// Resolve a dotted field path against a value.
///
/// Returns `None` ("absent") as soon as any intermediate segment is missing.
/// A numeric segment indexes into an array; `length` on an array or string
/// yields its element or character count.
pub(crate) fn resolve_path<'t>(root: &'t Value, path: &[String]) -> Option<Resolved<'t>> {
    let mut current = Resolved::Value(root);
    for segment in path {
        current = match current {
            Resolved::Value(Value::Object(map)) => Resolved::Value(map.get(segment)?),
            Resolved::Value(Value::Array(items)) => {
                if segment == "length" {
                    Resolved::Length(items.len())
                } else {
                    Resolved::Value(items.get(segment.parse::<usize>().ok()?)?)
                }
            }
            Resolved::Value(Value::String(text)) => {
                if segment == "length" {
                    Resolved::Length(text.chars().count())
                } else {
                    return None;
                }
            }
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tag_of_reads_the_configured_field() {
        let node = json!({ "type": "Identifier", "name": "foo" });
        assert_eq!(tag_of(&node, "type"), Some("Identifier"));
        assert_eq!(tag_of(&node, "kind"), None);

        let tagged = json!({ "kind": "Foo" });
        assert_eq!(tag_of(&tagged, "kind"), Some("Foo"));
    }

    #[test]
    fn non_objects_are_not_nodes() {
        assert!(!is_node(&json!("Identifier"), "type"));
        assert!(!is_node(&json!(42), "type"));
        assert!(!is_node(&json!({ "type": 3 }), "type"));
        assert!(is_node(&json!({ "type": "Literal" }), "type"));
    }

    #[test]
    fn resolve_walks_nested_objects() {
        let node = json!({ "callee": { "name": "foo" } });
        assert_eq!(
            resolve_path(&node, &path(&["callee", "name"])),
            Some(Resolved::Value(&json!("foo")))
        );
    }

    #[test]
    fn resolve_missing_intermediate_is_absent() {
        let node = json!({ "callee": { "name": "foo" } });
        assert_eq!(resolve_path(&node, &path(&["callee", "object", "name"])), None);
        assert_eq!(resolve_path(&node, &path(&["arguments"])), None);
    }

    #[test]
    fn resolve_length_on_arrays_and_strings() {
        let node = json!({ "params": [1, 2, 3], "name": "foo" });
        assert_eq!(
            resolve_path(&node, &path(&["params", "length"])),
            Some(Resolved::Length(3))
        );
        assert_eq!(
            resolve_path(&node, &path(&["name", "length"])),
            Some(Resolved::Length(3))
        );
    }

    #[test]
    fn resolve_numeric_segment_indexes_arrays() {
        let node = json!({ "elements": ["a", "b"] });
        assert_eq!(
            resolve_path(&node, &path(&["elements", "1"])),
            Some(Resolved::Value(&json!("b")))
        );
        assert_eq!(resolve_path(&node, &path(&["elements", "2"])), None);
    }

    #[test]
    fn resolve_present_null_is_not_absent() {
        let node = json!({ "superClass": null });
        assert_eq!(
            resolve_path(&node, &path(&["superClass"])),
            Some(Resolved::Value(&Value::Null))
        );
    }
}
