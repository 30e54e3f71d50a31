//! Structured (key/value tree) extraction and reconstruction.
//!
//! Every string leaf becomes a fragment whose locator is the path of keys
//! and indices from the root. Keys are never masked, and non-string leaves
//! (numbers, booleans, null) pass through untouched. The data model is a
//! tree, not a graph; traversal depth is capped so a pathological input
//! fails with a typed error instead of exhausting the stack.
//!
//! License: MIT OR Apache-2.0

use serde_json::Value;

use crate::errors::VeilError;
use crate::parsers::{Fragment, Locator, PathSeg};

/// Maximum nesting depth the walker will follow.
pub const MAX_TREE_DEPTH: usize = 64;

/// Walks the tree and emits one fragment per string leaf, in deterministic
/// traversal order (map keys in their stored order, array elements by index).
pub fn parse(tree: &Value) -> Result<Vec<Fragment>, VeilError> {
    let mut fragments = Vec::new();
    let mut path = Vec::new();
    walk(tree, &mut path, 0, &mut fragments)?;
    Ok(fragments)
}

fn walk(
    node: &Value,
    path: &mut Vec<PathSeg>,
    depth: usize,
    out: &mut Vec<Fragment>,
) -> Result<(), VeilError> {
    if depth > MAX_TREE_DEPTH {
        return Err(VeilError::MaxDepthExceeded {
            max_depth: MAX_TREE_DEPTH,
        });
    }
    match node {
        Value::String(text) => {
            out.push(Fragment {
                text: text.clone(),
                locator: Locator::Path(path.clone()),
            });
        }
        Value::Object(map) => {
            for (key, value) in map {
                path.push(PathSeg::Key(key.clone()));
                walk(value, path, depth + 1, out)?;
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                path.push(PathSeg::Index(index));
                walk(value, path, depth + 1, out)?;
                path.pop();
            }
        }
        // Numbers, booleans and null are not text; they pass through.
        _ => {}
    }
    Ok(())
}

/// Returns a deep copy of `original` with each string leaf replaced by its
/// matching replacement, located by path.
pub fn reconstruct(
    original: &Value,
    fragments: &[Fragment],
    replacements: &[String],
) -> Result<Value, VeilError> {
    let mut rebuilt = original.clone();
    for (fragment, replacement) in fragments.iter().zip(replacements) {
        let Locator::Path(path) = &fragment.locator else {
            return Err(VeilError::ParserFallback(
                "structured fragment without a path locator".to_string(),
            ));
        };
        set_leaf(&mut rebuilt, path, replacement)?;
    }
    Ok(rebuilt)
}

fn set_leaf(root: &mut Value, path: &[PathSeg], replacement: &str) -> Result<(), VeilError> {
    let mut node = root;
    for seg in path {
        node = match (seg, node) {
            (PathSeg::Key(key), Value::Object(map)) => map.get_mut(key).ok_or_else(|| {
                VeilError::ParserFallback(format!("missing key '{key}' during reconstruction"))
            })?,
            (PathSeg::Index(index), Value::Array(items)) => {
                items.get_mut(*index).ok_or_else(|| {
                    VeilError::ParserFallback(format!(
                        "missing index {index} during reconstruction"
                    ))
                })?
            }
            _ => {
                return Err(VeilError::ParserFallback(
                    "path does not match the tree shape".to_string(),
                ))
            }
        };
    }
    *node = Value::String(replacement.to_string());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emits_string_leaves_only() {
        let tree = json!({
            "user": {"email": "a@b.co", "age": 41},
            "tags": ["x", 7, null, "y"],
            "active": true
        });
        let fragments = parse(&tree).unwrap();
        let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["x", "y", "a@b.co"]);
    }

    #[test]
    fn locators_are_full_paths() {
        let tree = json!({"a": [{"b": "leaf"}]});
        let fragments = parse(&tree).unwrap();
        assert_eq!(
            fragments[0].locator,
            Locator::Path(vec![
                PathSeg::Key("a".to_string()),
                PathSeg::Index(0),
                PathSeg::Key("b".to_string()),
            ])
        );
    }

    #[test]
    fn reconstruct_preserves_shape_and_non_strings() {
        let tree = json!({"user": {"email": "a@b.co", "count": 3}});
        let fragments = parse(&tree).unwrap();
        let replacements = vec!["MASKED".to_string()];
        let rebuilt = reconstruct(&tree, &fragments, &replacements).unwrap();
        assert_eq!(rebuilt, json!({"user": {"email": "MASKED", "count": 3}}));
    }

    #[test]
    fn depth_cap_is_enforced() {
        let mut tree = json!("bottom");
        for _ in 0..(MAX_TREE_DEPTH + 2) {
            tree = json!([tree]);
        }
        let err = parse(&tree).unwrap_err();
        assert!(matches!(err, VeilError::MaxDepthExceeded { .. }));
    }
}
