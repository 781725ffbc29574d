//! Deep merge of configuration tiers.
//!
//! Higher tier values override lower tier values field by field.
//! Arrays (such as `roles.custom`) are replaced entirely, not concatenated.

use serde_json::Value;

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans are replaced entirely
/// - A null overlay keeps the base value (null means "not specified")
///
/// # Example
/// ```
/// use serde_json::json;
/// use task_roles::config::deep_merge;
///
/// let base = json!({
///     "index": { "debounce_ms": 1000, "snapshot_path": ".task-roles/task-index.json" },
///     "roles": { "hidden": ["informed"] }
/// });
/// let overlay = json!({
///     "index": { "debounce_ms": 250 },
///     "roles": { "hidden": [] }
/// });
/// let result = deep_merge(base, overlay);
/// assert_eq!(result["index"]["debounce_ms"], 250);
/// assert_eq!(result["index"]["snapshot_path"], ".task-roles/task-index.json");
/// assert_eq!(result["roles"]["hidden"], json!([]));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Merge tiers in order, later tiers taking precedence.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_sections_merge_per_field() {
        let base = json!({
            "assignees": {"person_symbol": "@", "person_directory": "People"},
            "vault": {"extension": "md"}
        });
        let overlay = json!({
            "assignees": {"person_directory": "Team"}
        });
        assert_eq!(
            deep_merge(base, overlay),
            json!({
                "assignees": {"person_symbol": "@", "person_directory": "Team"},
                "vault": {"extension": "md"}
            })
        );
    }

    #[test]
    fn test_role_lists_replaced_not_concatenated() {
        let base = json!({"roles": {"custom": [{"id": "a"}, {"id": "b"}]}});
        let overlay = json!({"roles": {"custom": [{"id": "c"}]}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"roles": {"custom": [{"id": "c"}]}})
        );
    }

    #[test]
    fn test_null_keeps_lower_tier() {
        let base = json!({"index": {"debounce_ms": 1000}});
        let overlay = json!({"index": {"debounce_ms": null}});
        assert_eq!(deep_merge(base, overlay), json!({"index": {"debounce_ms": 1000}}));
    }

    #[test]
    fn test_merge_all_in_tier_order() {
        let tiers = vec![
            json!({"watcher": {"debounce_ms": 500}, "vault": {"root": "."}}),
            json!({"vault": {"root": "/notes"}}),
            json!({"watcher": {"debounce_ms": 100}}),
        ];
        assert_eq!(
            deep_merge_all(tiers),
            json!({"watcher": {"debounce_ms": 100}, "vault": {"root": "/notes"}})
        );
    }

    #[test]
    fn test_scalar_and_object_replace_each_other() {
        assert_eq!(
            deep_merge(json!({"v": 1}), json!({"v": {"x": true}})),
            json!({"v": {"x": true}})
        );
        assert_eq!(
            deep_merge(json!({"v": {"x": true}}), json!({"v": 2})),
            json!({"v": 2})
        );
    }
}
