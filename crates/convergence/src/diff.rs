//! Field-level diffing of task definitions.
//!
//! Revisions are compared as JSON trees and the differing field paths
//! collected; server-assigned fields are excluded so a definition only
//! counts as changed when a field someone controls actually moved.

use flotilla_cloud::model::TaskDefinition;
use serde_json::Value;
use tracing::debug;

/// Paths the server rewrites on every registration.
const VOLATILE_PATHS: &[&str] = &["registered_at", "arn", "revision"];

fn walk(a: &Value, b: &Value, path: &mut Vec<String>, out: &mut Vec<String>) {
    match (a, b) {
        (Value::Object(map_a), Value::Object(map_b)) => {
            for (key, value_a) in map_a {
                path.push(key.clone());
                match map_b.get(key) {
                    Some(value_b) => walk(value_a, value_b, path, out),
                    None => out.push(path.join(".")),
                }
                path.pop();
            }
            for key in map_b.keys() {
                if !map_a.contains_key(key) {
                    path.push(key.clone());
                    out.push(path.join("."));
                    path.pop();
                }
            }
        }
        (Value::Array(items_a), Value::Array(items_b)) => {
            let len = items_a.len().max(items_b.len());
            for index in 0..len {
                path.push(index.to_string());
                match (items_a.get(index), items_b.get(index)) {
                    (Some(value_a), Some(value_b)) => walk(value_a, value_b, path, out),
                    _ => out.push(path.join(".")),
                }
                path.pop();
            }
        }
        _ => {
            if a != b {
                out.push(path.join("."));
            }
        }
    }
}

/// Dotted paths of every field that differs between the two values.
pub fn changed_paths(a: &Value, b: &Value) -> Vec<String> {
    let mut out = Vec::new();
    walk(a, b, &mut Vec::new(), &mut out);
    out
}

/// Whether two task definitions differ in any non-volatile field.
pub fn task_definition_changed(
    current: &TaskDefinition,
    desired: &TaskDefinition,
) -> serde_json::Result<bool> {
    let current = serde_json::to_value(current)?;
    let desired = serde_json::to_value(desired)?;
    let paths: Vec<String> = changed_paths(&current, &desired)
        .into_iter()
        .filter(|path| {
            let head = path.split('.').next().unwrap_or(path);
            !VOLATILE_PATHS.contains(&head)
        })
        .collect();
    debug!(?paths, "task definition diff");
    Ok(!paths.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_and_array_paths_are_reported() {
        let a = json!({ "x": { "y": 1 }, "list": [1, 2] });
        let b = json!({ "x": { "y": 2 }, "list": [1, 2, 3] });
        let paths = changed_paths(&a, &b);
        assert!(paths.contains(&"x.y".to_string()));
        assert!(paths.contains(&"list.2".to_string()));
    }

    #[test]
    fn missing_keys_count_both_ways() {
        let a = json!({ "only_a": 1 });
        let b = json!({ "only_b": 1 });
        let paths = changed_paths(&a, &b);
        assert!(paths.contains(&"only_a".to_string()));
        assert!(paths.contains(&"only_b".to_string()));
    }

    #[test]
    fn volatile_fields_do_not_trigger_reregistration() {
        let current = TaskDefinition {
            arn: Some("arn:1".into()),
            family: "billing-eu1".into(),
            revision: Some(7),
            registered_at: Some(chrono::Utc::now()),
            ..Default::default()
        };
        let mut desired = current.clone();
        desired.arn = None;
        desired.revision = None;
        desired.registered_at = None;
        assert!(!task_definition_changed(&current, &desired).unwrap());

        desired.network_mode = Some("bridge".into());
        assert!(task_definition_changed(&current, &desired).unwrap());
    }
}
