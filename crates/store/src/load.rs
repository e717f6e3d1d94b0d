//! Manifest loading: YAML (multi-document) or JSON, with `kind: List` flattening.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("parse yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Parse every object in `text`. Documents that are lists contribute their items.
pub fn load_str(text: &str) -> Result<Vec<Value>, LoadError> {
    let trimmed = text.trim_start();
    let docs: Vec<Value> = if trimmed.starts_with('{') || trimmed.starts_with('[') {
        vec![serde_json::from_str(trimmed)?]
    } else {
        let mut docs = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(text) {
            docs.push(Value::deserialize(doc)?);
        }
        docs
    };
    let mut out = Vec::new();
    for doc in docs {
        flatten(doc, &mut out);
    }
    Ok(out)
}

fn flatten(doc: Value, out: &mut Vec<Value>) {
    match doc {
        Value::Null => {}
        Value::Array(items) => items.into_iter().for_each(|i| flatten(i, out)),
        Value::Object(mut map) if is_list(&map) => {
            if let Some(Value::Array(items)) = map.remove("items") {
                items.into_iter().for_each(|i| flatten(i, out));
            }
        }
        other => out.push(other),
    }
}

fn is_list(map: &serde_json::Map<String, Value>) -> bool {
    map.get("kind").and_then(|k| k.as_str()).map(|k| k == "List" || k.ends_with("List")).unwrap_or(false)
        && map.get("items").map(|i| i.is_array()).unwrap_or(false)
}

pub fn load_path(path: &Path) -> Result<Vec<Value>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    let objects = load_str(&text)?;
    debug!(path = %path.display(), objects = objects.len(), "loaded manifest");
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_multi_doc_and_lists() {
        let text = r#"
apiVersion: v1
kind: ConfigMap
metadata: {name: a}
---
apiVersion: v1
kind: List
items:
  - apiVersion: v1
    kind: ConfigMap
    metadata: {name: b}
  - apiVersion: v1
    kind: ConfigMap
    metadata: {name: c}
"#;
        let objs = load_str(text).unwrap();
        let names: Vec<_> = objs.iter().map(|o| o["metadata"]["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn json_object_and_typed_list() {
        let text = r#"{"apiVersion": "v1", "kind": "SubscriptionList", "items": [{"kind": "Subscription", "metadata": {"name": "s"}}]}"#;
        assert_eq!(load_str(text).unwrap().len(), 1);
        assert!(matches!(load_str("{not json"), Err(LoadError::Json(_))));
    }

    #[test]
    fn missing_file() {
        let err = load_path(Path::new("/nonexistent/fleet.yaml")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
