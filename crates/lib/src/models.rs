//! Model directory entries from the backend's model list.

use serde::{Deserialize, Serialize};

/// One installed model as reported by GET /api/models. Read-only; refreshed on
/// each fetch, with no local identity beyond the name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default)]
    pub digest: String,
}

/// User-visible size line for a model entry (GiB, two decimals).
pub fn size_description(bytes: u64) -> String {
    let gb = bytes as f64 / 1024.0 / 1024.0 / 1024.0;
    format!("Size: {:.2} GB", gb)
}

/// Drop a selection that no longer appears in the refreshed list, so the UI
/// prompts for a re-selection instead of keeping an invalid reference.
pub fn reconcile_selection(selected: Option<String>, models: &[Model]) -> Option<String> {
    selected.filter(|name| models.iter().any(|m| &m.name == name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str, size: u64) -> Model {
        Model {
            name: name.to_string(),
            size,
            modified_at: String::new(),
            digest: String::new(),
        }
    }

    #[test]
    fn size_description_two_decimals() {
        assert_eq!(size_description(4_000_000_000), "Size: 3.73 GB");
        assert_eq!(size_description(1_073_741_824), "Size: 1.00 GB");
        assert_eq!(size_description(0), "Size: 0.00 GB");
    }

    #[test]
    fn reconcile_keeps_selection_still_listed() {
        let models = vec![model("llama3", 4_000_000_000)];
        assert_eq!(
            reconcile_selection(Some("llama3".to_string()), &models),
            Some("llama3".to_string())
        );
    }

    #[test]
    fn reconcile_clears_vanished_selection() {
        let models = vec![model("gemma", 1)];
        assert_eq!(reconcile_selection(Some("llama3".to_string()), &models), None);
        assert_eq!(reconcile_selection(None, &models), None);
    }

    #[test]
    fn model_deserializes_with_missing_fields() {
        let m: Model = serde_json::from_str(r#"{"name":"llama3"}"#).expect("parse model");
        assert_eq!(m.name, "llama3");
        assert_eq!(m.size, 0);
        assert!(m.digest.is_empty());
    }
}
