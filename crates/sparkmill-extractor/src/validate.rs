//! Required-field validation with dotted paths

use serde_json::Value;

/// Walk a dotted path (`"keyMetrics.ltv"`, `"pricing.0.name"`) into `value`.
///
/// Objects are indexed by key, arrays by numeric segment. Any absent
/// segment, empty segment, or non-container on the way yields `None`.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        if segment.is_empty() {
            return None;
        }
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Required fields that `value` does not contain, in declaration order.
pub fn missing_fields<S: AsRef<str>>(value: &Value, required: &[S]) -> Vec<String> {
    required
        .iter()
        .map(AsRef::as_ref)
        .filter(|path| lookup(value, path).is_none())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_top_level_fields() {
        let value = json!({"title": "x", "description": ""});
        assert!(missing_fields(&value, &["title", "description"]).is_empty());
        assert_eq!(missing_fields(&value, &["title", "scores"]), vec!["scores"]);
    }

    #[test]
    fn test_dotted_path_missing_leaf() {
        let value = json!({"keyMetrics": {"ltv": 10}});
        assert_eq!(missing_fields(&value, &["keyMetrics.cac"]), vec!["keyMetrics.cac"]);
        assert!(missing_fields(&value, &["keyMetrics.ltv"]).is_empty());
    }

    #[test]
    fn test_dotted_path_through_scalar_is_missing() {
        let value = json!({"keyMetrics": 5});
        assert_eq!(missing_fields(&value, &["keyMetrics.ltv"]), vec!["keyMetrics.ltv"]);
    }

    #[test]
    fn test_array_index_segments() {
        let value = json!({"pricing": [{"name": "Free"}, {"name": "Pro"}]});
        assert_eq!(lookup(&value, "pricing.1.name"), Some(&json!("Pro")));
        assert!(lookup(&value, "pricing.2.name").is_none());
        assert!(lookup(&value, "pricing.first").is_none());
    }

    #[test]
    fn test_null_counts_as_present() {
        let value = json!({"focus": null});
        assert!(missing_fields(&value, &["focus"]).is_empty());
    }

    #[test]
    fn test_empty_segments_are_missing() {
        let value = json!({"a": {"b": 1}});
        assert_eq!(missing_fields(&value, &["a..b", ""]), vec!["a..b", ""]);
    }

    #[test]
    fn test_non_object_root() {
        assert_eq!(missing_fields(&json!([1, 2]), &["title"]), vec!["title"]);
        assert!(missing_fields::<&str>(&json!("text"), &[]).is_empty());
    }
}
