//! One page of a region feature query.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeaturePage {
    /// Required; a page without it fails to decode
    pub features: Vec<Value>,
    /// Set by the upstream while more records remain past this page
    #[serde(rename = "exceededTransferLimit", default)]
    pub exceeded_transfer_limit: Option<Value>,
}

impl FeaturePage {
    /// Whether another page should be requested
    pub fn has_more(&self) -> bool {
        self.exceeded_transfer_limit.as_ref().is_some_and(is_truthy)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(value: Value) -> FeaturePage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_limit_flag() {
        assert!(page(json!({"features": [], "exceededTransferLimit": true})).has_more());
        assert!(!page(json!({"features": [], "exceededTransferLimit": false})).has_more());
        assert!(!page(json!({"features": [], "exceededTransferLimit": null})).has_more());
        assert!(!page(json!({"features": []})).has_more());
    }

    #[test]
    fn test_missing_features_is_rejected() {
        let result: Result<FeaturePage, _> =
            serde_json::from_value(json!({"exceededTransferLimit": true}));
        assert!(result.is_err());
    }
}
