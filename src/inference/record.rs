//! Feature record
//!
//! Converts one JSON object (feature name → number) into a dense row ordered
//! the way the scaler was fitted. Keys may arrive in any order.

use serde_json::{Map, Value};

use super::InferenceError;

/// One validated observation
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    values: Vec<f64>,
}

impl FeatureRecord {
    pub fn from_json(
        object: &Map<String, Value>,
        feature_names: &[String],
    ) -> Result<Self, InferenceError> {
        let missing: Vec<String> = feature_names
            .iter()
            .filter(|name| !object.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(InferenceError::MissingFeatures(missing));
        }

        let unknown: Vec<String> = object
            .keys()
            .filter(|key| !feature_names.iter().any(|name| name == *key))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(InferenceError::UnknownFeatures(unknown));
        }

        let values = feature_names
            .iter()
            .map(|name| {
                object
                    .get(name)
                    .and_then(to_number)
                    .ok_or_else(|| InferenceError::InvalidValue { name: name.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { values })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

// Numeric strings are accepted the same way a dataframe would coerce them
fn to_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names() -> Vec<String> {
        vec!["width".to_string(), "height".to_string()]
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_values_follow_declared_order() {
        let record =
            FeatureRecord::from_json(&object(json!({"height": 2.0, "width": 1})), &names())
                .unwrap();
        assert_eq!(record.values(), [1.0, 2.0]);
    }

    #[test]
    fn test_missing_feature() {
        let err = FeatureRecord::from_json(&object(json!({"width": 1.0})), &names()).unwrap_err();
        assert_eq!(err, InferenceError::MissingFeatures(vec!["height".to_string()]));
    }

    #[test]
    fn test_unknown_feature() {
        let err = FeatureRecord::from_json(
            &object(json!({"width": 1.0, "height": 2.0, "depth": 3.0})),
            &names(),
        )
        .unwrap_err();
        assert_eq!(err, InferenceError::UnknownFeatures(vec!["depth".to_string()]));
    }

    #[test]
    fn test_numeric_string_is_coerced() {
        let record =
            FeatureRecord::from_json(&object(json!({"width": " 1.5", "height": "2"})), &names())
                .unwrap();
        assert_eq!(record.values(), [1.5, 2.0]);
    }

    #[test]
    fn test_non_numeric_value() {
        for bad in [json!("wide"), json!(null), json!(true), json!([1.0])] {
            let err = FeatureRecord::from_json(
                &object(json!({"width": bad, "height": 2.0})),
                &names(),
            )
            .unwrap_err();
            assert_eq!(
                err,
                InferenceError::InvalidValue {
                    name: "width".to_string()
                }
            );
        }
    }

    #[test]
    fn test_non_finite_string_rejected() {
        let err = FeatureRecord::from_json(
            &object(json!({"width": "NaN", "height": "inf"})),
            &names(),
        )
        .unwrap_err();
        assert!(matches!(err, InferenceError::InvalidValue { .. }));
    }
}
