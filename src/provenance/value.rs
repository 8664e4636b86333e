//! Literal coercion: every stored value becomes untyped text.

use serde_json::Value;

use crate::error::CoercionError;

/// Text form of a JSON value.
///
/// Strings are stored verbatim, numbers and booleans by their display form,
/// arrays and objects as compact JSON. `null` (which is also what non-finite
/// floats turn into) has no text form.
pub fn literal_text(field: &str, value: &Value) -> Result<String, CoercionError> {
    match value {
        Value::Null => Err(CoercionError::NoText {
            field: field.to_string(),
        }),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).map_err(|e| CoercionError::Unconvertible {
                field: field.to_string(),
                message: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_become_text() {
        assert_eq!(literal_text("lr", &json!(0.01)).unwrap(), "0.01");
        assert_eq!(literal_text("epochs", &json!(10)).unwrap(), "10");
        assert_eq!(literal_text("shuffle", &json!(true)).unwrap(), "true");
        assert_eq!(literal_text("optimizer", &json!("adam")).unwrap(), "adam");
    }

    #[test]
    fn structures_become_json() {
        assert_eq!(literal_text("layers", &json!([64, 32])).unwrap(), "[64,32]");
    }

    #[test]
    fn null_and_nan_fail() {
        assert!(matches!(
            literal_text("x", &Value::Null),
            Err(CoercionError::NoText { .. })
        ));
        assert!(literal_text("x", &Value::from(f64::NAN)).is_err());
    }
}
