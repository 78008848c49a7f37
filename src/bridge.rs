//! Conversion between Ember values and host JSON values

use serde_json::{Map as JsonMap, Number as JsonNumber, Value as Json};
use thiserror::Error;

use crate::value::{Runtime, Scalar, Value};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("cannot export {0} as JSON")]
    Unsupported(String),

    #[error("cannot export non-finite number {0}")]
    NonFinite(f64),

    #[error("cannot export a value that contains itself")]
    Cycle,
}

/// Largest magnitude at which every integral number is exact (2^53)
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Build an Ember value from a host value. JSON objects become Ember objects.
pub fn import_value(rt: &Runtime, json: &Json) -> Value {
    match json {
        Json::Null => rt.null(),
        Json::Bool(b) => rt.boolean(*b),
        Json::Number(n) => rt.number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => rt.string(s),
        Json::Array(items) => rt.list(items.iter().map(|item| import_value(rt, item)).collect()),
        Json::Object(fields) => rt.object(fields.iter().map(|(k, v)| (k, import_value(rt, v)))),
    }
}

/// Convert an Ember value to a host value.
///
/// Maps export as JSON objects and need string keys. Callables, tasks and
/// `Undefined` have no host form.
pub fn export_value(value: &Value) -> Result<Json, BridgeError> {
    Exporter { path: Vec::new() }.export(value)
}

struct Exporter {
    /// Identities of the containers currently being exported
    path: Vec<usize>,
}

impl Exporter {
    fn export(&mut self, value: &Value) -> Result<Json, BridgeError> {
        match value {
            Value::Scalar(s) => match &s.scalar {
                Scalar::Null => Ok(Json::Null),
                Scalar::Boolean(b) => Ok(Json::Bool(*b)),
                Scalar::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
                    Ok(Json::Number(JsonNumber::from(*n as i64)))
                }
                Scalar::Number(n) => JsonNumber::from_f64(*n)
                    .map(Json::Number)
                    .ok_or(BridgeError::NonFinite(*n)),
                Scalar::String(text) => Ok(Json::String(text.to_string())),
            },
            Value::List(list) => {
                self.enter(value)?;
                let items = list.items.borrow().clone();
                let out = items
                    .iter()
                    .map(|item| self.export(item))
                    .collect::<Result<Vec<_>, _>>()?;
                self.path.pop();
                Ok(Json::Array(out))
            }
            Value::Object(object) => {
                self.enter(value)?;
                let mut out = JsonMap::new();
                for (key, field) in object.entries() {
                    out.insert(key.to_string(), self.export(&field)?);
                }
                self.path.pop();
                Ok(Json::Object(out))
            }
            Value::Map(map) => {
                self.enter(value)?;
                let entries: Vec<_> = map
                    .entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.0.clone(), v.clone()))
                    .collect();
                let mut out = JsonMap::new();
                for (key, entry) in entries {
                    let key = key
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| BridgeError::Unsupported(format!("map key of type {}", key.type_name())))?;
                    out.insert(key, self.export(&entry)?);
                }
                self.path.pop();
                Ok(Json::Object(out))
            }
            other => Err(BridgeError::Unsupported(other.type_name().to_string())),
        }
    }

    fn enter(&mut self, value: &Value) -> Result<(), BridgeError> {
        let id = value.identity();
        if self.path.contains(&id) {
            return Err(BridgeError::Cycle);
        }
        self.path.push(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn imports_nested_documents() {
        let rt = Runtime::new();
        let value = import_value(&rt, &json!({"name": "ember", "tags": [1, 2.5, null]}));
        assert_eq!(value.to_string(), "{name: ember, tags: [1, 2.5, null]}");
    }

    #[test]
    fn exports_maps_with_string_keys() {
        let rt = Runtime::new();
        let map = rt.map(vec![(rt.string("a"), rt.boolean(true))]);
        assert_eq!(export_value(&map), Ok(json!({"a": true})));

        let bad = rt.map(vec![(rt.number(1.0), rt.null())]);
        assert!(matches!(export_value(&bad), Err(BridgeError::Unsupported(_))));
    }

    #[test]
    fn rejects_what_json_cannot_hold() {
        let rt = Runtime::new();
        assert_eq!(export_value(&rt.number(f64::INFINITY)), Err(BridgeError::NonFinite(f64::INFINITY)));
        assert!(matches!(export_value(&Value::Undefined), Err(BridgeError::Unsupported(_))));

        let list = rt.list(Vec::new());
        if let Value::List(inner) = &list {
            inner.items.borrow_mut().push(list.clone());
        }
        assert_eq!(export_value(&list), Err(BridgeError::Cycle));
        if let Value::List(inner) = &list {
            inner.items.borrow_mut().clear();
        }
    }

    #[test]
    fn integral_numbers_export_as_integers() {
        let rt = Runtime::new();
        let list = rt.list(vec![rt.number(1.0), rt.number(-3.0), rt.number(2.5), rt.number(1e300)]);
        assert_eq!(export_value(&list), Ok(json!([1, -3, 2.5, 1e300])));
        let text = export_value(&rt.number(42.0)).map(|json| json.to_string());
        assert_eq!(text, Ok("42".to_string()));
    }

    #[test]
    fn shared_children_are_not_cycles() {
        let rt = Runtime::new();
        let child = rt.list(vec![rt.number(1.0)]);
        let parent = rt.list(vec![child.clone(), child]);
        assert_eq!(export_value(&parent), Ok(json!([[1], [1]])));
    }
}
