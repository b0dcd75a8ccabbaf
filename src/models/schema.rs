//! Attribute schemas shared by every resource.
//!
//! Each resource declares a static list of fields, each either required or
//! optional. `Schema::build` is the single construction path: it rejects a
//! mapping that lacks any required field (naming all of them), drops keys the
//! schema does not declare, then deserializes the typed record.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::{FinicityError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub required: bool,
}

impl Field {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub resource: &'static str,
    pub fields: &'static [Field],
}

impl Schema {
    pub const fn new(resource: &'static str, fields: &'static [Field]) -> Self {
        Self { resource, fields }
    }

    pub fn required(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Required fields absent from `attrs`, in schema order.
    pub fn missing(&self, attrs: &Map<String, Value>) -> Vec<String> {
        self.required()
            .filter(|name| !attrs.contains_key(*name))
            .map(str::to_string)
            .collect()
    }

    /// Validate presence and keep only declared attributes.
    pub fn extract(&self, raw: &Value) -> Result<Map<String, Value>> {
        let attrs = raw.as_object().ok_or_else(|| {
            FinicityError::decode(format!("{} must be an XML element, got {}", self.resource, raw))
        })?;

        let missing = self.missing(attrs);
        if !missing.is_empty() {
            return Err(FinicityError::MissingRequiredFields {
                resource: self.resource,
                fields: missing,
            });
        }

        Ok(attrs
            .iter()
            .filter(|(key, _)| self.declares(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    pub fn build<T: DeserializeOwned>(&self, raw: &Value) -> Result<T> {
        let attrs = self.extract(raw)?;
        serde_json::from_value(Value::Object(attrs))
            .map_err(|e| FinicityError::decode(format!("invalid {}: {}", self.resource, e)))
    }
}

/// A typed record decoded from a vendor XML element.
pub trait Resource: DeserializeOwned {
    const SCHEMA: Schema;

    fn from_value(raw: &Value) -> Result<Self> {
        Self::SCHEMA.build(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Probe {
        id: String,
        display_name: String,
        note: Option<String>,
    }

    impl Resource for Probe {
        const SCHEMA: Schema = Schema::new(
            "Probe",
            &[
                Field::required("id"),
                Field::required("displayName"),
                Field::optional("note"),
            ],
        );
    }

    #[test]
    fn test_all_missing_fields_are_named() {
        let err = Probe::from_value(&json!({ "note": "x" })).unwrap_err();
        match err {
            FinicityError::MissingRequiredFields { resource, fields } => {
                assert_eq!(resource, "Probe");
                assert_eq!(fields, vec!["id", "displayName"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undeclared_attributes_are_dropped() {
        let attrs = Probe::SCHEMA
            .extract(&json!({ "id": "1", "displayName": "a", "bogus": "y" }))
            .unwrap();
        assert!(!attrs.contains_key("bogus"));

        let probe = Probe::from_value(&json!({ "id": "1", "displayName": "a", "bogus": "y" })).unwrap();
        assert_eq!(probe.id, "1");
        assert_eq!(probe.display_name, "a");
        assert!(probe.note.is_none());
    }

    #[test]
    fn test_non_object_is_decode_error() {
        assert!(matches!(
            Probe::from_value(&json!("just text")),
            Err(FinicityError::Decode(_))
        ));
    }
}
