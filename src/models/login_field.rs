use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::de;
use super::schema::{Field, Resource, Schema};

/// One credential input on an institution's login form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginField {
    pub id: String,
    pub name: String,
    pub value: Option<String>,
    pub description: Option<String>,
    #[serde(deserialize_with = "de::u32_from_text")]
    pub display_order: u32,
    /// Masked fields hold secrets such as passwords.
    #[serde(deserialize_with = "de::bool_from_text")]
    pub mask: bool,
    pub instructions: Option<String>,
    #[serde(default)]
    pub value_length_min: Option<String>,
    #[serde(default)]
    pub value_length_max: Option<String>,
}

impl Resource for LoginField {
    const SCHEMA: Schema = Schema::new(
        "LoginField",
        &[
            Field::required("id"),
            Field::required("name"),
            Field::required("value"),
            Field::required("description"),
            Field::required("displayOrder"),
            Field::required("mask"),
            Field::required("instructions"),
            Field::optional("valueLengthMin"),
            Field::optional("valueLengthMax"),
        ],
    );
}

impl LoginField {
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// The `<loginField>` element sent when submitting credentials.
    pub fn credential(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "value": self.value.clone().unwrap_or_default(),
        })
    }
}
