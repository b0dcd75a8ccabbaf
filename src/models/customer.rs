use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::schema::{Field, Resource, Schema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `testing` or `active`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

impl Resource for Customer {
    const SCHEMA: Schema = Schema::new(
        "Customer",
        &[
            Field::required("username"),
            Field::optional("id"),
            Field::optional("type"),
            Field::optional("firstName"),
            Field::optional("lastName"),
            Field::optional("createdDate"),
        ],
    );
}

impl Customer {
    /// A customer that has not been registered with the vendor yet.
    pub fn new(
        username: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            id: None,
            kind: None,
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            created_date: None,
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        super::epoch_to_utc(self.created_date.as_deref())
    }
}
