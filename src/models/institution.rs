use serde::{Deserialize, Serialize};

use super::schema::{Field, Resource, Schema};

/// A financial institution that customers can link accounts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub id: String,
    pub name: String,
    pub account_type_description: Option<String>,
    pub url_home_app: Option<String>,
    pub url_logon_app: Option<String>,
    pub url_product_app: Option<String>,
}

impl Resource for Institution {
    const SCHEMA: Schema = Schema::new(
        "Institution",
        &[
            Field::required("id"),
            Field::required("name"),
            Field::required("accountTypeDescription"),
            Field::required("urlHomeApp"),
            Field::required("urlLogonApp"),
            Field::required("urlProductApp"),
        ],
    );
}
