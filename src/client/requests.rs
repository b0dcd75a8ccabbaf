//! Request bodies and query builders.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use crate::models::{Account, LoginField};

/// Filters for `GET v1/customers`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerQuery {
    pub search: Option<String>,
    pub username: Option<String>,
    /// `testing` or `active`.
    pub kind: Option<String>,
    pub start: Option<u32>,
    pub limit: Option<u32>,
}

impl CustomerQuery {
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            search: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn username(name: impl Into<String>) -> Self {
        Self {
            username: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn to_query(&self) -> Value {
        let mut map = Map::new();
        if let Some(search) = &self.search {
            map.insert("search".into(), json!(search));
        }
        if let Some(username) = &self.username {
            map.insert("username".into(), json!(username));
        }
        if let Some(kind) = &self.kind {
            map.insert("type".into(), json!(kind));
        }
        if let Some(start) = self.start {
            map.insert("start".into(), json!(start));
        }
        if let Some(limit) = self.limit {
            map.insert("limit".into(), json!(limit));
        }
        Value::Object(map)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Date window and paging for transaction retrieval. `start` is 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionQuery {
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub start: u32,
    pub limit: u32,
    pub sort: SortOrder,
}

impl TransactionQuery {
    pub fn new(from_date: DateTime<Utc>, to_date: DateTime<Utc>) -> Self {
        Self {
            from_date,
            to_date,
            start: 1,
            limit: 25,
            sort: SortOrder::default(),
        }
    }

    pub fn page(mut self, start: u32, limit: u32) -> Self {
        self.start = start;
        self.limit = limit;
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// The query for the page after this one, for use when the vendor
    /// reports more transactions available.
    pub fn next_page(&self) -> Self {
        let mut next = self.clone();
        next.start = self.start + self.limit;
        next
    }

    pub fn to_query(&self) -> Value {
        json!({
            "fromDate": self.from_date.timestamp(),
            "toDate": self.to_date.timestamp(),
            "start": self.start,
            "limit": self.limit,
            "sort": self.sort.as_str(),
        })
    }
}

pub fn authentication_body(partner_id: &str, partner_secret: &str) -> Value {
    json!({
        "credentials": {
            "partnerId": partner_id,
            "partnerSecret": partner_secret,
        }
    })
}

pub fn search_body(search: Option<&str>) -> Value {
    let text = search.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("*");
    json!({ "search": text })
}

/// Filled-in login form fields, submitted when linking accounts.
pub fn credentials_body(fields: &[LoginField]) -> Value {
    let login_fields: Vec<Value> = fields.iter().map(LoginField::credential).collect();
    json!({
        "accounts": {
            "credentials": { "loginField": login_fields }
        }
    })
}

pub fn activation_body(accounts: &[Account]) -> Value {
    let accounts: Vec<Value> = accounts.iter().map(Account::activation).collect();
    json!({ "accounts": { "account": accounts } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_search_defaults_to_wildcard() {
        assert_eq!(search_body(None), json!({ "search": "*" }));
        assert_eq!(search_body(Some("   ")), json!({ "search": "*" }));
        assert_eq!(search_body(Some(" finbank ")), json!({ "search": "finbank" }));
    }

    #[test]
    fn test_customer_query_only_sets_given_filters() {
        let q = CustomerQuery {
            kind: Some("testing".into()),
            ..CustomerQuery::search("Ellie")
        };
        assert_eq!(q.to_query(), json!({ "search": "Ellie", "type": "testing" }));
    }

    #[test]
    fn test_transaction_query_paging() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let q = TransactionQuery::new(from, to).page(1, 50).sort(SortOrder::Asc);

        let next = q.next_page();
        assert_eq!(next.start, 51);
        assert_eq!(next.limit, 50);

        let query = q.to_query();
        assert_eq!(query["fromDate"], json!(from.timestamp()));
        assert_eq!(query["sort"], "asc");
    }

    #[test]
    fn test_credentials_body_wraps_login_fields() {
        let field = LoginField {
            id: "101732001".into(),
            name: "Banking Userid".into(),
            value: Some("demo".into()),
            description: None,
            display_order: 1,
            mask: false,
            instructions: None,
            value_length_min: None,
            value_length_max: None,
        };
        let body = credentials_body(&[field]);
        assert_eq!(
            body["accounts"]["credentials"]["loginField"][0]["value"],
            "demo"
        );
    }
}
