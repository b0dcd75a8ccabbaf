pub mod account;
pub mod customer;
pub mod institution;
pub mod login_field;
pub mod mfa;
pub mod schema;
pub mod transaction;

pub use account::{
    Account, AccountDetail, CheckingDetail, CreditCardDetail, DetailKind, InvestmentDetail,
    LoanDetail,
};
pub use customer::Customer;
pub use institution::Institution;
pub use login_field::LoginField;
pub use mfa::{ImageChoice, MfaChallenge, MfaQuestion};
pub use schema::{Field, Resource, Schema};
pub use transaction::{Transaction, TransactionPage};

use chrono::{DateTime, Utc};

/// Vendor dates are epoch seconds carried as text.
pub(crate) fn epoch_to_utc(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let secs = raw?.trim().parse::<i64>().ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0)
}

/// Deserialize helpers for XML text that stands in for numbers and flags.
pub(crate) mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn u32_from_text<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| serde::de::Error::custom(format!("{} is not a u32", n))),
            Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(format!("expected number, got {}", other))),
        }
    }

    pub fn bool_from_text<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(is_true(&Value::deserialize(d)?))
    }

    /// Text of an element that must be present; an empty element reads as "".
    pub fn string_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
    }

    /// `true` and `"true"` are true; everything else (including absent) is false.
    pub fn is_true(value: &Value) -> bool {
        match value {
            Value::Bool(b) => *b,
            Value::String(s) => s == "true",
            _ => false,
        }
    }
}
