use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::de;
use super::schema::{Field, Resource, Schema};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(deserialize_with = "de::string_or_empty")]
    pub id: String,
    #[serde(deserialize_with = "de::string_or_empty")]
    pub account_id: String,
    /// `None` when the vendor sends an empty amount.
    pub amount: Option<Decimal>,
    pub created_date: Option<String>,
    pub customer_id: Option<String>,
    pub description: Option<String>,
    pub institution_transaction_id: Option<String>,
    pub posted_date: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub memo: Option<String>,
    pub category: Option<String>,
    pub transaction_date: Option<String>,
    pub check_num: Option<String>,
    pub fee_amount: Option<Decimal>,
    pub interest_amount: Option<Decimal>,
    pub principal_amount: Option<Decimal>,
    pub escrow_amount: Option<Decimal>,
    pub unit_quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
}

impl Resource for Transaction {
    const SCHEMA: Schema = Schema::new(
        "Transaction",
        &[
            Field::required("id"),
            Field::required("accountId"),
            Field::required("amount"),
            Field::required("createdDate"),
            Field::required("customerId"),
            Field::required("description"),
            Field::required("institutionTransactionId"),
            Field::required("postedDate"),
            Field::required("status"),
            Field::optional("type"),
            Field::optional("memo"),
            Field::optional("category"),
            Field::optional("transactionDate"),
            Field::optional("checkNum"),
            Field::optional("feeAmount"),
            Field::optional("interestAmount"),
            Field::optional("principalAmount"),
            Field::optional("escrowAmount"),
            Field::optional("unitQuantity"),
            Field::optional("unitPrice"),
        ],
    );
}

impl Transaction {
    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        super::epoch_to_utc(self.posted_date.as_deref())
    }

    /// Pending transactions have not settled and may still change.
    pub fn is_pending(&self) -> bool {
        self.status.as_deref() == Some("pending")
    }
}

/// One page of transactions; `more_available` mirrors the vendor's
/// `moreAvailable` marker.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub more_available: bool,
}
