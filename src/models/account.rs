//! Linked accounts and their type-specific detail records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::de;
use super::schema::{Field, Resource, Schema};
use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(deserialize_with = "de::string_or_empty")]
    pub id: String,
    /// Required elements the vendor may send empty decode as `None`.
    pub number: Option<String>,
    pub name: Option<String>,
    /// `None` when the vendor sends an empty balance; unknown is not zero.
    pub balance: Option<Decimal>,
    #[serde(rename = "type", deserialize_with = "de::string_or_empty")]
    pub account_type: String,
    pub status: Option<String>,
    pub customer_id: Option<String>,
    pub institution_id: Option<String>,
    pub institution_login_id: Option<String>,
    pub created_date: Option<String>,
    pub balance_date: Option<String>,
    pub last_updated_date: Option<String>,
    pub aggregation_status_code: Option<String>,
    pub aggregation_success_date: Option<String>,
    pub aggregation_attempt_date: Option<String>,
    /// Always typed by `account_type`; populated by [`Account::decode`].
    #[serde(skip)]
    pub detail: Option<AccountDetail>,
}

impl Resource for Account {
    const SCHEMA: Schema = Schema::new(
        "Account",
        &[
            Field::required("id"),
            Field::required("number"),
            Field::required("name"),
            Field::required("balance"),
            Field::required("type"),
            Field::required("status"),
            Field::optional("customerId"),
            Field::optional("institutionId"),
            Field::optional("institutionLoginId"),
            Field::optional("createdDate"),
            Field::optional("balanceDate"),
            Field::optional("lastUpdatedDate"),
            Field::optional("aggregationStatusCode"),
            Field::optional("aggregationSuccessDate"),
            Field::optional("aggregationAttemptDate"),
            Field::optional("detail"),
        ],
    );
}

impl Account {
    /// Build an account from a decoded `<account>` element, typing its
    /// `<detail>` child (when present) by the account's `type`.
    pub fn decode(raw: &Value) -> Result<Self> {
        let mut account = Self::from_value(raw)?;
        if let Some(detail) = raw.get("detail").filter(|d| !d.is_null()) {
            let kind = DetailKind::for_account_type(&account.account_type);
            account.detail = Some(AccountDetail::decode(kind, detail)?);
        }
        Ok(account)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        super::epoch_to_utc(self.created_date.as_deref())
    }

    /// The `<account>` element sent when activating accounts.
    pub fn activation(&self) -> Value {
        json!({
            "id": self.id,
            "number": self.number,
            "name": self.name,
            "type": self.account_type,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailKind {
    Checking,
    CreditCard,
    Loan,
    Investment,
}

impl DetailKind {
    /// Unknown and deposit-style types (`checking`, `savings`, `cd`,
    /// `moneyMarket`, `unknown`, ...) all carry checking details.
    pub fn for_account_type(account_type: &str) -> Self {
        match account_type {
            "investment" => DetailKind::Investment,
            "creditCard" | "lineOfCredit" => DetailKind::CreditCard,
            "mortgage" | "loan" => DetailKind::Loan,
            _ => DetailKind::Checking,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AccountDetail {
    Checking(CheckingDetail),
    CreditCard(CreditCardDetail),
    Loan(LoanDetail),
    Investment(InvestmentDetail),
}

impl AccountDetail {
    pub fn decode(kind: DetailKind, raw: &Value) -> Result<Self> {
        Ok(match kind {
            DetailKind::Checking => AccountDetail::Checking(CheckingDetail::from_value(raw)?),
            DetailKind::CreditCard => {
                AccountDetail::CreditCard(CreditCardDetail::from_value(raw)?)
            }
            DetailKind::Loan => AccountDetail::Loan(LoanDetail::from_value(raw)?),
            DetailKind::Investment => {
                AccountDetail::Investment(InvestmentDetail::from_value(raw)?)
            }
        })
    }

    pub fn kind(&self) -> DetailKind {
        match self {
            AccountDetail::Checking(_) => DetailKind::Checking,
            AccountDetail::CreditCard(_) => DetailKind::CreditCard,
            AccountDetail::Loan(_) => DetailKind::Loan,
            AccountDetail::Investment(_) => DetailKind::Investment,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckingDetail {
    pub created_date: Option<String>,
    pub available_balance_amount: Option<Decimal>,
    pub open_date: Option<String>,
    pub period_start_date: Option<String>,
    pub period_end_date: Option<String>,
    pub period_deposit_amount: Option<Decimal>,
    pub period_interest_amount: Option<Decimal>,
    pub period_interest_rate: Option<Decimal>,
    pub interest_ytd_amount: Option<Decimal>,
    pub interest_prior_ytd_amount: Option<Decimal>,
    pub maturity_date: Option<String>,
}

impl Resource for CheckingDetail {
    const SCHEMA: Schema = Schema::new(
        "CheckingDetail",
        &[
            Field::optional("createdDate"),
            Field::optional("availableBalanceAmount"),
            Field::optional("openDate"),
            Field::optional("periodStartDate"),
            Field::optional("periodEndDate"),
            Field::optional("periodDepositAmount"),
            Field::optional("periodInterestAmount"),
            Field::optional("periodInterestRate"),
            Field::optional("interestYtdAmount"),
            Field::optional("interestPriorYtdAmount"),
            Field::optional("maturityDate"),
        ],
    );
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardDetail {
    pub created_date: Option<String>,
    pub credit_max_amount: Option<Decimal>,
    pub credit_available_amount: Option<Decimal>,
    pub payment_min_amount: Option<Decimal>,
    pub payment_due_date: Option<String>,
    pub last_payment_amount: Option<Decimal>,
    pub last_payment_date: Option<String>,
    pub statement_close_balance: Option<Decimal>,
    pub interest_rate: Option<Decimal>,
    pub cash_advance_interest_rate: Option<Decimal>,
}

impl Resource for CreditCardDetail {
    const SCHEMA: Schema = Schema::new(
        "CreditCardDetail",
        &[
            Field::optional("createdDate"),
            Field::optional("creditMaxAmount"),
            Field::optional("creditAvailableAmount"),
            Field::optional("paymentMinAmount"),
            Field::optional("paymentDueDate"),
            Field::optional("lastPaymentAmount"),
            Field::optional("lastPaymentDate"),
            Field::optional("statementCloseBalance"),
            Field::optional("interestRate"),
            Field::optional("cashAdvanceInterestRate"),
        ],
    );
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanDetail {
    pub created_date: Option<String>,
    pub interest_rate: Option<Decimal>,
    pub next_payment_date: Option<String>,
    pub next_payment: Option<Decimal>,
    pub escrow_balance: Option<Decimal>,
    pub payoff_amount: Option<Decimal>,
    pub principal_balance: Option<Decimal>,
    pub ytd_interest_paid: Option<Decimal>,
    pub ytd_principal_paid: Option<Decimal>,
    pub last_payment_amount: Option<Decimal>,
    pub last_payment_receive_date: Option<String>,
}

impl Resource for LoanDetail {
    const SCHEMA: Schema = Schema::new(
        "LoanDetail",
        &[
            Field::optional("createdDate"),
            Field::optional("interestRate"),
            Field::optional("nextPaymentDate"),
            Field::optional("nextPayment"),
            Field::optional("escrowBalance"),
            Field::optional("payoffAmount"),
            Field::optional("principalBalance"),
            Field::optional("ytdInterestPaid"),
            Field::optional("ytdPrincipalPaid"),
            Field::optional("lastPaymentAmount"),
            Field::optional("lastPaymentReceiveDate"),
        ],
    );
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentDetail {
    pub created_date: Option<String>,
    pub available_cash_balance: Option<Decimal>,
    pub current_balance: Option<Decimal>,
    pub margin_balance: Option<Decimal>,
    pub vested_balance: Option<Decimal>,
}

impl Resource for InvestmentDetail {
    const SCHEMA: Schema = Schema::new(
        "InvestmentDetail",
        &[
            Field::optional("createdDate"),
            Field::optional("availableCashBalance"),
            Field::optional("currentBalance"),
            Field::optional("marginBalance"),
            Field::optional("vestedBalance"),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FinicityError;
    use std::str::FromStr;

    fn raw_account(account_type: &str, detail: Option<Value>) -> Value {
        let mut raw = json!({
            "id": "2083",
            "number": "8888",
            "name": "Super Checking",
            "balance": "100.00",
            "type": account_type,
            "status": "active",
            "customerId": "5927425",
            "institutionId": "101732",
            "createdDate": "1421096154",
            "aggregationStatusCode": "0"
        });
        if let Some(detail) = detail {
            raw["detail"] = detail;
        }
        raw
    }

    #[test]
    fn test_detail_kind_buckets() {
        assert_eq!(DetailKind::for_account_type("investment"), DetailKind::Investment);
        assert_eq!(DetailKind::for_account_type("creditCard"), DetailKind::CreditCard);
        assert_eq!(DetailKind::for_account_type("lineOfCredit"), DetailKind::CreditCard);
        assert_eq!(DetailKind::for_account_type("mortgage"), DetailKind::Loan);
        assert_eq!(DetailKind::for_account_type("loan"), DetailKind::Loan);
        for other in ["checking", "savings", "cd", "moneyMarket", "unknown"] {
            assert_eq!(DetailKind::for_account_type(other), DetailKind::Checking);
        }
    }

    #[test]
    fn test_decode_without_detail() {
        let account = Account::decode(&raw_account("checking", None)).unwrap();
        assert!(account.detail.is_none());
        assert_eq!(account.balance, Some(Decimal::from_str("100.00").unwrap()));
        assert_eq!(account.customer_id.as_deref(), Some("5927425"));
    }

    #[test]
    fn test_decode_credit_card_detail() {
        let raw = raw_account(
            "creditCard",
            Some(json!({ "creditMaxAmount": "5000.00", "paymentDueDate": "1424736000" })),
        );
        let account = Account::decode(&raw).unwrap();
        match account.detail {
            Some(AccountDetail::CreditCard(detail)) => {
                assert_eq!(detail.credit_max_amount, Some(Decimal::from(5000)));
                assert_eq!(detail.payment_due_date.as_deref(), Some("1424736000"));
            }
            other => panic!("expected credit card detail, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_savings_defaults_to_checking_detail() {
        let raw = raw_account("savings", Some(json!({ "availableBalanceAmount": "42.10" })));
        let account = Account::decode(&raw).unwrap();
        assert_eq!(account.detail.unwrap().kind(), DetailKind::Checking);
    }

    #[test]
    fn test_empty_detail_element_is_ignored() {
        let raw = raw_account("loan", Some(Value::Null));
        assert!(Account::decode(&raw).unwrap().detail.is_none());
    }

    #[test]
    fn test_missing_balance_and_status() {
        let mut raw = raw_account("checking", None);
        raw.as_object_mut().unwrap().remove("balance");
        raw.as_object_mut().unwrap().remove("status");
        match Account::decode(&raw).unwrap_err() {
            FinicityError::MissingRequiredFields { resource, fields } => {
                assert_eq!(resource, "Account");
                assert_eq!(fields, vec!["balance", "status"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_required_elements_decode_as_none() {
        let mut raw = raw_account("checking", None);
        raw["number"] = Value::Null;
        raw["balance"] = Value::Null;
        raw["status"] = Value::Null;
        let account = Account::decode(&raw).unwrap();
        assert_eq!(account.number, None);
        assert_eq!(account.balance, None);
        assert_eq!(account.status, None);
        assert_eq!(account.name.as_deref(), Some("Super Checking"));
    }

    #[test]
    fn test_activation_element() {
        let account = Account::decode(&raw_account("checking", None)).unwrap();
        assert_eq!(
            account.activation(),
            json!({ "id": "2083", "number": "8888", "name": "Super Checking", "type": "checking" })
        );
    }
}
