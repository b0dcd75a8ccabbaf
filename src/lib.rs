//! Client for the Finicity aggregation API.
//!
//! Authenticates with partner credentials, caches the app token, and turns
//! the vendor's XML responses into typed resources.

pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod login_form;
pub mod models;
pub mod transport;
pub mod xml;

pub use client::{CustomerQuery, Finicity, Outcome, SortOrder, TransactionQuery};
pub use config::FinicityConfig;
pub use errors::{FinicityError, Result};
pub use models::{
    Account, AccountDetail, Customer, Institution, LoginField, MfaChallenge, MfaQuestion,
    Transaction, TransactionPage,
};
