//! Endpoint orchestrator for the aggregation API.
//!
//! Every token-requiring call first goes through [`Finicity::authenticate`],
//! which reuses the cached app token while it is live. Responses map onto:
//! - 2xx: decoded resources (counted envelopes normalized to sequences)
//! - 203: an [`MfaChallenge`] for linking operations
//! - 204: `true` for delete / no-body confirmations
//! - >= 400: [`FinicityError::Vendor`]

pub mod envelope;
pub mod requests;

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::cache::{MemoryTokenCache, TieredTokenCache, TokenCache};
use crate::config::{FinicityConfig, DEFAULT_BASE_URL};
use crate::errors::{FinicityError, Result};
use crate::models::de::is_true;
use crate::models::{
    Account, Customer, Institution, LoginField, MfaChallenge, Resource, Transaction,
    TransactionPage,
};
use crate::transport::{
    HttpMethod, HttpTransport, RawResponse, Transport, APP_TOKEN_HEADER, MFA_SESSION_HEADER,
};
use crate::xml;

pub use envelope::Outcome;
pub use requests::{CustomerQuery, SortOrder, TransactionQuery};

use envelope::{STATUS_MFA_REQUIRED, STATUS_NO_CONTENT};

pub const CACHE_KEY: &str = "FINICITY_TOKEN";
/// App tokens are valid for 90 minutes.
pub const TOKEN_EXPIRY_SECS: u64 = 90 * 60;

const AUTH_PATH: &str = "v2/partners/authentication";

fn seg(id: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(id)
}

pub struct Finicity {
    partner_id: String,
    partner_secret: Zeroizing<String>,
    transport: Arc<dyn Transport>,
    cache: Arc<dyn TokenCache>,
    /// Serializes the cache check and re-authentication.
    auth_lock: Mutex<()>,
}

impl Finicity {
    /// Client against the production API with an in-process token cache.
    pub fn new(
        partner_id: impl Into<String>,
        partner_secret: impl Into<String>,
        app_key: impl Into<String>,
    ) -> Result<Self> {
        let transport = HttpTransport::new(DEFAULT_BASE_URL, app_key)?;
        Ok(Self::with_parts(
            partner_id,
            partner_secret,
            Arc::new(transport),
            Arc::new(MemoryTokenCache::new()),
        ))
    }

    pub fn with_parts(
        partner_id: impl Into<String>,
        partner_secret: impl Into<String>,
        transport: Arc<dyn Transport>,
        cache: Arc<dyn TokenCache>,
    ) -> Self {
        Self {
            partner_id: partner_id.into(),
            partner_secret: Zeroizing::new(partner_secret.into()),
            transport,
            cache,
            auth_lock: Mutex::new(()),
        }
    }

    /// Build the transport and pick the cache backend from configuration.
    pub async fn from_config(cfg: &FinicityConfig) -> anyhow::Result<Self> {
        let transport =
            HttpTransport::with_timeout(cfg.base_url.as_str(), cfg.app_key.as_str(), cfg.timeout)?;
        let cache: Arc<dyn TokenCache> = match &cfg.redis_url {
            Some(url) => {
                info!("using Redis-backed token cache");
                Arc::new(TieredTokenCache::connect(url).await?)
            }
            None => Arc::new(MemoryTokenCache::new()),
        };
        Ok(Self::with_parts(
            cfg.partner_id.as_str(),
            cfg.partner_secret.as_str(),
            Arc::new(transport),
            cache,
        ))
    }

    // ── Authentication ─────────────────────────────────────────

    /// Return a live app token, authenticating only when the cache has none.
    pub async fn authenticate(&self) -> Result<String> {
        let _guard = self.auth_lock.lock().await;

        if let Some(token) = self.cache.get(CACHE_KEY).await {
            return Ok(token);
        }

        let body = requests::authentication_body(&self.partner_id, &self.partner_secret);
        let resp = self
            .transport
            .request(HttpMethod::Post, AUTH_PATH, Some(&body), &[])
            .await?;
        envelope::ensure_success(&resp)?;

        let doc = xml::decode(&resp.body)?;
        let token = doc
            .pointer("/access/token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| FinicityError::decode("authentication response missing access.token"))?;

        if let Err(e) = self.cache.set(CACHE_KEY, &token, TOKEN_EXPIRY_SECS).await {
            warn!(error = %e, "failed to cache app token");
        }
        info!(partner_id = %self.partner_id, "authenticated with Finicity");
        Ok(token)
    }

    async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<RawResponse> {
        self.call_with(method, path, body, Vec::new()).await
    }

    async fn call_with(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
        mut headers: Vec<(&'static str, String)>,
    ) -> Result<RawResponse> {
        let token = self.authenticate().await?;
        headers.push((APP_TOKEN_HEADER, token));
        debug!(method = method.as_str(), path, "finicity request");
        self.transport.request(method, path, body, &headers).await
    }

    /// Fetch one resource by id; an absent root element is a not-found.
    async fn lookup<T>(
        &self,
        path: &str,
        root: &str,
        resource: &'static str,
        id: &str,
        build: fn(&Value) -> Result<T>,
    ) -> Result<T> {
        let resp = self.call(HttpMethod::Get, path, None).await?;
        let not_found = || FinicityError::NotFound {
            resource,
            id: id.to_string(),
        };

        if resp.status == 404 {
            return Err(not_found());
        }
        envelope::ensure_success(&resp)?;
        if resp.body.trim().is_empty() {
            return Err(not_found());
        }

        let doc = envelope::decode_success(&resp)?;
        match doc.get(root) {
            Some(node) if !node.is_null() => build(node),
            _ => Err(not_found()),
        }
    }

    fn accounts_outcome(resp: &RawResponse) -> Result<Outcome<Vec<Account>>> {
        if resp.status == STATUS_MFA_REQUIRED {
            return Ok(Outcome::MfaRequired(envelope::mfa_challenge(resp)?));
        }
        envelope::ensure_success(resp)?;
        if resp.status == STATUS_NO_CONTENT || resp.body.trim().is_empty() {
            return Ok(Outcome::Complete(Vec::new()));
        }

        let doc = xml::decode(&resp.body)?;
        let accounts = envelope::items(doc.get("accounts"), "account")
            .iter()
            .map(Account::decode)
            .collect::<Result<Vec<_>>>()?;
        Ok(Outcome::Complete(accounts))
    }

    // ── Institutions ───────────────────────────────────────────

    /// Search institutions by name; an empty search matches everything.
    pub async fn get_institutions(&self, search: Option<&str>) -> Result<Vec<Institution>> {
        let body = requests::search_body(search);
        let resp = self.call(HttpMethod::Get, "v1/institutions", Some(&body)).await?;
        let doc = envelope::decode_success(&resp)?;
        envelope::items(doc.get("institutions"), "institution")
            .iter()
            .map(Institution::from_value)
            .collect()
    }

    pub async fn get_institution(&self, institution_id: &str) -> Result<Institution> {
        let path = format!("v1/institutions/{}", seg(institution_id));
        self.lookup(
            &path,
            "institution",
            "Institution",
            institution_id,
            Institution::from_value,
        )
        .await
    }

    /// Login form fields ordered by `displayOrder`.
    pub async fn get_login_form(&self, institution_id: &str) -> Result<Vec<LoginField>> {
        let path = format!("v1/institutions/{}/loginForm", seg(institution_id));
        let resp = self.call(HttpMethod::Get, &path, None).await?;
        let doc = envelope::decode_success(&resp)?;

        let mut fields = envelope::items(doc.get("loginForm"), "loginField")
            .iter()
            .map(LoginField::from_value)
            .collect::<Result<Vec<_>>>()?;
        fields.sort_by_key(|f| f.display_order);
        Ok(fields)
    }

    // ── Customers ──────────────────────────────────────────────

    /// Register a testing customer (only usable with test institutions).
    pub async fn add_testing_customer(&self, customer: Customer) -> Result<Customer> {
        self.create_customer("v1/customers/testing", "testing", customer)
            .await
    }

    pub async fn add_customer(&self, customer: Customer) -> Result<Customer> {
        self.create_customer("v1/customers/active", "active", customer)
            .await
    }

    async fn create_customer(
        &self,
        path: &str,
        kind: &str,
        mut customer: Customer,
    ) -> Result<Customer> {
        let customer_xml = serde_json::to_value(&customer)
            .map_err(|e| FinicityError::Encode(format!("invalid Customer: {}", e)))?;
        let attrs = serde_json::json!({ "customer": customer_xml });
        let resp = self.call(HttpMethod::Post, path, Some(&attrs)).await?;
        let doc = envelope::decode_success(&resp)?;

        let created = |name: &str| {
            doc.get("customer")
                .and_then(|c| c.get(name))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let (Some(id), Some(created_date)) = (created("id"), created("createdDate")) else {
            return Err(FinicityError::decode(
                "customer creation response missing id or createdDate",
            ));
        };

        customer.id = Some(id);
        customer.created_date = Some(created_date);
        customer.kind = Some(kind.to_string());
        info!(customer_id = ?customer.id, kind, "customer created");
        Ok(customer)
    }

    pub async fn get_customers(&self, query: &CustomerQuery) -> Result<Vec<Customer>> {
        let resp = self
            .call(HttpMethod::Get, "v1/customers", Some(&query.to_query()))
            .await?;
        let doc = envelope::decode_success(&resp)?;
        envelope::items(doc.get("customers"), "customer")
            .iter()
            .map(Customer::from_value)
            .collect()
    }

    pub async fn get_customer(&self, customer_id: &str) -> Result<Customer> {
        let path = format!("v1/customers/{}", seg(customer_id));
        self.lookup(&path, "customer", "Customer", customer_id, Customer::from_value)
            .await
    }

    /// `true` when the vendor confirmed the deletion with 204.
    pub async fn delete_customer(&self, customer_id: &str) -> Result<bool> {
        let path = format!("v1/customers/{}", seg(customer_id));
        let resp = self.call(HttpMethod::Delete, &path, None).await?;
        envelope::ensure_success(&resp)?;
        Ok(resp.status == STATUS_NO_CONTENT)
    }

    // ── Accounts ───────────────────────────────────────────────

    /// Link every account the credentials can see at an institution.
    pub async fn add_all_accounts(
        &self,
        customer_id: &str,
        institution_id: &str,
        credentials: &[LoginField],
    ) -> Result<Outcome<Vec<Account>>> {
        let path = format!(
            "v1/customers/{}/institutions/{}/accounts/addall",
            seg(customer_id),
            seg(institution_id)
        );
        let body = requests::credentials_body(credentials);
        let resp = self.call(HttpMethod::Post, &path, Some(&body)).await?;
        Self::accounts_outcome(&resp)
    }

    /// Resubmit an answered challenge from [`Finicity::add_all_accounts`].
    /// The challenge's session id travels in the `MFA-Session` header.
    pub async fn answer_mfa(
        &self,
        customer_id: &str,
        institution_id: &str,
        challenge: &MfaChallenge,
    ) -> Result<Outcome<Vec<Account>>> {
        let path = format!(
            "v1/customers/{}/institutions/{}/accounts/addall/mfa",
            seg(customer_id),
            seg(institution_id)
        );
        let body = challenge.answers_body();
        let resp = self
            .call_with(
                HttpMethod::Post,
                &path,
                Some(&body),
                vec![(MFA_SESSION_HEADER, challenge.session.clone())],
            )
            .await?;
        Self::accounts_outcome(&resp)
    }

    /// Discover the accounts available at an institution without linking them.
    pub async fn get_accounts(
        &self,
        customer_id: &str,
        institution_id: &str,
        credentials: &[LoginField],
    ) -> Result<Outcome<Vec<Account>>> {
        let path = format!(
            "v1/customers/{}/institutions/{}/accounts",
            seg(customer_id),
            seg(institution_id)
        );
        let body = requests::credentials_body(credentials);
        let resp = self.call(HttpMethod::Post, &path, Some(&body)).await?;
        Self::accounts_outcome(&resp)
    }

    pub async fn activate_accounts(
        &self,
        customer_id: &str,
        institution_id: &str,
        accounts: &[Account],
    ) -> Result<Outcome<Vec<Account>>> {
        let path = format!(
            "v1/customers/{}/institutions/{}/accounts",
            seg(customer_id),
            seg(institution_id)
        );
        let body = requests::activation_body(accounts);
        let resp = self.call(HttpMethod::Put, &path, Some(&body)).await?;
        Self::accounts_outcome(&resp)
    }

    /// Refresh all of a customer's accounts from their institutions.
    pub async fn refresh_customer_accounts(
        &self,
        customer_id: &str,
    ) -> Result<Outcome<Vec<Account>>> {
        let path = format!("v1/customers/{}/accounts", seg(customer_id));
        let resp = self.call(HttpMethod::Post, &path, None).await?;
        Self::accounts_outcome(&resp)
    }

    pub async fn get_customer_accounts(&self, customer_id: &str) -> Result<Outcome<Vec<Account>>> {
        let path = format!("v1/customers/{}/accounts", seg(customer_id));
        let resp = self.call(HttpMethod::Get, &path, None).await?;
        Self::accounts_outcome(&resp)
    }

    pub async fn refresh_institution_login(
        &self,
        customer_id: &str,
        institution_login_id: &str,
    ) -> Result<Outcome<Vec<Account>>> {
        let path = format!(
            "v1/customers/{}/institutionLogins/{}/accounts",
            seg(customer_id),
            seg(institution_login_id)
        );
        let resp = self.call(HttpMethod::Post, &path, None).await?;
        Self::accounts_outcome(&resp)
    }

    /// Single-account refresh. The vendor recommends refreshing by
    /// institution login instead.
    pub async fn refresh_account(
        &self,
        customer_id: &str,
        account_id: &str,
    ) -> Result<Outcome<Vec<Account>>> {
        let path = format!(
            "v1/customers/{}/accounts/{}",
            seg(customer_id),
            seg(account_id)
        );
        let resp = self.call(HttpMethod::Post, &path, None).await?;
        Self::accounts_outcome(&resp)
    }

    pub async fn get_account(&self, customer_id: &str, account_id: &str) -> Result<Account> {
        let path = format!(
            "v1/customers/{}/accounts/{}",
            seg(customer_id),
            seg(account_id)
        );
        self.lookup(&path, "account", "Account", account_id, Account::decode)
            .await
    }

    // ── Transactions ───────────────────────────────────────────

    /// Ask the vendor to load historic transactions for an account.
    /// Completes with `true` once the vendor accepts the request (204).
    pub async fn load_historic_transactions(
        &self,
        customer_id: &str,
        account_id: &str,
    ) -> Result<Outcome<bool>> {
        let path = format!(
            "v1/customers/{}/accounts/{}/transactions/historic",
            seg(customer_id),
            seg(account_id)
        );
        let resp = self.call(HttpMethod::Post, &path, None).await?;
        if resp.status == STATUS_MFA_REQUIRED {
            return Ok(Outcome::MfaRequired(envelope::mfa_challenge(&resp)?));
        }
        envelope::ensure_success(&resp)?;
        Ok(Outcome::Complete(resp.status == STATUS_NO_CONTENT))
    }

    pub async fn get_transactions(
        &self,
        customer_id: &str,
        account_id: &str,
        query: &TransactionQuery,
    ) -> Result<TransactionPage> {
        let path = format!(
            "v2/customers/{}/accounts/{}/transactions",
            seg(customer_id),
            seg(account_id)
        );
        let resp = self
            .call(HttpMethod::Get, &path, Some(&query.to_query()))
            .await?;
        let doc = envelope::decode_success(&resp)?;
        let envelope = doc.get("transactions");

        let more_available = envelope
            .and_then(|e| e.get("@moreAvailable"))
            .map(is_true)
            .unwrap_or(false);
        let transactions = envelope::items(envelope, "transaction")
            .iter()
            .map(Transaction::from_value)
            .collect::<Result<Vec<_>>>()?;

        Ok(TransactionPage {
            transactions,
            more_available,
        })
    }
}
