use anyhow::Context;
use std::time::Duration;
use zeroize::Zeroizing;

pub const DEFAULT_BASE_URL: &str = "https://api.finicity.com/aggregation/";

#[derive(Debug, Clone)]
pub struct FinicityConfig {
    pub partner_id: String,
    pub partner_secret: Zeroizing<String>,
    pub app_key: String,
    pub base_url: String,
    /// When set, the app token is shared through Redis instead of living
    /// only in this process.
    pub redis_url: Option<String>,
    pub timeout: Duration,
}

impl FinicityConfig {
    pub fn new(
        partner_id: impl Into<String>,
        partner_secret: impl Into<String>,
        app_key: impl Into<String>,
    ) -> Self {
        Self {
            partner_id: partner_id.into(),
            partner_secret: Zeroizing::new(partner_secret.into()),
            app_key: app_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            redis_url: None,
            timeout: crate::transport::DEFAULT_TIMEOUT,
        }
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    let value = std::env::var(name).with_context(|| format!("{} is not set", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("{} is empty", name);
    }
    Ok(value)
}

pub fn load() -> anyhow::Result<FinicityConfig> {
    dotenvy::dotenv().ok();

    let base_url =
        std::env::var("FINICITY_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    url::Url::parse(&base_url).with_context(|| format!("invalid FINICITY_BASE_URL {}", base_url))?;

    Ok(FinicityConfig {
        partner_id: required("FINICITY_PARTNER_ID")?,
        partner_secret: Zeroizing::new(required("FINICITY_PARTNER_SECRET")?),
        app_key: required("FINICITY_APP_KEY")?,
        base_url,
        redis_url: std::env::var("FINICITY_REDIS_URL")
            .ok()
            .filter(|s| !s.trim().is_empty()),
        timeout: std::env::var("FINICITY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(crate::transport::DEFAULT_TIMEOUT),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_defaults() {
        let cfg = FinicityConfig::new("pid", "secret", "key");
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.partner_secret.as_str(), "secret");
        assert!(cfg.redis_url.is_none());
        assert_eq!(cfg.timeout, Duration::from_secs(30));
    }

    // Single test touching the process environment to avoid races between
    // parallel tests.
    #[test]
    fn test_load_from_env() {
        std::env::remove_var("FINICITY_PARTNER_ID");
        assert!(load().is_err());

        std::env::set_var("FINICITY_PARTNER_ID", "pid");
        std::env::set_var("FINICITY_PARTNER_SECRET", "secret");
        std::env::set_var("FINICITY_APP_KEY", "key");
        std::env::set_var("FINICITY_TIMEOUT_SECS", "5");
        let cfg = load().unwrap();
        assert_eq!(cfg.partner_id, "pid");
        assert_eq!(cfg.timeout, Duration::from_secs(5));

        std::env::set_var("FINICITY_BASE_URL", "not a url");
        assert!(load().is_err());

        for var in [
            "FINICITY_PARTNER_ID",
            "FINICITY_PARTNER_SECRET",
            "FINICITY_APP_KEY",
            "FINICITY_TIMEOUT_SECS",
            "FINICITY_BASE_URL",
        ] {
            std::env::remove_var(var);
        }
    }
}
