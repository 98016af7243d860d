use crate::meli::auth::OAuthSettings;
use crate::meli::client::DEFAULT_API_BASE;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Service credential for the store. Overrides the password embedded in
    /// `database_url` when set.
    pub database_password: Option<String>,
    pub meli_api_base: String,
    pub meli_app_id: Option<String>,
    pub meli_app_secret: Option<String>,
    /// Bootstrap refresh token, only used until the first credential row exists.
    pub meli_refresh_token: Option<String>,
    pub meli_user_id: Option<String>,
    /// Timeout applied to every outbound HTTP call.
    pub http_timeout_secs: u64,
    /// Item detail fetches in flight per sync run. 1 = sequential.
    pub sync_concurrency: usize,
    /// Interval of the background sync job. 0 = disabled.
    pub sync_interval_secs: u64,
    pub admin_user: Option<String>,
    pub admin_pass: Option<String>,
    pub creditcar_api_url: Option<String>,
    pub creditcar_api_key: Option<String>,
    /// Extra origin allowed by CORS besides localhost.
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn oauth_settings(&self) -> OAuthSettings {
        OAuthSettings {
            client_id: self.meli_app_id.clone(),
            client_secret: self.meli_app_secret.clone(),
            bootstrap_refresh_token: self.meli_refresh_token.clone(),
        }
    }

    /// Build a config from an arbitrary variable lookup. Blank values count
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Config {
            port: var("PORT").and_then(|v| v.parse().ok()).unwrap_or(8080),
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost/catalog".into()),
            database_password: var("DATABASE_PASSWORD"),
            meli_api_base: var("MELI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()),
            meli_app_id: var("MELI_APP_ID"),
            meli_app_secret: var("MELI_APP_SECRET"),
            meli_refresh_token: var("MELI_REFRESH_TOKEN"),
            meli_user_id: var("MELI_USER_ID"),
            http_timeout_secs: var("HTTP_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(15),
            sync_concurrency: var("SYNC_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1)
                .max(1),
            sync_interval_secs: var("SYNC_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            admin_user: var("ADMIN_USER"),
            admin_pass: var("ADMIN_PASS"),
            creditcar_api_url: var("CREDITCAR_API_URL"),
            creditcar_api_key: var("CREDITCAR_API_KEY"),
            cors_origin: var("CORS_ORIGIN"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

pub fn load() -> Config {
    dotenvy::dotenv().ok();
    Config::from_lookup(|key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let cfg = Config::default();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.meli_api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.http_timeout_secs, 15);
        assert_eq!(cfg.sync_concurrency, 1);
        assert_eq!(cfg.sync_interval_secs, 0);
        assert!(cfg.meli_app_id.is_none());
        assert!(cfg.meli_refresh_token.is_none());
    }

    #[test]
    fn test_blank_values_are_unset() {
        let cfg = from_pairs(&[("MELI_APP_ID", "   "), ("MELI_USER_ID", "")]);
        assert!(cfg.meli_app_id.is_none());
        assert!(cfg.meli_user_id.is_none());
    }

    #[test]
    fn test_reads_marketplace_settings() {
        let cfg = from_pairs(&[
            ("MELI_APP_ID", "123"),
            ("MELI_APP_SECRET", "shh"),
            ("MELI_REFRESH_TOKEN", "TG-abc"),
            ("MELI_USER_ID", "99"),
            ("SYNC_CONCURRENCY", "4"),
        ]);
        let oauth = cfg.oauth_settings();
        assert_eq!(oauth.client_id.as_deref(), Some("123"));
        assert_eq!(oauth.client_secret.as_deref(), Some("shh"));
        assert_eq!(oauth.bootstrap_refresh_token.as_deref(), Some("TG-abc"));
        assert_eq!(cfg.meli_user_id.as_deref(), Some("99"));
        assert_eq!(cfg.sync_concurrency, 4);
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let cfg = from_pairs(&[
            ("PORT", "http"),
            ("HTTP_TIMEOUT_SECS", "0"),
            ("SYNC_CONCURRENCY", "0"),
        ]);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.http_timeout_secs, 15);
        assert_eq!(cfg.sync_concurrency, 1);
    }
}
