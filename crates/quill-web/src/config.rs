use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use quill_core::RateLimitRule;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub tls: TlsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_ttl_hours")]
    pub jwt_ttl_hours: u64,
    #[serde(default = "default_reset_token_ttl_minutes")]
    pub reset_token_ttl_minutes: u64,
    /// Return the raw reset token in the reset-request response. There is no
    /// mailer, so this is the only way to deliver it.
    #[serde(default = "default_true")]
    pub expose_reset_token: bool,
}

/// Per-action attempt budgets. Keys are `"<action>:<caller>"`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_login_rule")]
    pub login: RateLimitRule,
    #[serde(default = "default_register_rule")]
    pub register: RateLimitRule,
    #[serde(default = "default_reset_rule")]
    pub reset: RateLimitRule,
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

impl TlsConfig {
    pub fn is_enabled(&self) -> bool {
        self.cert_path.is_some() && self.key_path.is_some()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_ttl_hours: default_jwt_ttl_hours(),
            reset_token_ttl_minutes: default_reset_token_ttl_minutes(),
            expose_reset_token: true,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login: default_login_rule(),
            register: default_register_rule(),
            reset: default_reset_rule(),
            prune_interval_secs: default_prune_interval_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            tls: TlsConfig::default(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_true() -> bool { true }
fn default_jwt_ttl_hours() -> u64 { 24 }
fn default_reset_token_ttl_minutes() -> u64 { 60 }
fn default_prune_interval_secs() -> u64 { 60 }
fn default_login_rule() -> RateLimitRule { RateLimitRule::new(5, 60) }
fn default_register_rule() -> RateLimitRule { RateLimitRule::new(5, 60) }
fn default_reset_rule() -> RateLimitRule { RateLimitRule::new(3, 300) }

const WEAK_SECRETS: &[&str] = &[
    "change-me-to-a-random-secret",
    "dev-secret",
    "secret",
    "password",
    "jwt-secret",
];

impl ServerConfig {
    /// Reads the TOML file named by `QUILL_WEB_CONFIG` (if any), then applies
    /// environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let config = match std::env::var("QUILL_WEB_CONFIG").map(PathBuf::from) {
            Ok(path) => Self::from_path(&path)?,
            Err(_) => ServerConfig::default(),
        };
        config.with_env_overrides()?.validated()
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    fn with_env_overrides(mut self) -> anyhow::Result<Self> {
        if let Ok(secret) = std::env::var("QUILL_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(addr) = std::env::var("QUILL_BIND_ADDR") {
            self.bind_addr = addr.parse()?;
        }
        if let Ok(cert) = std::env::var("QUILL_TLS_CERT") {
            self.tls.cert_path = Some(cert);
        }
        if let Ok(key) = std::env::var("QUILL_TLS_KEY") {
            self.tls.key_path = Some(key);
        }
        if let Ok(val) = std::env::var("QUILL_EXPOSE_RESET_TOKEN") {
            self.auth.expose_reset_token = matches!(val.as_str(), "1" | "true" | "yes");
        }
        Ok(self)
    }

    /// Fills in a random JWT secret when none is set and rejects known
    /// placeholder secrets.
    pub fn validated(mut self) -> anyhow::Result<Self> {
        if self.auth.jwt_secret.is_empty() {
            self.auth.jwt_secret = uuid::Uuid::new_v4().to_string();
            tracing::warn!(
                "No JWT secret configured. Generated random secret (sessions will not survive a restart)."
            );
        }

        if WEAK_SECRETS.iter().any(|&w| self.auth.jwt_secret == w) {
            anyhow::bail!(
                "JWT secret matches a known weak/placeholder value. \
                 Set a strong random secret via QUILL_JWT_SECRET environment variable."
            );
        }
        if self.auth.jwt_secret.len() < 32 {
            tracing::warn!(
                "JWT secret is shorter than 32 characters. \
                 Consider using a stronger secret via QUILL_JWT_SECRET."
            );
        }
        if self.rate_limit.prune_interval_secs == 0 {
            anyhow::bail!("rate_limit.prune_interval_secs must be greater than zero");
        }

        Ok(self)
    }
}
