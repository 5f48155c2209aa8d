/*
 * Responsibility
 * - 環境変数 (.env 含む) から設定を読み込む
 * - issuer から discovery URL / organization URL を導出する
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    // Compared verbatim against the `iss` claim.
    pub issuer: String,
    pub audience: String,
    pub protected_scopes: Vec<String>,
    pub access_token_leeway_seconds: u64,

    pub metadata_url: Url,
    pub org_url: Url,

    pub idp_api_token: Option<String>,
    pub authz_issuer: Option<String>,
    pub idp_id: Option<String>,
    pub widget_scopes: Vec<String>,

    pub remote_timeout: Duration,
    pub session_ttl: Duration,
    pub protected_resource_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = split_list(&std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default());

        let issuer = std::env::var("AUTH_ISSUER").map_err(|_| ConfigError::Missing("AUTH_ISSUER"))?;
        let audience =
            std::env::var("AUTH_AUDIENCE").map_err(|_| ConfigError::Missing("AUTH_AUDIENCE"))?;

        let protected_scopes = scope_list(
            &std::env::var("PROTECTED_SCOPE").unwrap_or_default(),
            "PROTECTED_SCOPE",
        )?;

        let access_token_leeway_seconds = std::env::var("ACCESS_TOKEN_LEEWAY_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let (metadata_url, org_url) = derive_issuer_urls(&issuer)?;

        let idp_api_token = non_empty_var("IDP_API_TOKEN");
        let authz_issuer = non_empty_var("AUTHZ_ISSUER");
        let idp_id = non_empty_var("IDP_ID");

        let widget_scopes = match std::env::var("WIDGET_SCOPES") {
            Ok(raw) => scope_list(&raw, "WIDGET_SCOPES")?,
            Err(_) => vec!["openid".into(), "email".into(), "profile".into()],
        };

        let remote_timeout = std::env::var("REMOTE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));

        let session_ttl = std::env::var("SESSION_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30 * 60));

        let protected_resource_path = std::env::var("PROTECTED_RESOURCE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("images/oauth2.png"));

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            issuer,
            audience,
            protected_scopes,
            access_token_leeway_seconds,
            metadata_url,
            org_url,
            idp_api_token,
            authz_issuer,
            idp_id,
            widget_scopes,
            remote_timeout,
            session_ttl,
            protected_resource_path,
        })
    }
}

/// Derive `{issuer}/.well-known/openid-configuration` and the organization base URL
/// (`scheme://host[:port]`) from the configured issuer.
pub fn derive_issuer_urls(issuer: &str) -> Result<(Url, Url), ConfigError> {
    let parsed = Url::parse(issuer).map_err(|_| ConfigError::Invalid("AUTH_ISSUER"))?;
    if parsed.host_str().is_none() {
        return Err(ConfigError::Invalid("AUTH_ISSUER"));
    }

    let metadata_url = Url::parse(&format!(
        "{}/.well-known/openid-configuration",
        issuer.trim_end_matches('/')
    ))
    .map_err(|_| ConfigError::Invalid("AUTH_ISSUER"))?;

    let origin = parsed.origin().ascii_serialization();
    let org_url = Url::parse(&origin).map_err(|_| ConfigError::Invalid("AUTH_ISSUER"))?;

    Ok((metadata_url, org_url))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Scope tokens are `%x21 / %x23-5B / %x5D-7E` (RFC 6749 §3.3); they end up
/// inside a quoted `WWW-Authenticate` parameter.
fn scope_list(raw: &str, key: &'static str) -> Result<Vec<String>, ConfigError> {
    let scopes = split_list(raw);
    let valid = |scope: &String| {
        scope
            .bytes()
            .all(|b| matches!(b, 0x21 | 0x23..=0x5B | 0x5D..=0x7E))
    };

    if scopes.iter().all(valid) {
        Ok(scopes)
    } else {
        Err(ConfigError::Invalid(key))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
