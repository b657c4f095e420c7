//! Application settings: who we are to Twitch and where to reach it.
use std::env;

use twitch_oauth2::{ClientId, Scope};
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "https://api.twitch.tv/helix";
pub const DEFAULT_AUTH_BASE_URL: &str = "https://id.twitch.tv/oauth2";
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:10666/";

/// Errors for [`Config`]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Twitch client ID is not set, export TWITCH_CLIENT_ID or pass --client-id")]
    MissingClientId,
    #[error("invalid redirect url {url:?}")]
    InvalidRedirectUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Application client id, `None` until the user configured one.
    pub client_id: Option<ClientId>,
    /// Where twitch sends the browser after authorization. Always ends with `/`.
    pub redirect_url: Url,
    pub scopes: Vec<Scope>,
    pub api_base_url: String,
    pub auth_base_url: String,
    /// Ask twitch to show the consent screen even if the user already authorized the app.
    pub force_verify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            client_id: None,
            redirect_url: Url::parse(DEFAULT_REDIRECT_URL).expect("default redirect url is valid"),
            scopes: vec![Scope::ChannelReadHypeTrain],
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
            force_verify: false,
        }
    }
}

impl Config {
    pub fn new(client_id: impl Into<String>) -> Self {
        Config::default().with_client_id(client_id)
    }

    /// Read settings from `TWITCH_CLIENT_ID`, `TWITCH_REDIRECT_URL`, `TWITCH_API_BASE_URL` and
    /// `TWITCH_AUTH_BASE_URL`. Unset or blank variables keep their default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(client_id) = var("TWITCH_CLIENT_ID") {
            config = config.with_client_id(client_id);
        }
        if let Some(redirect) = var("TWITCH_REDIRECT_URL") {
            config = config.with_redirect_url(&redirect)?;
        }
        if let Some(base) = var("TWITCH_API_BASE_URL") {
            config.api_base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(base) = var("TWITCH_AUTH_BASE_URL") {
            config.auth_base_url = base.trim_end_matches('/').to_string();
        }
        Ok(config)
    }

    /// Set the client id. A blank id leaves the configuration without one.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        let client_id = client_id.into().trim().to_string();
        self.client_id = if client_id.is_empty() {
            None
        } else {
            Some(ClientId::new(client_id))
        };
        self
    }

    pub fn with_redirect_url(mut self, redirect_url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(redirect_url).map_err(|source| ConfigError::InvalidRedirectUrl {
            url: redirect_url.to_string(),
            source,
        })?;
        self.redirect_url = normalize_redirect_url(&url);
        Ok(self)
    }

    pub fn require_client_id(&self) -> Result<&ClientId, ConfigError> {
        self.client_id.as_ref().ok_or(ConfigError::MissingClientId)
    }

    /// Scopes as sent in the `scope` parameter, space separated.
    pub fn scope_string(&self) -> String {
        self.scopes
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Origin and path of `url`, with exactly one trailing slash.
///
/// Query and fragment are dropped, twitch matches redirect urls exactly.
pub fn normalize_redirect_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    let path = format!("{}/", url.path().trim_end_matches('/'));
    normalized.set_path(&path);
    normalized.set_query(None);
    normalized.set_fragment(None);
    normalized
}

fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
