//! Session of the broadcaster: token lifecycle and who the token belongs to.
use log::{debug, error, info, warn};
use twitch_oauth2::{
    oauth2::{HttpRequest, HttpResponse},
    AccessToken, CsrfToken,
};
use url::Url;

use crate::callback::{parse_callback_url, Callback, ImplicitGrant};
use crate::config::{Config, ConfigError};
use crate::helix::{get_json, helix_headers, oauth_headers, HelixError, HelixResponse};
use crate::model::{User, ValidatedToken};
use crate::storage::{Storage, StorageError, ACCESS_TOKEN_KEY, OAUTH_STATE_KEY};

/// Errors for [`TwitchAuth`]
#[derive(Debug, thiserror::Error)]
pub enum AuthError<ClientError>
where
    ClientError: std::error::Error + Send + Sync + 'static,
{
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("invalid token")]
    InvalidToken(#[source] HelixError<ClientError>),
    #[error("unable to retrieve user information")]
    UserInfo(#[source] HelixError<ClientError>),
    #[error("unable to retrieve user information")]
    UserNotFound,
    #[error("authorization denied: {error} - {description}")]
    Denied { error: String, description: String },
    #[error("state of the redirect does not match the login request")]
    StateMismatch,
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    #[error(transparent)]
    StorageError(#[from] StorageError),
    #[error("could not parse url")]
    UrlParseError(#[from] url::ParseError),
}

/// Errors for [`TwitchAuth::login_url`]
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    #[error(transparent)]
    StorageError(#[from] StorageError),
    #[error("could not parse url")]
    UrlParseError(#[from] url::ParseError),
}

/// Holds the token of the broadcaster and the identity it resolves to.
///
/// The token is persisted in a [`Storage`] under [`ACCESS_TOKEN_KEY`] so later runs pick it up
/// again. It is dropped from the storage on [`logout`](TwitchAuth::logout) and whenever twitch
/// refuses it.
pub struct TwitchAuth<C, S> {
    config: Config,
    client: C,
    storage: S,
    access_token: Option<AccessToken>,
    user_id: Option<String>,
    user_info: Option<User>,
}

impl<C, S: Storage> TwitchAuth<C, S> {
    pub fn new(client: C, storage: S, config: Config) -> TwitchAuth<C, S> {
        TwitchAuth {
            config,
            client,
            storage,
            access_token: None,
            user_id: None,
            user_info: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn user_info(&self) -> Option<&User> {
        self.user_info.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub(crate) fn client(&self) -> &C {
        &self.client
    }

    /// Url the user has to visit to authorize the application, and the CSRF state attached to it.
    ///
    /// The state is remembered until the redirect comes back.
    pub fn login_url(&self) -> Result<(Url, CsrfToken), LoginError> {
        let client_id = self.config.require_client_id()?;
        let state = CsrfToken::new_random();
        let mut url = Url::parse(&format!("{}/authorize", self.config.auth_base_url))?;
        url.query_pairs_mut()
            .append_pair("client_id", client_id.as_str())
            .append_pair("redirect_uri", self.config.redirect_url.as_str())
            .append_pair("response_type", "token")
            .append_pair("scope", &self.config.scope_string())
            .append_pair("state", state.secret());
        if self.config.force_verify {
            url.query_pairs_mut().append_pair("force_verify", "true");
        }
        self.storage.set(OAUTH_STATE_KEY, state.secret())?;
        debug!("redirect uri: {}", self.config.redirect_url);
        debug!("oauth url: {}", url);
        Ok((url, state))
    }

    /// Pick up the token from a redirect, or from the storage when there is none.
    ///
    /// Returns whether a token is now held.
    pub fn handle_callback<RE>(&mut self, callback: Option<&Url>) -> Result<bool, AuthError<RE>>
    where
        RE: std::error::Error + Send + Sync + 'static,
    {
        match callback.map(parse_callback_url) {
            Some(Callback::Token(grant)) => {
                self.accept_grant(grant)?;
                return Ok(true);
            }
            Some(Callback::Denied { error, description }) => {
                self.storage.remove(OAUTH_STATE_KEY)?;
                return Err(AuthError::Denied { error, description });
            }
            Some(Callback::Empty) | None => {}
        }

        match self.storage.get(ACCESS_TOKEN_KEY)? {
            Some(token) if !token.is_empty() => {
                debug!("using stored token");
                self.access_token = Some(AccessToken::new(token));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Hold and persist a token handed back by twitch.
    ///
    /// If a login request is pending, the state of the grant has to match it.
    pub fn accept_grant<RE>(&mut self, grant: ImplicitGrant) -> Result<(), AuthError<RE>>
    where
        RE: std::error::Error + Send + Sync + 'static,
    {
        let pending = self.storage.get(OAUTH_STATE_KEY)?;
        if let (Some(pending), Some(state)) = (pending.as_deref(), grant.state.as_deref()) {
            if pending != state {
                return Err(AuthError::StateMismatch);
            }
        }
        self.storage.remove(OAUTH_STATE_KEY)?;
        self.storage
            .set(ACCESS_TOKEN_KEY, grant.access_token.secret())?;
        self.access_token = Some(grant.access_token);
        info!("received access token");
        Ok(())
    }

    /// Forget the session and delete the token.
    pub fn logout(&mut self) -> Result<(), StorageError> {
        self.access_token = None;
        self.user_id = None;
        self.user_info = None;
        self.storage.remove(ACCESS_TOKEN_KEY)?;
        self.storage.remove(OAUTH_STATE_KEY)
    }

    fn logout_quietly(&mut self) {
        if let Err(e) = self.logout() {
            error!("could not delete the stored token: {}", e);
        }
    }
}

impl<RE, C, F, S> TwitchAuth<C, S>
where
    RE: std::error::Error + Send + Sync + 'static,
    C: Copy + FnOnce(HttpRequest) -> F,
    F: std::future::Future<Output = Result<HttpResponse, RE>>,
    S: Storage,
{
    /// Ask twitch who the token belongs to.
    ///
    /// Any failure logs the session out.
    pub async fn validate_token(&mut self) -> Result<ValidatedToken, AuthError<RE>> {
        let result = self.validate_inner().await;
        match result {
            Ok(validated) => {
                self.user_id = validated.user_id.clone();
                for scope in &self.config.scopes {
                    let scope = scope.to_string();
                    if !validated.scopes.contains(&scope) {
                        warn!("token is missing scope {}", scope);
                    }
                }
                Ok(validated)
            }
            Err(e) => {
                error!("token validation failed: {}", e);
                self.logout_quietly();
                Err(e)
            }
        }
    }

    async fn validate_inner(&self) -> Result<ValidatedToken, AuthError<RE>> {
        let token = self.access_token.as_ref().ok_or(AuthError::NotAuthenticated)?;
        let url = Url::parse(&format!("{}/validate", self.config.auth_base_url))?;
        let headers = oauth_headers(token).map_err(|e| AuthError::InvalidToken(e.into()))?;
        get_json(self.client, url, headers, "invalid token")
            .await
            .map_err(AuthError::InvalidToken)
    }

    /// Fetch the profile of the validated user.
    pub async fn get_user_info(&mut self) -> Result<&User, AuthError<RE>> {
        let (token, user_id) = match (&self.access_token, &self.user_id) {
            (Some(token), Some(user_id)) => (token, user_id),
            _ => return Err(AuthError::NotAuthenticated),
        };
        let client_id = self.config.require_client_id()?;
        let mut url = Url::parse(&format!("{}/users", self.config.api_base_url))?;
        url.query_pairs_mut().append_pair("id", user_id);
        let headers = helix_headers(token, client_id).map_err(|e| AuthError::UserInfo(e.into()))?;

        let response: HelixResponse<User> =
            get_json(self.client, url, headers, "unable to retrieve user information")
                .await
                .map_err(AuthError::UserInfo)?;
        let user = response
            .data
            .into_iter()
            .next()
            .ok_or(AuthError::UserNotFound)?;
        Ok(self.user_info.insert(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    type Auth<'a> = TwitchAuth<(), &'a MemoryStorage>;
    type TestError = AuthError<std::io::Error>;

    fn config() -> Config {
        Config::new("my_client_id")
    }

    #[test]
    fn login_url_remembers_state() {
        let storage = MemoryStorage::new();
        let auth: Auth = TwitchAuth::new((), &storage, config());
        let (url, state) = auth.login_url().unwrap();
        assert_eq!(url.path(), "/oauth2/authorize");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "my_client_id");
        assert_eq!(pairs["redirect_uri"], "http://localhost:10666/");
        assert_eq!(pairs["response_type"], "token");
        assert_eq!(pairs["scope"], "channel:read:hype_train");
        assert!(!pairs.contains_key("force_verify"));
        assert_eq!(&pairs["state"], state.secret());
        assert_eq!(
            storage.get(OAUTH_STATE_KEY).unwrap().as_ref(),
            Some(state.secret())
        );
    }

    #[test]
    fn login_url_needs_client_id() {
        let storage = MemoryStorage::new();
        let auth: Auth = TwitchAuth::new((), &storage, Config::default());
        assert!(matches!(
            auth.login_url(),
            Err(LoginError::ConfigError(ConfigError::MissingClientId))
        ));
    }

    #[test]
    fn callback_token_is_persisted() {
        let storage = MemoryStorage::new();
        let mut auth: Auth = TwitchAuth::new((), &storage, config());
        let url = Url::parse("http://localhost:10666/#access_token=abc&token_type=bearer").unwrap();
        assert!(auth.handle_callback::<std::io::Error>(Some(&url)).unwrap());
        assert!(auth.is_authenticated());
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn falls_back_to_stored_token() {
        let storage = MemoryStorage::new();
        let mut auth: Auth = TwitchAuth::new((), &storage, config());
        assert!(!auth.handle_callback::<std::io::Error>(None).unwrap());
        assert!(!auth.is_authenticated());

        storage.set(ACCESS_TOKEN_KEY, "stored").unwrap();
        let url = Url::parse("http://localhost:10666/").unwrap();
        assert!(auth.handle_callback::<std::io::Error>(Some(&url)).unwrap());
        assert_eq!(auth.access_token().unwrap().secret(), "stored");
    }

    #[test]
    fn callback_state_has_to_match() {
        let storage = MemoryStorage::new();
        let mut auth: Auth = TwitchAuth::new((), &storage, config());
        storage.set(OAUTH_STATE_KEY, "expected").unwrap();
        let url = Url::parse("http://localhost:10666/#access_token=abc&state=forged").unwrap();
        let result: Result<bool, TestError> = auth.handle_callback(Some(&url));
        assert!(matches!(result, Err(AuthError::StateMismatch)));
        assert!(!auth.is_authenticated());
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn denied_callback() {
        let storage = MemoryStorage::new();
        let mut auth: Auth = TwitchAuth::new((), &storage, config());
        let url = Url::parse("http://localhost:10666/?error=access_denied&error_description=no")
            .unwrap();
        let result: Result<bool, TestError> = auth.handle_callback(Some(&url));
        assert!(matches!(result, Err(AuthError::Denied { .. })));
    }

    #[test]
    fn logout_clears_everything() {
        let storage = MemoryStorage::new();
        let mut auth: Auth = TwitchAuth::new((), &storage, config());
        storage.set(ACCESS_TOKEN_KEY, "stored").unwrap();
        storage.set(OAUTH_STATE_KEY, "pending").unwrap();
        auth.handle_callback::<std::io::Error>(None).unwrap();
        auth.logout().unwrap();
        assert!(!auth.is_authenticated());
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(OAUTH_STATE_KEY).unwrap(), None);
    }
}
