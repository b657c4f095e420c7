//! The controller tying session, api and screen together.
use chrono::Utc;
use log::{debug, error, info};
use twitch_oauth2::{
    oauth2::{HttpRequest, HttpResponse},
    CsrfToken,
};
use url::Url;

use crate::api::{ApiError, HypeTrainApi};
use crate::auth::{AuthError, LoginError, TwitchAuth};
use crate::callback::{CallbackError, ImplicitGrant, ImplicitGrantHook};
use crate::config::{Config, ConfigError};
use crate::storage::{Storage, StorageError};
use crate::view::Screen;

/// Errors for [`App`]
#[derive(Debug, thiserror::Error)]
pub enum AppError<ClientError>
where
    ClientError: std::error::Error + Send + Sync + 'static,
{
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error(transparent)]
    AuthError(#[from] AuthError<ClientError>),
    #[error(transparent)]
    ApiError(#[from] ApiError<ClientError>),
    #[error(transparent)]
    LoginError(LoginError),
    #[error(transparent)]
    CallbackError(#[from] CallbackError),
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

pub struct App<C, S> {
    auth: TwitchAuth<C, S>,
    ui: Screen,
}

impl<RE, C, F, S> App<C, S>
where
    RE: std::error::Error + Send + Sync + 'static,
    C: Copy + FnOnce(HttpRequest) -> F,
    F: std::future::Future<Output = Result<HttpResponse, RE>>,
    S: Storage,
{
    pub fn new(client: C, storage: S, config: Config) -> Self {
        debug!("client id configured: {}", config.client_id.is_some());
        debug!("redirect uri: {}", config.redirect_url);
        App {
            auth: TwitchAuth::new(client, storage, config),
            ui: Screen::new(),
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.ui
    }

    pub fn auth(&self) -> &TwitchAuth<C, S> {
        &self.auth
    }

    /// Authorize url for the login button. Without a client id the error is shown instead.
    pub fn login_url(&mut self) -> Result<(Url, CsrfToken), AppError<RE>> {
        self.auth.login_url().map_err(|e| {
            let e = match e {
                LoginError::ConfigError(e) => AppError::ConfigError(e),
                e => AppError::LoginError(e),
            };
            self.ui.show_error(e.to_string());
            e
        })
    }

    /// Run the implicit grant flow through a local listener on the redirect url.
    ///
    /// `present` receives the authorize url once the listener is up, the call then blocks until
    /// twitch redirects the user back.
    pub fn authorize(
        &mut self,
        port: Option<u16>,
        present: impl FnOnce(&Url),
    ) -> Result<ImplicitGrant, AppError<RE>> {
        let mut hook = ImplicitGrantHook::new(self.auth.config().redirect_url.clone());
        if let Some(port) = port {
            hook.set_port(port);
        }
        let listener = hook.listen().map_err(|e| self.fail(e))?;
        let (url, state) = self.login_url()?;
        present(&url);
        listener
            .receive_grant(Some(state.secret()))
            .map_err(|e| self.fail(e))
    }

    fn fail<E: Into<AppError<RE>>>(&mut self, e: E) -> AppError<RE> {
        let e = e.into();
        error!("{}", e);
        self.ui.show_login_section();
        self.ui.show_error(format!("Error: {}", e));
        e
    }

    /// Start from a redirect url, or from the stored token when there is none.
    pub async fn init(&mut self, callback: Option<&Url>) {
        match self.auth.handle_callback::<RE>(callback) {
            Ok(true) => {
                debug!("token found, authenticating");
                self.handle_authenticated().await;
            }
            Ok(false) => {
                debug!("no token, showing login");
                self.ui.show_login_section();
            }
            Err(e) => {
                error!("callback failed: {}", e);
                self.ui.show_login_section();
                self.ui.show_error(format!("Error: {}", e));
            }
        }
    }

    /// Continue with a token received by the local redirect listener.
    pub async fn complete_login(&mut self, grant: ImplicitGrant) {
        match self.auth.accept_grant::<RE>(grant) {
            Ok(()) => self.handle_authenticated().await,
            Err(e) => {
                error!("login failed: {}", e);
                self.ui.show_login_section();
                self.ui.show_error(format!("Error: {}", e));
            }
        }
    }

    /// Validate the session and fill the dashboard. Any failure logs the session out.
    pub async fn handle_authenticated(&mut self) {
        self.ui.show_loading();
        match self.load_dashboard().await {
            Ok(()) => {
                self.ui.hide_loading();
                info!("dashboard loaded");
            }
            Err(e) => {
                error!("{}", e);
                self.ui.hide_loading();
                self.ui.show_error(format!("Error: {}", e));
                if let Err(e) = self.auth.logout() {
                    error!("could not delete the stored token: {}", e);
                }
            }
        }
    }

    async fn load_dashboard(&mut self) -> Result<(), AppError<RE>> {
        debug!("validating token");
        self.auth.validate_token().await?;

        debug!("fetching user info");
        let user = self.auth.get_user_info().await?.clone();
        info!("user: {}", user.display_name);
        self.ui.show_authenticated_sections();
        self.ui.display_user_info(&user);

        debug!("fetching hype train status");
        let statuses = HypeTrainApi::new(&self.auth).get_hype_train_status().await?;
        self.ui.display_hype_train_data(&statuses, Utc::now());
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), AppError<RE>> {
        self.auth.logout()?;
        self.ui.show_login_section();
        Ok(())
    }
}
