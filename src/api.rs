//! Hype Train endpoints of Helix.
use log::debug;
use twitch_oauth2::oauth2::{HttpRequest, HttpResponse};
use url::Url;

use crate::auth::TwitchAuth;
use crate::config::ConfigError;
use crate::helix::{get_json, helix_headers, HelixError, HelixResponse};
use crate::model::HypeTrainStatus;
use crate::storage::Storage;

/// Errors for [`HypeTrainApi`]
#[derive(Debug, thiserror::Error)]
pub enum ApiError<ClientError>
where
    ClientError: std::error::Error + Send + Sync + 'static,
{
    #[error("not authenticated")]
    NotAuthenticated,
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    #[error(transparent)]
    HelixError(#[from] HelixError<ClientError>),
    #[error("could not parse url")]
    UrlParseError(#[from] url::ParseError),
}

/// Calls made on behalf of the broadcaster of a validated session.
pub struct HypeTrainApi<'a, C, S> {
    auth: &'a TwitchAuth<C, S>,
}

impl<'a, RE, C, F, S> HypeTrainApi<'a, C, S>
where
    RE: std::error::Error + Send + Sync + 'static,
    C: Copy + FnOnce(HttpRequest) -> F,
    F: std::future::Future<Output = Result<HttpResponse, RE>>,
    S: Storage,
{
    pub fn new(auth: &'a TwitchAuth<C, S>) -> Self {
        HypeTrainApi { auth }
    }

    /// `GET /hypetrain/status` for the authenticated broadcaster.
    ///
    /// An empty list means twitch has no ongoing or recent train for the channel.
    pub async fn get_hype_train_status(&self) -> Result<Vec<HypeTrainStatus>, ApiError<RE>> {
        let (token, user_id) = match (self.auth.access_token(), self.auth.user_id()) {
            (Some(token), Some(user_id)) => (token, user_id),
            _ => return Err(ApiError::NotAuthenticated),
        };
        let config = self.auth.config();
        let client_id = config.require_client_id()?;

        let mut url = Url::parse(&format!("{}/hypetrain/status", config.api_base_url))?;
        url.query_pairs_mut().append_pair("broadcaster_id", user_id);
        debug!("hype train request: {}", url);
        let headers =
            helix_headers(token, client_id).map_err(|e| ApiError::HelixError(e.into()))?;

        let response: HelixResponse<HypeTrainStatus> =
            get_json(*self.auth.client(), url, headers, "API error").await?;
        debug!("hype train events: {}", response.data.len());
        if let Some(first) = response.data.first() {
            debug!("first event: {:?}", first);
        }
        Ok(response.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::MemoryStorage;

    async fn unreachable_twitch(_: HttpRequest) -> Result<HttpResponse, std::io::Error> {
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "no network in tests",
        ))
    }

    #[tokio::test]
    async fn needs_validated_session() {
        let storage = MemoryStorage::new();
        let mut auth = TwitchAuth::new(unreachable_twitch, &storage, Config::new("cid"));
        let result = HypeTrainApi::new(&auth).get_hype_train_status().await;
        assert!(matches!(result, Err(ApiError::NotAuthenticated)));

        // a token alone is not enough, the broadcaster id comes from validation
        let url = Url::parse("http://localhost:10666/#access_token=abc").unwrap();
        auth.handle_callback::<std::io::Error>(Some(&url)).unwrap();
        let result = HypeTrainApi::new(&auth).get_hype_train_status().await;
        assert!(matches!(result, Err(ApiError::NotAuthenticated)));
    }

    async fn validating_twitch(_: HttpRequest) -> Result<HttpResponse, std::io::Error> {
        Ok(HttpResponse {
            status_code: http::StatusCode::OK,
            headers: http::HeaderMap::new(),
            body: br#"{"client_id":"cid","login":"fan","scopes":[],"user_id":"1001","expires_in":60}"#
                .to_vec(),
        })
    }

    #[tokio::test]
    async fn missing_client_id_is_a_config_error() {
        let storage = MemoryStorage::new();
        let mut auth = TwitchAuth::new(validating_twitch, &storage, Config::default());
        let url = Url::parse("http://localhost:10666/#access_token=abc").unwrap();
        auth.handle_callback::<std::io::Error>(Some(&url)).unwrap();
        auth.validate_token().await.unwrap();
        let result = HypeTrainApi::new(&auth).get_hype_train_status().await;
        assert!(matches!(
            result,
            Err(ApiError::ConfigError(ConfigError::MissingClientId))
        ));
    }
}
