//! Plumbing shared by every call to Twitch and Helix.
//!
//! Requests go through the same client seam `twitch_oauth2` uses: any `Copy` function taking an
//! [`HttpRequest`] and returning a future of [`HttpResponse`]. The crate ships with the surf and
//! reqwest clients from `twitch_oauth2::client`, tests plug in their own.
use http::{
    header::{HeaderName, AUTHORIZATION},
    HeaderMap, HeaderValue, Method, StatusCode,
};
use log::debug;
use serde::{de::DeserializeOwned, Deserialize};
use twitch_oauth2::{
    oauth2::{HttpRequest, HttpResponse},
    AccessToken, ClientId,
};
use url::Url;

/// Errors for a single request to Twitch
#[derive(Debug, thiserror::Error)]
pub enum HelixError<ClientError>
where
    ClientError: std::error::Error + Send + Sync + 'static,
{
    #[error("request to twitch failed")]
    RequestError(#[source] ClientError),
    #[error("could not parse url")]
    UrlParseError(#[from] url::ParseError),
    #[error("invalid header value")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
    #[error("could not decode response from {url}")]
    DecodeError {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{message}")]
    Status { status: StatusCode, message: String },
}

impl<RE> HelixError<RE>
where
    RE: std::error::Error + Send + Sync + 'static,
{
    /// HTTP status returned by twitch, if the request got that far.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HelixError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error payload returned by Helix and the id endpoints on failure.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Envelope of every Helix collection response.
#[derive(Debug, Deserialize)]
pub struct HelixResponse<T> {
    pub data: Vec<T>,
}

/// Headers for Helix: `Authorization: Bearer <token>` and `Client-Id`.
pub fn helix_headers(
    token: &AccessToken,
    client_id: &ClientId,
) -> Result<HeaderMap, http::header::InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token.secret()))?,
    );
    headers.insert(
        HeaderName::from_static("client-id"),
        HeaderValue::from_str(client_id.as_str())?,
    );
    Ok(headers)
}

/// Headers for the id endpoints: `Authorization: OAuth <token>`.
pub fn oauth_headers(token: &AccessToken) -> Result<HeaderMap, http::header::InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("OAuth {}", token.secret()))?,
    );
    Ok(headers)
}

/// Send a GET request and decode a successful JSON body.
///
/// Non-2xx answers become [`HelixError::Status`] carrying the `message` of the error body, or
/// `fallback` when twitch did not send one.
pub async fn get_json<T, RE, C, F>(
    client: C,
    url: Url,
    headers: HeaderMap,
    fallback: &str,
) -> Result<T, HelixError<RE>>
where
    T: DeserializeOwned,
    RE: std::error::Error + Send + Sync + 'static,
    C: FnOnce(HttpRequest) -> F,
    F: std::future::Future<Output = Result<HttpResponse, RE>>,
{
    let url_str = url.to_string();
    let request = HttpRequest {
        url,
        method: Method::GET,
        headers,
        body: vec![],
    };
    let response = client(request).await.map_err(HelixError::RequestError)?;
    debug!("GET {} -> {}", url_str, response.status_code);

    if !response.status_code.is_success() {
        let body: ErrorBody = serde_json::from_slice(&response.body).unwrap_or_default();
        let message = body
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        return Err(HelixError::Status {
            status: response.status_code,
            message,
        });
    }

    serde_json::from_slice(&response.body).map_err(|source| HelixError::DecodeError {
        url: url_str,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Payload {
        value: u32,
    }

    async fn answer(request: HttpRequest) -> Result<HttpResponse, std::io::Error> {
        let (status, body) = match request.url.path() {
            "/ok" => (StatusCode::OK, r#"{"value": 7}"#),
            "/garbage" => (StatusCode::OK, "not json"),
            "/message" => (
                StatusCode::UNAUTHORIZED,
                r#"{"error":"Unauthorized","status":401,"message":"Invalid OAuth token"}"#,
            ),
            "/forbidden" => (StatusCode::FORBIDDEN, r#"{"error":"Forbidden","status":403}"#),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, ""),
        };
        Ok(HttpResponse {
            status_code: status,
            headers: HeaderMap::new(),
            body: body.as_bytes().to_vec(),
        })
    }

    fn url(path: &str) -> Url {
        Url::parse("http://twitch.test").unwrap().join(path).unwrap()
    }

    #[tokio::test]
    async fn decodes_success() {
        let payload: Payload = get_json(answer, url("/ok"), HeaderMap::new(), "API error")
            .await
            .unwrap();
        assert_eq!(payload.value, 7);
    }

    #[tokio::test]
    async fn error_message_from_body() {
        let err = get_json::<Payload, _, _, _>(answer, url("/message"), HeaderMap::new(), "x")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(err.to_string(), "Invalid OAuth token");
    }

    #[tokio::test]
    async fn error_falls_back_without_body() {
        let err = get_json::<Payload, _, _, _>(answer, url("/boom"), HeaderMap::new(), "API error")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API error");
    }

    #[tokio::test]
    async fn error_field_alone_is_not_the_message() {
        let err =
            get_json::<Payload, _, _, _>(answer, url("/forbidden"), HeaderMap::new(), "API error")
                .await
                .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(err.to_string(), "API error");
    }

    #[tokio::test]
    async fn undecodable_body() {
        let err = get_json::<Payload, _, _, _>(answer, url("/garbage"), HeaderMap::new(), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, HelixError::DecodeError { .. }));
    }

    #[test]
    fn builds_helix_headers() {
        let headers = helix_headers(
            &AccessToken::new("abc".to_string()),
            &ClientId::new("cid".to_string()),
        )
        .unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
        assert_eq!(headers["client-id"], "cid");
        let headers = oauth_headers(&AccessToken::new("abc".to_string())).unwrap();
        assert_eq!(headers[AUTHORIZATION], "OAuth abc");
    }
}
