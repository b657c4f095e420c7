//! Receiving the token of the [implicit grant flow](https://dev.twitch.tv/docs/authentication/getting-tokens-oauth/#implicit-grant-flow).
//!
//! Twitch hands the token back in the fragment of the redirect url, which browsers never send to
//! a server. The listener answers the bare redirect with a relay page that requests the same path
//! again with the fragment moved into the query.
use std::borrow::Cow;

use log::{debug, error, info};
use tiny_http::{Header, Response, Server, StatusCode};
use twitch_oauth2::AccessToken;
use url::{form_urlencoded, Url};

/// Errors for [`ImplicitGrantHook`] and [`CallbackListener`]
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("when constructing http server")]
    TinyHttpError(#[source] Box<(dyn std::error::Error + Sync + Send + 'static)>),
    #[error("could not parse url")]
    UrlParseError(#[from] url::ParseError),
    #[error("failed to do IO operation")]
    IoError(#[from] std::io::Error),
    #[error("authorization denied: {error} - {description}")]
    Denied { error: String, description: String },
    #[error("state of the redirect does not match the login request")]
    StateMismatch,
}

/// Token handed back by twitch in the redirect fragment.
#[derive(Debug, Clone)]
pub struct ImplicitGrant {
    pub access_token: AccessToken,
    pub token_type: Option<String>,
    pub scopes: Vec<String>,
    pub state: Option<String>,
}

/// What a redirect from twitch carried.
#[derive(Debug, Clone)]
pub enum Callback {
    Token(ImplicitGrant),
    Denied { error: String, description: String },
    Empty,
}

impl Callback {
    fn from_pairs<'a>(pairs: impl Iterator<Item = (Cow<'a, str>, Cow<'a, str>)>) -> Callback {
        let mut access_token = None;
        let mut token_type = None;
        let mut scopes = vec![];
        let mut state = None;
        let mut error = None;
        let mut description = None;
        for (key, value) in pairs {
            match key.as_ref() {
                "access_token" if !value.is_empty() => access_token = Some(value.into_owned()),
                "token_type" => token_type = Some(value.into_owned()),
                "scope" => scopes = value.split_whitespace().map(String::from).collect(),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => description = Some(value.into_owned()),
                _ => {}
            }
        }
        match (access_token, error) {
            (Some(token), _) => Callback::Token(ImplicitGrant {
                access_token: AccessToken::new(token),
                token_type,
                scopes,
                state,
            }),
            (None, Some(error)) => Callback::Denied {
                error,
                description: description.unwrap_or_default(),
            },
            (None, None) => Callback::Empty,
        }
    }
}

/// Parse the fragment (or query) of a redirect, with or without its leading `#`.
pub fn parse_fragment(fragment: &str) -> Callback {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    Callback::from_pairs(form_urlencoded::parse(fragment.as_bytes()))
}

/// Parse a full redirect url as shown in the browser's address bar.
///
/// The fragment wins, the query is only looked at when the fragment carries nothing. Twitch
/// reports a denied authorization in the query.
pub fn parse_callback_url(url: &Url) -> Callback {
    match url.fragment().map(parse_fragment) {
        Some(Callback::Empty) | None => Callback::from_pairs(url.query_pairs()),
        Some(callback) => callback,
    }
}

/// Local listener for the redirect of the implicit grant flow.
///
/// Make a new [`ImplicitGrantHook`], [`listen()`](ImplicitGrantHook::listen) and send the user to
/// the authorize url, then wait for the token with
/// [`receive_grant`](CallbackListener::receive_grant).
///
/// # Example
///
/// ```rust, no_run
/// use twitch_hype_train::callback::ImplicitGrantHook;
/// use url::Url;
///
/// let hook = ImplicitGrantHook::new(Url::parse("http://localhost:10666/")?);
/// let listener = hook.listen()?;
/// let grant = listener.receive_grant(None)?;
/// # Ok::<(), Box<dyn std::error::Error + 'static>>(())
/// ```
pub struct ImplicitGrantHook {
    redirect_url: Url,
    port: u16,
}

impl ImplicitGrantHook {
    pub fn new(redirect_url: Url) -> ImplicitGrantHook {
        let port = redirect_url.port_or_known_default().unwrap_or(80);
        ImplicitGrantHook { redirect_url, port }
    }

    /// Override the implicit port for the server as given by the redirect url.
    ///
    /// Useful if the application is behind a reverse-proxy. `0` picks a free port.
    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }

    pub fn listen(self) -> Result<CallbackListener, CallbackError> {
        let server =
            Server::http(format!("0.0.0.0:{}", self.port)).map_err(CallbackError::TinyHttpError)?;
        info!(
            "waiting for the twitch redirect on port {}",
            server.server_addr().port()
        );
        Ok(CallbackListener {
            server,
            redirect_path: self.redirect_url.path().to_string(),
        })
    }
}

pub struct CallbackListener {
    server: Server,
    redirect_path: String,
}

impl CallbackListener {
    pub fn port(&self) -> u16 {
        self.server.server_addr().port()
    }

    /// Block until twitch redirects the user back with a token or an error.
    ///
    /// When `expected_state` is given, a token whose `state` differs is refused.
    pub fn receive_grant(self, expected_state: Option<&str>) -> Result<ImplicitGrant, CallbackError> {
        loop {
            let rq = match self.server.recv() {
                Ok(rq) => rq,
                Err(e) => {
                    error!("error: {}", e);
                    continue;
                }
            };
            debug!("request: {:?}", rq);
            let url = match Url::parse(&format!("http://localhost:{}{}", self.port(), rq.url())) {
                Ok(url) => url,
                Err(e) => {
                    debug!("unparsable request target {:?}: {}", rq.url(), e);
                    rq.respond(Response::from_string("KO").with_status_code(StatusCode(400)))?;
                    continue;
                }
            };
            // Check if the path the user navigated to matches the redirect url.
            if url.path() != self.redirect_path {
                rq.respond(Response::from_string("KO").with_status_code(StatusCode(404)))?;
                continue;
            }

            match Callback::from_pairs(url.query_pairs()) {
                Callback::Token(grant) => {
                    if let Some(expected) = expected_state {
                        if grant.state.as_deref() != Some(expected) {
                            rq.respond(
                                Response::from_string("Error: state mismatch")
                                    .with_status_code(StatusCode(400)),
                            )?;
                            return Err(CallbackError::StateMismatch);
                        }
                    }
                    rq.respond(html(SUCCESS_PAGE))?;
                    return Ok(grant);
                }
                Callback::Denied { error, description } => {
                    rq.respond(
                        Response::from_string(format!("Error: {} - {}", error, description))
                            .with_status_code(StatusCode(400)),
                    )?;
                    return Err(CallbackError::Denied { error, description });
                }
                Callback::Empty => {
                    rq.respond(html(RELAY_PAGE))?;
                }
            }
        }
    }
}

fn html(body: &'static str) -> Response<std::io::Cursor<Vec<u8>>> {
    let response = Response::from_string(body);
    match Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

const RELAY_PAGE: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Hype Train</title></head>
<body><p id="status">Completing login...</p>
<script>
if (window.location.hash.length > 1) {
    window.location.replace(window.location.pathname + "?" + window.location.hash.substring(1));
} else {
    document.getElementById("status").textContent = "No token in the redirect, start the login again.";
}
</script></body></html>"#;

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Hype Train</title></head>
<body><p>Logged in, you can close this tab and go back to the terminal.</p></body></html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpStream;

    #[test]
    fn token_in_fragment() {
        let url = Url::parse(
            "http://localhost:10666/#access_token=abc123&scope=channel%3Aread%3Ahype_train+bits%3Aread&state=xyz&token_type=bearer",
        )
        .unwrap();
        match parse_callback_url(&url) {
            Callback::Token(grant) => {
                assert_eq!(grant.access_token.secret(), "abc123");
                assert_eq!(grant.scopes, vec!["channel:read:hype_train", "bits:read"]);
                assert_eq!(grant.state.as_deref(), Some("xyz"));
                assert_eq!(grant.token_type.as_deref(), Some("bearer"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn error_in_query() {
        let url = Url::parse(
            "http://localhost:10666/?error=access_denied&error_description=The+user+denied+you+access&state=xyz",
        )
        .unwrap();
        match parse_callback_url(&url) {
            Callback::Denied { error, description } => {
                assert_eq!(error, "access_denied");
                assert_eq!(description, "The user denied you access");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn empty_token_is_no_token() {
        assert!(matches!(parse_fragment("#access_token="), Callback::Empty));
        assert!(matches!(parse_fragment(""), Callback::Empty));
        let url = Url::parse("http://localhost:10666/").unwrap();
        assert!(matches!(parse_callback_url(&url), Callback::Empty));
    }

    fn get(port: u16, path: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        write!(
            stream,
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        )
        .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    fn listener() -> CallbackListener {
        let mut hook = ImplicitGrantHook::new(Url::parse("http://localhost:10666/hype/").unwrap());
        hook.set_port(0);
        hook.listen().unwrap()
    }

    #[test]
    fn listener_relays_then_accepts_token() {
        let listener = listener();
        let port = listener.port();
        let handle = std::thread::spawn(move || listener.receive_grant(Some("xyz")));

        assert!(get(port, "/elsewhere").starts_with("HTTP/1.1 404"));
        assert!(get(port, "/hype/").contains("window.location.hash"));
        assert!(get(port, "/hype/?access_token=abc&state=xyz").starts_with("HTTP/1.1 200"));

        let grant = handle.join().unwrap().unwrap();
        assert_eq!(grant.access_token.secret(), "abc");
    }

    #[test]
    fn listener_survives_unparsable_target() {
        let listener = listener();
        let port = listener.port();
        let handle = std::thread::spawn(move || listener.receive_grant(None));

        assert!(get(port, "*").starts_with("HTTP/1.1 400"));
        assert!(get(port, "/hype/?access_token=abc").starts_with("HTTP/1.1 200"));

        let grant = handle.join().unwrap().unwrap();
        assert_eq!(grant.access_token.secret(), "abc");
    }

    #[test]
    fn listener_refuses_foreign_state() {
        let listener = listener();
        let port = listener.port();
        let handle = std::thread::spawn(move || listener.receive_grant(Some("xyz")));

        assert!(get(port, "/hype/?access_token=abc&state=other").starts_with("HTTP/1.1 400"));
        assert!(matches!(
            handle.join().unwrap(),
            Err(CallbackError::StateMismatch)
        ));
    }

    #[test]
    fn listener_reports_denial() {
        let listener = listener();
        let port = listener.port();
        let handle = std::thread::spawn(move || listener.receive_grant(None));

        assert!(get(port, "/hype/?error=access_denied&error_description=nope")
            .starts_with("HTTP/1.1 400"));
        assert!(matches!(
            handle.join().unwrap(),
            Err(CallbackError::Denied { .. })
        ));
    }
}
