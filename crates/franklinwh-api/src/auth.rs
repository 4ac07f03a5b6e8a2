// FranklinWH authentication
//
// Login is a form POST with the MD5 hex digest of the password. The API
// hands back an opaque token that every later request carries in the
// `loginToken` header. Tokens expire server-side; `Client` renews them
// through the `TokenFetcher` it was built with.

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{Envelope, LoginResult};

/// Base URL of the FranklinWH cloud API.
pub const CLOUD_BASE_URL: &str = "https://energy.franklinwh.com/";

const LOGIN_PATH: &str = "hes-gateway/terminal/initialize/appUserOrInstallerLogin";

/// Where API requests are sent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ApiTarget {
    /// The FranklinWH cloud service.
    #[default]
    Cloud,
    /// An aGate reachable on the local network.
    ///
    /// `host` may be a bare host (`192.168.1.50`, `agate.lan:8080`) or a
    /// full URL. Bare hosts are reached over plain HTTP.
    Local { host: String },
}

impl ApiTarget {
    /// Resolve the base URL for this target. Always ends with `/` so that
    /// relative endpoint paths join underneath it.
    pub fn base_url(&self) -> Result<Url, Error> {
        match self {
            Self::Cloud => Ok(Url::parse(CLOUD_BASE_URL)?),
            Self::Local { host } => {
                let host = host.trim();
                let mut raw = if host.contains("://") {
                    host.to_owned()
                } else {
                    format!("http://{host}")
                };
                if !raw.ends_with('/') {
                    raw.push('/');
                }
                Ok(Url::parse(&raw)?)
            }
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }
}

/// Obtains login tokens for one account.
pub struct TokenFetcher {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
}

impl TokenFetcher {
    pub fn new(http: reqwest::Client, base_url: Url, username: String, password: SecretString) -> Self {
        Self {
            http,
            base_url,
            username,
            password,
        }
    }

    /// Log in and return a fresh token.
    ///
    /// `POST hes-gateway/terminal/initialize/appUserOrInstallerLogin`
    /// with form fields `account`, `password` (MD5 hex), `lang`, `type`.
    pub async fn fetch_token(&self) -> Result<SecretString, Error> {
        let url = self.base_url.join(LOGIN_PATH)?;
        debug!(username = %self.username, "logging in at {}", url);

        let digest = format!("{:x}", md5::compute(self.password.expose_secret().as_bytes()));
        let form = [
            ("account", self.username.as_str()),
            ("password", digest.as_str()),
            ("lang", "en_US"),
            ("type", "1"),
        ];

        let resp = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: format!("login refused (HTTP {status})"),
            });
        }
        if !status.is_success() {
            debug!(%status, body = preview(&body), "login request failed");
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<LoginResult> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                return Err(Error::Deserialization {
                    message: format!("login response: {e}"),
                    body,
                });
            }
        };

        if envelope.code != 200 {
            return Err(Error::Authentication {
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("login rejected (code {})", envelope.code)),
            });
        }

        let token = envelope
            .result
            .map(|r| r.token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Authentication {
                message: "login response carried no token".into(),
            })?;

        debug!("login successful");
        Ok(SecretString::from(token))
    }
}

/// First 200 bytes of a response body, for error messages.
pub(crate) fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
