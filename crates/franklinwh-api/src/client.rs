// FranklinWH API HTTP client
//
// Wraps `reqwest::Client` with gateway-scoped URL construction, envelope
// unwrapping, and login-token management. Endpoint groups (stats, switches,
// mode) are implemented as inherent methods in separate files to keep this
// module focused on transport mechanics.

use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::{ApiTarget, TokenFetcher, preview};
use crate::error::Error;
use crate::models::Envelope;
use crate::transport::{TlsMode, TransportConfig};

const TOKEN_HEADER: &str = "loginToken";

/// Authenticated client for one FranklinWH gateway.
///
/// Every request carries the current login token. When the API reports
/// the token as expired, the client logs in again and retries the request
/// once before giving up with [`Error::TokenExpired`].
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    gateway_id: String,
    fetcher: TokenFetcher,
    token: RwLock<Option<SecretString>>,
}

impl Client {
    /// Build a client for `target` and log in.
    ///
    /// Local targets accept self-signed certificates.
    pub async fn connect(
        target: &ApiTarget,
        username: &str,
        password: SecretString,
        gateway_id: &str,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut transport = transport.clone();
        if target.is_local() {
            transport.tls = TlsMode::DangerAcceptInvalid;
        }
        let http = transport.build_client()?;
        let client = Self::with_client(http, target.base_url()?, username, password, gateway_id);
        client.refresh_token().await?;
        Ok(client)
    }

    /// Build a client around a pre-built `reqwest::Client` without logging in.
    ///
    /// The first request triggers the login.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: &str,
        password: SecretString,
        gateway_id: &str,
    ) -> Self {
        let fetcher = TokenFetcher::new(http.clone(), base_url.clone(), username.to_owned(), password);
        Self {
            http,
            base_url,
            gateway_id: gateway_id.to_owned(),
            fetcher,
            token: RwLock::new(None),
        }
    }

    /// The gateway (aGate serial) this client talks to.
    pub fn gateway_id(&self) -> &str {
        &self.gateway_id
    }

    // ── Token management ─────────────────────────────────────────────

    /// Log in again and replace the stored token.
    pub async fn refresh_token(&self) -> Result<(), Error> {
        let token = self.fetcher.fetch_token().await?;
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(())
    }

    fn current_token(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ── URL builders ─────────────────────────────────────────────────

    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and unwrap the envelope.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, Error> {
        let url = self.url(path)?;
        debug!("GET {}", url);
        self.execute(|http| http.get(url.clone()).query(query)).await
    }

    /// Send a POST request with JSON body and unwrap the envelope.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Option<T>, Error> {
        let url = self.url(path)?;
        debug!("POST {}", url);
        self.execute(|http| http.post(url.clone()).json(body)).await
    }

    /// Send a POST request whose parameters travel in the query string.
    pub(crate) async fn post_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, Error> {
        let url = self.url(path)?;
        debug!("POST {}", url);
        self.execute(|http| http.post(url.clone()).query(query)).await
    }

    /// Attach the token, send, and parse. Retries once after a token refresh.
    async fn execute<T, F>(&self, build: F) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        if self.current_token().is_none() {
            self.refresh_token().await?;
        }

        match self.send_once(&build).await {
            Err(Error::TokenExpired) => {
                warn!("login token rejected, logging in again");
                self.refresh_token().await?;
                self.send_once(&build).await
            }
            other => other,
        }
    }

    async fn send_once<T, F>(&self, build: &F) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut builder = build(&self.http);
        if let Some(token) = self.current_token() {
            builder = builder.header(TOKEN_HEADER, token.expose_secret());
        }
        let resp = builder.send().await.map_err(Error::Transport)?;
        Self::parse_envelope(resp).await
    }

    /// Parse the `{ code, message, result }` envelope.
    ///
    /// HTTP 401 and envelope code 401 both mean the token is no longer
    /// accepted. Any other non-200 code is an [`Error::Api`].
    async fn parse_envelope<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<Option<T>, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::TokenExpired);
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            debug!(%status, body = preview(&body), "request failed");
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        trace!(body = preview(&body), "response body");

        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(body = preview(&body), "unparseable response body");
                return Err(Error::Deserialization {
                    message: e.to_string(),
                    body,
                });
            }
        };

        match envelope.code {
            200 => Ok(envelope.result),
            401 => Err(Error::TokenExpired),
            code => Err(Error::Api {
                code,
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("code={code}")),
            }),
        }
    }
}
