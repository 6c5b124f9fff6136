//! HTTP plumbing for the managed backend (database RPCs, auth service, edge
//! functions). Feature clients use these helpers so every call carries the same
//! headers, timeout, and error mapping. The API key and bearer tokens are held
//! as secrets and are never logged.

pub mod auth;
mod error;
pub mod notify;
pub mod policy;

pub use auth::{AuthError, AuthProvider, AuthUser, HttpAuthProvider, Session, SignUpOutcome};
pub use error::Error;
pub use notify::{HttpNotifier, LoginAlert, Notifier};
pub use policy::{FailedLoginRecord, PolicyEngine, RpcPolicyEngine};

use crate::APP_USER_AGENT;
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

/// Default request timeout applied to every backend call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum number of error body characters kept in [`Error::Http`].
const MAX_ERROR_CHARS: usize = 200;

/// Where the backend lives and how to authenticate as the public client.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: Url,
    pub api_key: SecretString,
    pub timeout: Duration,
}

impl BackendConfig {
    /// Parses the base URL and keeps the anonymous API key.
    ///
    /// # Errors
    /// Returns [`Error::Config`] when the URL is not absolute http(s).
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, Error> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|err| Error::Config(format!("invalid backend URL: {err}")))?;

        match base_url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(Error::Config(format!(
                    "unsupported backend URL scheme: {scheme}"
                )))
            }
        }

        Ok(Self {
            base_url,
            api_key,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Shared HTTP client for all backend services.
#[derive(Clone, Debug)]
pub struct BackendClient {
    http: reqwest::Client,
    config: BackendConfig,
}

impl BackendClient {
    /// # Errors
    /// Returns [`Error::Config`] if the underlying HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|err| Error::Config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self { http, config })
    }

    /// Absolute URL for a backend path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        build_url_with_base(self.config.base_url.as_str(), path)
    }

    /// Sends a JSON body and decodes a JSON response.
    ///
    /// `bearer` overrides the API key in the `Authorization` header, used for
    /// calls made on behalf of a signed-in user.
    ///
    /// # Errors
    /// Returns the mapped transport, HTTP, or decode error.
    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        bearer: Option<&SecretString>,
    ) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .request(method, path, bearer)
            .json(body)
            .send()
            .await
            .map_err(map_request_error)?;

        handle_json_response(response).await
    }

    /// Sends a JSON body and ignores whatever the backend answers on success.
    ///
    /// # Errors
    /// Returns the mapped transport or HTTP error.
    pub async fn send_empty<B>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        bearer: Option<&SecretString>,
    ) -> Result<(), Error>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .request(method, path, bearer)
            .json(body)
            .send()
            .await
            .map_err(map_request_error)?;

        handle_empty_response(response).await
    }

    /// Posts JSON and decodes a JSON response using the API key.
    ///
    /// # Errors
    /// See [`BackendClient::send_json`].
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, body, None).await
    }

    /// Posts JSON and expects no meaningful body.
    ///
    /// # Errors
    /// See [`BackendClient::send_empty`].
    pub async fn post_json_empty<B>(&self, path: &str, body: &B) -> Result<(), Error>
    where
        B: Serialize + ?Sized,
    {
        self.send_empty(Method::POST, path, body, None).await
    }

    fn request(&self, method: Method, path: &str, bearer: Option<&SecretString>) -> RequestBuilder {
        let bearer = bearer.unwrap_or(&self.config.api_key);
        self.http
            .request(method, self.url(path))
            .header("apikey", self.config.api_key.expose_secret())
            .bearer_auth(bearer.expose_secret())
    }
}

/// Builds a URL from an explicit base URL and the provided path.
fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

/// Maps reqwest failures into [`Error`] variants with timeout detection.
fn map_request_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout("Request timed out. Please try again.".to_string())
    } else if err.is_builder() {
        Error::Serialization(format!("Failed to build request: {err}"))
    } else {
        Error::Network(format!("Unable to reach the server: {err}"))
    }
}

async fn handle_json_response<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    if response.status().is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| Error::Parse(format!("Failed to decode response: {err}")))
    } else {
        Err(http_error(response).await)
    }
}

async fn handle_empty_response(response: Response) -> Result<(), Error> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(http_error(response).await)
    }
}

async fn http_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Error::Http {
        status,
        message: sanitize_body(&body),
    }
}

/// Trims and truncates HTTP error bodies before they reach users or logs.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
