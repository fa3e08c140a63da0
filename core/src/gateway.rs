//! HTTP gateway: the only channel to the backend.
//!
//! Responsibilities:
//! - attach the session credential as a bearer header when one is present
//! - classify every failure into an [`ErrorKind`]
//! - tear the session down on HTTP 401, before the error is returned
//!
//! The gateway holds no per-call mutable state, so one instance serves any
//! number of concurrent requests.

use std::sync::Arc;

use reqwest::Method;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::config::ConfigError;
use crate::error::ApiError;
use crate::error::ApiResult;
use crate::error::ErrorKind;
use crate::session::SessionStore;

const SESSION_CHANGED_MESSAGE: &str = "Session changed during request. Please log in.";

/// Shared HTTP gateway.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl HttpGateway {
    /// Builds a gateway with the configured base URL and request deadline.
    pub fn new(config: &ClientConfig, session: Arc<SessionStore>) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("solguard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self::with_client(client, &config.api_base_url, session))
    }

    /// Uses a caller-supplied client.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        session: Arc<SessionStore>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issues one request and returns the JSON body (`Null` for an empty body).
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> ApiResult<Value> {
        let bytes = self.send(method, path, &[], body).await?;
        body_as_value(&bytes)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let bytes = self.send(Method::GET, path, &[], None).await?;
        decode(path, &bytes)
    }

    /// GET with query parameters. Pairs with `None` values are left out.
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, Option<String>)],
    ) -> ApiResult<T> {
        let bytes = self.send(Method::GET, path, query, None).await?;
        decode(path, &bytes)
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let body = encode(body)?;
        let bytes = self.send(Method::POST, path, &[], Some(&body)).await?;
        decode(path, &bytes)
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let body = encode(body)?;
        let bytes = self.send(Method::PUT, path, &[], Some(&body)).await?;
        decode(path, &bytes)
    }

    /// DELETE; the response body, if any, is ignored.
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        self.send(Method::DELETE, path, &[], None).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, Option<String>)],
        body: Option<&Value>,
    ) -> ApiResult<Vec<u8>> {
        let issued = self.session.snapshot();
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.request(method.clone(), &url);
        if let Some(token) = &issued.token {
            request = request.bearer_auth(token);
        }
        let query: Vec<(&str, &str)> = query
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (*k, v)))
            .collect();
        if !query.is_empty() {
            request = request.query(&query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return Err(transport_failure(&method, path, &err)),
        };
        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(err) => return Err(transport_failure(&method, path, &err)),
        };
        tracing::debug!(%method, path, status = status.as_u16(), "response received");

        if status == StatusCode::UNAUTHORIZED {
            // A 401 for a credential that has since been replaced says nothing
            // about the current session.
            if self.session.logout_if_epoch(issued.epoch) {
                tracing::info!(%method, path, "authentication rejected, session cleared");
            }
            return Err(ApiError::from_response(
                ErrorKind::Unauthorized,
                status,
                &bytes,
            ));
        }

        if self.session.epoch() != issued.epoch {
            tracing::debug!(%method, path, "discarding response issued under a previous session");
            return Err(ApiError::with_message(
                ErrorKind::Unauthorized,
                SESSION_CHANGED_MESSAGE,
            ));
        }

        if let Some(kind) = ErrorKind::from_status(status) {
            let err = ApiError::from_response(kind, status, &bytes);
            tracing::warn!(%method, path, status = status.as_u16(), kind = %kind, "request failed");
            return Err(err);
        }
        if !status.is_success() {
            tracing::warn!(%method, path, status = status.as_u16(), "unexpected status");
            return Err(ApiError::new(ErrorKind::ServerError).with_status(status.as_u16()));
        }

        Ok(bytes)
    }
}

fn transport_failure(method: &Method, path: &str, err: &reqwest::Error) -> ApiError {
    if err.is_timeout() {
        tracing::warn!(%method, path, "request timed out");
    } else {
        tracing::warn!(%method, path, "request failed without a response: {err}");
    }
    ApiError::new(ErrorKind::Network)
}

fn encode<B: Serialize>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|e| {
        ApiError::with_message(
            ErrorKind::Validation,
            format!("Request body could not be encoded: {e}"),
        )
    })
}

fn decode<T: DeserializeOwned>(path: &str, bytes: &[u8]) -> ApiResult<T> {
    let value = body_as_value(bytes)?;
    serde_json::from_value(value).map_err(|e| {
        tracing::warn!(path, "unexpected response shape: {e}");
        ApiError::new(ErrorKind::ServerError)
    })
}

fn body_as_value(bytes: &[u8]) -> ApiResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::warn!("response body is not JSON: {e}");
        ApiError::new(ErrorKind::ServerError)
    })
}
