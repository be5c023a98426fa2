//! Authenticated JSON/multipart transport to the CMS backend.
//!
//! Every request carries the stored bearer token. A 401 on a non-public path
//! evicts the token and surfaces as [`ApiError::Unauthorized`]; other failures
//! keep the server's own message when the error body has one.

use std::sync::Arc;

use cms_admin_core::error::ApiError;
use cms_admin_core::payload::{FormPayload, PartValue};
use http::{Method, StatusCode};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::token::TokenStore;

const OCTET_STREAM: &str = "application/octet-stream";

/// Shared HTTP transport. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    tokens: Arc<TokenStore>,
}

impl ApiClient {
    /// Builds the transport with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: Arc<ClientConfig>, tokens: Arc<TokenStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        Ok(Self { http, config, tokens })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Absolute URL of an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// `GET` returning the unwrapped JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        self.execute(Method::GET, path, None).await
    }

    /// `POST` of a multipart body returning the unwrapped JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn post_multipart(
        &self,
        path: &str,
        payload: FormPayload,
    ) -> Result<Value, ApiError> {
        let form = to_multipart(payload)?;
        self.execute(Method::POST, path, Some(form)).await
    }

    /// `DELETE`, ignoring any body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`].
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(Method::DELETE, path, None).await.map(|_| ())
    }

    /// Sends one request and interprets the response.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Transport`] when no response arrives (including timeouts).
    /// - [`ApiError::Unauthorized`] for a 401 on a non-public path; the token is evicted.
    /// - [`ApiError::Status`] for any other non-success status.
    /// - [`ApiError::Decode`] when a success body is not JSON.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        form: Option<Form>,
    ) -> Result<Value, ApiError> {
        let url = self.url(path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header("Accept", "application/json");
        if let Some(token) = self.tokens.get() {
            request = request.bearer_auth(token);
        }
        if let Some(form) = form {
            request = request.multipart(form);
        }

        debug!(%method, %url, "request");
        let response = request.send().await.map_err(|err| {
            warn!(%method, %url, error = %err, "request failed");
            ApiError::Transport(err.to_string())
        })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        if status == StatusCode::UNAUTHORIZED && !self.config.is_public(path) {
            warn!(%method, %url, "unauthorized, evicting token");
            if let Err(err) = self.tokens.evict().await {
                warn!(error = %err, "token eviction failed");
            }
            return Err(ApiError::Unauthorized {
                redirect: self.config.login_route.clone(),
            });
        }

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| error_message(&value))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());
            warn!(%method, %url, status = status.as_u16(), %message, "request rejected");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        let value: Value =
            serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))?;
        Ok(unwrap_data(value))
    }
}

/// Converts an ordered payload into a multipart form.
///
/// # Errors
///
/// Returns [`ApiError::Transport`] if a part's content type is rejected.
pub fn to_multipart(payload: FormPayload) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for part in payload.into_parts() {
        form = match part.value {
            PartValue::Text(text) => form.text(part.name, text),
            PartValue::File(upload) => {
                let mime = if upload.content_type.parse::<mime_guess::mime::Mime>().is_ok() {
                    upload.content_type.clone()
                } else {
                    OCTET_STREAM.to_string()
                };
                let file = Part::bytes(upload.bytes)
                    .file_name(upload.file_name)
                    .mime_str(&mime)
                    .map_err(|err| ApiError::Transport(err.to_string()))?;
                form.part(part.name, file)
            }
        };
    }
    Ok(form)
}

/// Strips a `{"data": ...}` envelope. An object with its own `id` is an
/// entity, not an envelope, and is returned as is.
#[must_use]
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") && !map.contains_key("id") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Server-provided error text: `message`, else the first entry of `errors`.
#[must_use]
pub fn error_message(body: &Value) -> Option<String> {
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        if !message.trim().is_empty() {
            return Some(message.to_string());
        }
    }
    let first = match body.get("errors")? {
        Value::Object(map) => map.values().next()?,
        Value::Array(items) => items.first()?,
        other => other,
    };
    match first {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_is_unwrapped() {
        assert_eq!(unwrap_data(json!({"data": [1, 2]})), json!([1, 2]));
        assert_eq!(
            unwrap_data(json!({"data": [], "current_page": 1})),
            json!([])
        );
        let entity = json!({"id": 1, "data": "x"});
        assert_eq!(unwrap_data(entity.clone()), entity);
        assert_eq!(unwrap_data(json!([{"id": 1}])), json!([{"id": 1}]));
    }

    #[test]
    fn error_message_sources() {
        assert_eq!(
            error_message(&json!({"message": "Nope"})).as_deref(),
            Some("Nope")
        );
        assert_eq!(
            error_message(&json!({"message": "", "errors": {"title": ["Title taken"]}})).as_deref(),
            Some("Title taken")
        );
        assert_eq!(
            error_message(&json!({"errors": ["First", "Second"]})).as_deref(),
            Some("First")
        );
        assert_eq!(error_message(&json!({"ok": false})), None);
    }

    #[test]
    fn url_joins_without_double_slash() {
        let config = ClientConfig {
            api_base_url: "https://cms.test/api/".into(),
            ..ClientConfig::default()
        };
        let client = ApiClient::new(
            Arc::new(config),
            Arc::new(TokenStore::open("/nonexistent/token")),
        )
        .unwrap();
        assert_eq!(client.url("/news/1"), "https://cms.test/api/news/1");
    }
}
