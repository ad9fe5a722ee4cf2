use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::multipart::Form;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::errors::{PopoteError, PopoteResult};

/// Shared session-token cell.
///
/// One clone lives inside the [`ApiClient`] (read before every request,
/// written when a response carries a fresh `Authorization` header) and one in
/// the session store (written on sign-in/sign-out). Updates and reads follow
/// request/response sequencing; the lock only guards the handoff.
#[derive(Clone, Default)]
pub struct AuthToken {
    inner: Arc<Mutex<Option<String>>>,
}

impl AuthToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, token: Option<String>) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = token;
    }

    pub fn is_set(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

/// Thin wrapper over `reqwest` for the meal-planning backend.
///
/// Configures the base URL and request timeout once, injects the session
/// token into outgoing requests, and captures refreshed tokens from response
/// headers. Performs no retries; failures map onto [`PopoteError`] and
/// propagate to the caller.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: AuthToken,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, token: AuthToken) -> PopoteResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        // JSON bodies set their own content type; multipart bodies must keep
        // the boundary-bearing one the transport generates, so no
        // Content-Type default here.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &AuthToken {
        &self.token
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, self.url(path));
        if let Some(token) = self.token.get() {
            req = req.header(AUTHORIZATION, token);
        }
        req
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> PopoteResult<Response> {
        let response = req.send().await?;
        self.capture_token(&response);
        self.check_status(response).await
    }

    /// Silent token refresh: the backend rotates the JWT by returning a new
    /// `Authorization` header on any response.
    fn capture_token(&self, response: &Response) {
        if let Some(value) = response.headers().get(AUTHORIZATION) {
            if let Ok(token) = value.to_str() {
                tracing::debug!("authorization token refreshed from response header");
                self.token.set(Some(token.to_string()));
            }
        }
    }

    async fn check_status(&self, response: Response) -> PopoteResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        tracing::warn!(status = status.as_u16(), message = %message, "request failed");

        Err(match status {
            StatusCode::UNAUTHORIZED => PopoteError::Auth(message),
            StatusCode::NOT_FOUND => PopoteError::NotFound,
            StatusCode::UNPROCESSABLE_ENTITY => PopoteError::Validation(message),
            _ => PopoteError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> PopoteResult<T> {
        tracing::debug!(path = path, "GET");
        let response = self.send(self.request(Method::GET, path)).await?;
        Ok(response.json().await?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> PopoteResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(path = path, "POST");
        let response = self
            .send(self.request(Method::POST, path).json(body))
            .await?;
        Ok(response.json().await?)
    }

    /// POST whose response body the caller does not consume.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> PopoteResult<()> {
        tracing::debug!(path = path, "POST");
        self.send(self.request(Method::POST, path).json(body))
            .await?;
        Ok(())
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> PopoteResult<()> {
        tracing::debug!(path = path, "PUT");
        self.send(self.request(Method::PUT, path).json(body))
            .await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> PopoteResult<()> {
        tracing::debug!(path = path, "DELETE");
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    /// DELETE carrying a JSON body (the shopping-list remove identifies the
    /// item by name/unit rather than by path).
    pub async fn delete_with_body<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> PopoteResult<()> {
        tracing::debug!(path = path, "DELETE");
        self.send(self.request(Method::DELETE, path).json(body))
            .await?;
        Ok(())
    }

    pub async fn post_multipart_json<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> PopoteResult<T> {
        tracing::debug!(path = path, "POST multipart");
        let response = self
            .send(self.request(Method::POST, path).multipart(form))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn put_multipart(&self, path: &str, form: Form) -> PopoteResult<()> {
        tracing::debug!(path = path, "PUT multipart");
        self.send(self.request(Method::PUT, path).multipart(form))
            .await?;
        Ok(())
    }
}

/// Best-effort human-readable message from an error response body.
///
/// Tries the Devise `status.message` shape, then a JSON:API-ish `errors`
/// array, then the raw text.
fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = json
            .get("status")
            .and_then(|s| s.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
        if let Some(errors) = json.get("errors").and_then(|e| e.as_array()) {
            let joined: Vec<&str> = errors.iter().filter_map(|e| e.as_str()).collect();
            if !joined.is_empty() {
                return joined.join("\n");
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "request failed".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_cell_shared_between_clones() {
        let token = AuthToken::new();
        let clone = token.clone();
        assert!(!clone.is_set());

        token.set(Some("token123".into()));
        assert_eq!(clone.get().as_deref(), Some("token123"));

        clone.set(None);
        assert!(!token.is_set());
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let config = ClientConfig {
            base_url: "http://localhost:3000/".into(),
            ..ClientConfig::default()
        };
        let client = ApiClient::new(&config, AuthToken::new()).unwrap();
        assert_eq!(client.url("/api/v1/recipes"), "http://localhost:3000/api/v1/recipes");
    }

    #[test]
    fn error_message_prefers_devise_status_message() {
        let body = r#"{"status": {"code": 401, "message": "Invalid Email or password."}}"#;
        assert_eq!(error_message(body), "Invalid Email or password.");
    }

    #[test]
    fn error_message_joins_errors_array() {
        let body = r#"{"errors": ["Title can't be blank", "Taste is not included in the list"]}"#;
        assert_eq!(
            error_message(body),
            "Title can't be blank\nTaste is not included in the list"
        );
    }

    #[test]
    fn error_message_falls_back_to_raw_text_then_generic() {
        assert_eq!(error_message("boom"), "boom");
        assert_eq!(error_message(""), "request failed");
        assert_eq!(error_message("{\"unrelated\": true}"), "{\"unrelated\": true}");
    }
}
