//! HTTP client adapter.
//!
//! Every upstream call goes through [`HttpClient::request`], which merges the
//! session headers, issues the request once, and classifies the status. Retry
//! and backoff are left to the caller.

use std::time::Duration;

use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::markup::contains_bot_challenge;
use crate::session::SessionContext;
use crate::{QnaError, Result};

/// HTTP client configuration.
#[derive(Debug, Clone, Default)]
pub struct FetchConfig {
    /// Request timeout in seconds. `None` keeps the transport default.
    pub timeout: Option<u64>,
}

/// A fetched page body and the status it came with.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub raw_html: String,
    pub status_code: u16,
}

/// One outbound request.
#[derive(Debug, Clone)]
pub struct RequestSpec<'a> {
    pub url: &'a str,
    pub method: Method,
    /// Layered over the session's base headers; these win on conflict.
    pub headers: Vec<(&'a str, String)>,
    pub json: Option<serde_json::Value>,
    pub form: Option<Vec<(String, String)>>,
    pub expected_statuses: &'a [u16],
    /// Fail with [`QnaError::UnexpectedStatus`] instead of returning the response.
    pub fail_on_unexpected: bool,
}

impl<'a> RequestSpec<'a> {
    pub fn get(url: &'a str) -> Self {
        Self {
            url,
            method: Method::GET,
            headers: Vec::new(),
            json: None,
            form: None,
            expected_statuses: &[200],
            fail_on_unexpected: true,
        }
    }

    pub fn post(url: &'a str) -> Self {
        Self { method: Method::POST, ..Self::get(url) }
    }

    pub fn header(mut self, name: &'a str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn json_body<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.json = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn form_body(mut self, fields: Vec<(String, String)>) -> Self {
        self.form = Some(fields);
        self
    }

    pub fn expect(mut self, statuses: &'a [u16]) -> Self {
        self.expected_statuses = statuses;
        self
    }

    /// Hand back responses with unexpected statuses instead of failing.
    pub fn lenient(mut self) -> Self {
        self.fail_on_unexpected = false;
        self
    }
}

/// Session-bound HTTP client shared by every pipeline stage.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    session: SessionContext,
    config: FetchConfig,
}

impl HttpClient {
    pub fn new(session: SessionContext, config: FetchConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        let client = builder.build().map_err(QnaError::HttpError)?;
        Ok(Self { client, session, config })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Sends one request and checks its status against `spec.expected_statuses`.
    pub async fn request(&self, spec: RequestSpec<'_>) -> Result<reqwest::Response> {
        let url = Url::parse(spec.url).map_err(|e| QnaError::ConfigError(format!("invalid URL {}: {}", spec.url, e)))?;
        let headers = self.session.merged_headers(&spec.headers)?;

        tracing::debug!(method = %spec.method, url = %url, "sending request");

        let mut request = self.client.request(spec.method.clone(), url).headers(headers);
        if let Some(json) = &spec.json {
            request = request.json(json);
        }
        if let Some(form) = &spec.form {
            request = request.form(form);
        }

        let response = request.send().await.map_err(|e| self.classify_transport_error(e))?;
        let status = response.status();
        tracing::info!(status = status.as_u16(), url = spec.url, "response received");

        if !spec.expected_statuses.contains(&status.as_u16()) {
            tracing::error!(
                expected = ?spec.expected_statuses,
                status = status.as_u16(),
                url = spec.url,
                "unexpected status code"
            );
            if spec.fail_on_unexpected {
                return Err(QnaError::UnexpectedStatus { status: status.as_u16(), url: spec.url.to_string() });
            }
        }

        Ok(response)
    }

    /// GETs a content page, requiring 200 and rejecting bot interstitials.
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage> {
        let response = self.request(RequestSpec::get(url)).await?;
        let status_code = response.status().as_u16();
        let raw_html = response.text().await.map_err(|e| self.classify_transport_error(e))?;
        tracing::debug!(bytes = raw_html.len(), "page body read");

        if contains_bot_challenge(&raw_html) {
            tracing::error!(url, "bot challenge served instead of content");
            return Err(QnaError::BotChallengeDetected);
        }

        Ok(FetchedPage { raw_html, status_code })
    }

    /// Sends a request and returns the body text, which must be JSON.
    pub async fn request_text(&self, spec: RequestSpec<'_>) -> Result<String> {
        let response = self.request(spec).await?;
        let text = response.text().await.map_err(|e| self.classify_transport_error(e))?;
        tracing::debug!(bytes = text.len(), "response body read");
        Ok(text)
    }

    /// Sends a request and decodes the body into `T`.
    pub async fn request_json<T: DeserializeOwned>(&self, spec: RequestSpec<'_>) -> Result<T> {
        let text = self.request_text(spec).await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::debug!("while parsing json: {}", e);
            QnaError::from(e)
        })
    }

    fn classify_transport_error(&self, err: reqwest::Error) -> QnaError {
        match self.config.timeout {
            Some(timeout) if err.is_timeout() => QnaError::Timeout { timeout },
            _ => QnaError::HttpError(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> HttpClient {
        let session = SessionContext::new("DFID=dev; sid=1", "test-agent").unwrap();
        HttpClient::new(session, FetchConfig::default()).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        assert_eq!(FetchConfig::default().timeout, None);
    }

    #[test]
    fn test_request_spec_builders() {
        let spec = RequestSpec::post("https://a.test").header("x", "1").expect(&[200, 201]).lenient();
        assert_eq!(spec.method, Method::POST);
        assert_eq!(spec.headers, vec![("x", "1".to_string())]);
        assert_eq!(spec.expected_statuses, &[200, 201]);
        assert!(!spec.fail_on_unexpected);
    }

    #[tokio::test]
    async fn test_session_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("cookie", "DFID=dev; sid=1"))
            .and(header("user-agent", "test-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>ok</body></html>"))
            .mount(&server)
            .await;

        let page = client().fetch_page(&format!("{}/page", server.uri())).await.unwrap();
        assert_eq!(page.status_code, 200);
        assert!(page.raw_html.contains("ok"));
    }

    #[tokio::test]
    async fn test_unexpected_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let result = client().fetch_page(&server.uri()).await;
        assert!(matches!(result, Err(QnaError::UnexpectedStatus { status: 403, .. })));
    }

    #[tokio::test]
    async fn test_lenient_returns_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = server.uri();
        let response = client().request(RequestSpec::get(&url).lenient()).await.unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn test_bot_challenge_detected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"<html><body><div id="px-captcha"></div></body></html>"#),
            )
            .mount(&server)
            .await;

        let result = client().fetch_page(&server.uri()).await;
        assert!(matches!(result, Err(QnaError::BotChallengeDetected)));
    }

    #[tokio::test]
    async fn test_post_json_and_caller_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("accept", "application/json"))
            .and(body_json(serde_json::json!({"q": 1})))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .mount(&server)
            .await;

        let url = format!("{}/graphql", server.uri());
        let spec = RequestSpec::post(&url)
            .header("accept", "application/json")
            .json_body(&serde_json::json!({"q": 1}))
            .unwrap();
        let value: serde_json::Value = client().request_json(spec).await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let url = server.uri();
        let result: Result<serde_json::Value> = client().request_json(RequestSpec::post(&url)).await;
        assert!(matches!(result, Err(QnaError::JsonParse(_))));
    }
}
