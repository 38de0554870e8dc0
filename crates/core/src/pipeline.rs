//! Main URL-to-document API.
//!
//! [`Pipeline`] runs the stages in strict order: classify, fetch, token
//! extraction, resolve, render, write. Nothing touches disk until a document
//! has been fully rendered.
//!
//! # Example
//!
//! ```rust,no_run
//! use qnasnap_core::{Pipeline, PipelineConfig, SessionContext};
//!
//! # async fn example() -> qnasnap_core::Result<()> {
//! let session = SessionContext::new("DFID=web|abc; PHPSESSID=xyz", "Mozilla/5.0")?;
//! let config = PipelineConfig::builder().base_path("out").gateway_authorization("token").build();
//! let pipeline = Pipeline::new(session, config)?;
//! let path = pipeline
//!     .url_to_document("https://www.chegg.com/homework-help/questions-and-answers/title-q8125333", None)
//!     .await?;
//! println!("saved to {}", path.display());
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::classify::{ContentKind, classify};
use crate::fetch::{FetchConfig, HttpClient};
use crate::markup::extract_session_token;
use crate::output::{OutputDescriptor, synthesize_path, write_document};
use crate::render::{RenderedDocument, Renderer};
use crate::resolve::{ResolveContext, ResolvedContent, resolve};
use crate::session::SessionContext;
use crate::template::{BuiltinTemplate, ChapterTemplate, PageTemplate};
use crate::{QnaError, Result};

/// Upstream locations. Defaults point at the live site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Origin content pages are fetched from.
    pub site_origin: String,
    pub question_graphql_url: String,
    pub solution_graphql_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            site_origin: "https://www.chegg.com".to_string(),
            question_graphql_url: "https://gateway.chegg.com/one-graph/graphql".to_string(),
            solution_graphql_url: "https://www.chegg.com/study/_ajax/persistquerygraphql".to_string(),
        }
    }
}

impl Endpoints {
    /// Every endpoint on one origin, for mirrors and local test servers.
    pub fn on_origin(origin: &str) -> Self {
        let origin = origin.trim_end_matches('/');
        Self {
            site_origin: origin.to_string(),
            question_graphql_url: format!("{}/one-graph/graphql", origin),
            solution_graphql_url: format!("{}/study/_ajax/persistquerygraphql", origin),
        }
    }
}

/// Configuration for a [`Pipeline`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Directory documents are written under (default: current directory).
    pub base_path: Option<PathBuf>,
    /// Default file name template, used when a call passes no override.
    pub save_file_format: Option<String>,
    /// Extra markup injected into the rendered `<head>`.
    pub extra_header_tag: Option<String>,
    /// Basic credential for the question gateway. Required for direct
    /// questions; there is no built-in value.
    pub gateway_authorization: Option<String>,
    /// Request timeout in seconds (default: transport default).
    pub timeout: Option<u64>,
    pub endpoints: Endpoints,
}

impl PipelineConfig {
    /// Creates a new builder for PipelineConfig.
    ///
    /// # Example
    ///
    /// ```rust
    /// use qnasnap_core::PipelineConfig;
    ///
    /// let config = PipelineConfig::builder().save_file_format("{heading}-{random_int}.html").timeout(30).build();
    /// assert_eq!(config.timeout, Some(30));
    /// ```
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }
}

/// Builder for PipelineConfig.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_path(mut self, value: impl Into<PathBuf>) -> Self {
        self.config.base_path = Some(value.into());
        self
    }

    pub fn save_file_format(mut self, value: impl Into<String>) -> Self {
        self.config.save_file_format = Some(value.into());
        self
    }

    pub fn extra_header_tag(mut self, value: impl Into<String>) -> Self {
        self.config.extra_header_tag = Some(value.into());
        self
    }

    pub fn gateway_authorization(mut self, value: impl Into<String>) -> Self {
        self.config.gateway_authorization = Some(value.into());
        self
    }

    pub fn timeout(mut self, secs: u64) -> Self {
        self.config.timeout = Some(secs);
        self
    }

    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.config.endpoints = endpoints;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

/// Everything one run produced, for inspection.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub path: PathBuf,
    pub canonical_url: String,
    pub kind: ContentKind,
    pub content: ResolvedContent,
    pub document: RenderedDocument,
    pub output: OutputDescriptor,
}

/// URL-to-document pipeline bound to one session.
///
/// Holds no mutable state; concurrent calls on a shared instance are fine.
pub struct Pipeline {
    client: HttpClient,
    config: PipelineConfig,
    base_path: PathBuf,
    renderer: Renderer,
    chapter_template: Arc<dyn ChapterTemplate>,
}

impl Pipeline {
    /// Creates the pipeline and the base output directory if it is missing.
    pub fn new(session: SessionContext, config: PipelineConfig) -> Result<Self> {
        let base_path = config.base_path.clone().unwrap_or_default();
        if !base_path.as_os_str().is_empty() && !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|source| QnaError::OutputWrite { path: base_path.clone(), source })?;
            tracing::info!(path = %base_path.display(), "created output directory");
        }

        let client = HttpClient::new(session, FetchConfig { timeout: config.timeout })?;
        let renderer = Renderer::new(Arc::new(BuiltinTemplate), config.extra_header_tag.clone());

        Ok(Self { client, config, base_path, renderer, chapter_template: Arc::new(BuiltinTemplate) })
    }

    /// Replaces the main page template.
    pub fn with_page_template(mut self, template: Arc<dyn PageTemplate>) -> Self {
        self.renderer = Renderer::new(template, self.config.extra_header_tag.clone());
        self
    }

    /// Replaces the chapter-solution answers template.
    pub fn with_chapter_template(mut self, template: Arc<dyn ChapterTemplate>) -> Self {
        self.chapter_template = template;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Saves the page behind `url` and returns the written path.
    pub async fn url_to_document(&self, url: &str, name_override: Option<&str>) -> Result<PathBuf> {
        Ok(self.url_to_parts(url, name_override).await?.path)
    }

    /// Like [`Pipeline::url_to_document`] but returns every intermediate.
    pub async fn url_to_parts(&self, url: &str, name_override: Option<&str>) -> Result<PipelineOutput> {
        let request = classify(url)?;
        tracing::info!(kind = %request.kind, url = %request.canonical_url, "classified");

        if matches!(request.kind, ContentKind::DirectQuestion { .. }) && self.config.gateway_authorization.is_none() {
            return Err(QnaError::ConfigError("gateway authorization is required for question pages".to_string()));
        }

        let page = self.client.fetch_page(&request.url_on(&self.config.endpoints.site_origin)).await?;

        let token = extract_session_token(&page.raw_html);
        if request.kind == ContentKind::ChapterSolution && token.is_none() {
            return Err(QnaError::MissingSessionToken);
        }

        let ctx = ResolveContext {
            client: &self.client,
            endpoints: &self.config.endpoints,
            gateway_authorization: self.config.gateway_authorization.as_deref(),
            chapter_template: self.chapter_template.as_ref(),
        };
        let content = resolve(ctx, &request, &page, token.as_deref()).await?;
        tracing::info!(heading = %content.heading, "content resolved");

        let document = self.renderer.render(&request.canonical_url, &content)?;

        let output = synthesize_path(
            &self.base_path,
            &content.heading,
            name_override,
            self.config.save_file_format.as_deref(),
            content.content_id.as_deref(),
        )?;
        let path = write_document(&output, &document)?;

        Ok(PipelineOutput { path, canonical_url: request.canonical_url, kind: request.kind, content, document, output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_on_origin() {
        let endpoints = Endpoints::on_origin("http://127.0.0.1:9000/");
        assert_eq!(endpoints.site_origin, "http://127.0.0.1:9000");
        assert_eq!(endpoints.question_graphql_url, "http://127.0.0.1:9000/one-graph/graphql");
        assert_eq!(endpoints.solution_graphql_url, "http://127.0.0.1:9000/study/_ajax/persistquerygraphql");
    }

    #[test]
    fn test_builder() {
        let config = PipelineConfig::builder()
            .base_path("out")
            .save_file_format("{heading}.html")
            .extra_header_tag("<meta>")
            .gateway_authorization("abc")
            .build();
        assert_eq!(config.base_path, Some(PathBuf::from("out")));
        assert_eq!(config.save_file_format.as_deref(), Some("{heading}.html"));
        assert_eq!(config.gateway_authorization.as_deref(), Some("abc"));
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn test_new_creates_base_directory() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("nested").join("out");
        let session = SessionContext::new("a=1", "ua").unwrap();
        Pipeline::new(session, PipelineConfig::builder().base_path(&base).build()).unwrap();
        assert!(base.is_dir());
    }

    #[tokio::test]
    async fn test_question_without_gateway_authorization_fails_before_network() {
        let session = SessionContext::new("a=1", "ua").unwrap();
        let config = PipelineConfig::builder().endpoints(Endpoints::on_origin("http://127.0.0.1:9")).build();
        let pipeline = Pipeline::new(session, config).unwrap();
        let result = pipeline
            .url_to_document("https://www.chegg.com/homework-help/questions-and-answers/t-q8125333", None)
            .await;
        assert!(matches!(result, Err(QnaError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_unsupported_url_fails_before_network() {
        let session = SessionContext::new("a=1", "ua").unwrap();
        let pipeline = Pipeline::new(session, PipelineConfig::default()).unwrap();
        let result = pipeline.url_to_document("https://example.com/page", None).await;
        assert!(matches!(result, Err(QnaError::UnsupportedUrl(_))));
    }
}
