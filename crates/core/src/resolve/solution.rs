use std::sync::LazyLock;

use regex::Regex;

use super::ResolvedBody;
use crate::fetch::{HttpClient, RequestSpec};
use crate::payload::{SolutionQuery, SolutionResponse};
use crate::template::{ChapterFields, ChapterTemplate};
use crate::{QnaError, Result};

/// Chapter solutions have no discrete question body.
const EMPTY_QUESTION: &str = "<div></div>";

static ISBN13: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""isbn13":"(\d+)""#).expect("valid isbn regex"));
static PROBLEM_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""problemId":"(\d+)""#).expect("valid problem id regex"));

/// Book and problem coordinates scraped from a solution page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionIds {
    pub isbn13: String,
    pub problem_id: String,
}

impl SolutionIds {
    /// # Errors
    ///
    /// [`QnaError::MalformedPage`] naming the first identifier that is missing.
    pub fn scrape(html: &str) -> Result<Self> {
        let isbn13 = ISBN13
            .captures(html)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| QnaError::MalformedPage("isbn13 not found in page".to_string()))?;
        let problem_id = PROBLEM_ID
            .captures(html)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| QnaError::MalformedPage("problemId not found in page".to_string()))?;
        Ok(Self { isbn13, problem_id })
    }
}

/// Resolves chapter solutions through the textbook-solution endpoint.
pub struct SolutionResolver<'a> {
    client: &'a HttpClient,
    endpoint: &'a str,
    template: &'a dyn ChapterTemplate,
}

impl<'a> SolutionResolver<'a> {
    pub fn new(client: &'a HttpClient, endpoint: &'a str, template: &'a dyn ChapterTemplate) -> Self {
        Self { client, endpoint, template }
    }

    pub async fn resolve(&self, html: &str, token: &str) -> Result<ResolvedBody> {
        let ids = SolutionIds::scrape(html)?;
        tracing::info!(isbn13 = %ids.isbn13, problem_id = %ids.problem_id, "fetching chapter solution");

        let spec = RequestSpec::post(self.endpoint)
            .header("content-type", "application/json")
            .json_body(&SolutionQuery::new(ids.isbn13, ids.problem_id.clone(), token.to_string()))?;
        let text = self.client.request_text(spec).await?;

        let answers_markup = self.render_answers(&text)?;
        Ok(ResolvedBody {
            question_markup: EMPTY_QUESTION.to_string(),
            answers_markup,
            content_id: Some(ids.problem_id),
        })
    }

    fn render_answers(&self, text: &str) -> Result<String> {
        let details = SolutionResponse::parse(text)?.into_details()?;
        tracing::debug!(total_steps = details.total_steps, steps = details.steps.len(), "solution details parsed");

        self.template.render_chapter(&ChapterFields {
            chapter_name: &details.chapter_name,
            problem_name: &details.problem_name,
            problem_html: &details.problem_html,
            total_steps: details.total_steps,
            steps: &details.steps,
        })
    }
}
