//! Content resolvers.
//!
//! A fetched page is turned into a [`ResolvedContent`] by exactly one of two
//! strategies, picked by [`ContentKind`]:
//!
//! - [`QuestionResolver`] for direct questions, via the question gateway
//! - [`SolutionResolver`] for chapter solutions, via the textbook-solution API
//!
//! Both make a single upstream call and return the same four-field shape so
//! rendering does not care which one ran.

mod question;
mod solution;

pub use question::{ANSWER_CLASS, ANSWERS_LIST_CLASS, QuestionResolver, wrap_answers};
pub use solution::{SolutionIds, SolutionResolver};

use scraper::Html;

use crate::classify::{ContentKind, ContentRequest};
use crate::fetch::{FetchedPage, HttpClient};
use crate::markup::{extract_head, extract_heading, rewrite_protocol_relative_links};
use crate::pipeline::Endpoints;
use crate::template::ChapterTemplate;
use crate::{QnaError, Result};

/// Everything the renderer needs from one page.
///
/// `heading` is never empty; it falls back to the page title and finally to
/// the literal `"None"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    pub header_markup: String,
    pub heading: String,
    pub question_markup: String,
    pub answers_markup: String,
    /// Legacy question id or problem id, for output naming.
    pub content_id: Option<String>,
}

/// Question and answers markup produced by one resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBody {
    pub question_markup: String,
    pub answers_markup: String,
    pub content_id: Option<String>,
}

/// Shared inputs for a resolver run.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub client: &'a HttpClient,
    pub endpoints: &'a Endpoints,
    pub gateway_authorization: Option<&'a str>,
    pub chapter_template: &'a dyn ChapterTemplate,
}

/// Resolves `page` into renderable content using the strategy for `request.kind`.
///
/// `token` is the session token scraped from `page`; only chapter solutions need it.
pub async fn resolve(
    ctx: ResolveContext<'_>, request: &ContentRequest, page: &FetchedPage, token: Option<&str>,
) -> Result<ResolvedContent> {
    let html = rewrite_protocol_relative_links(&page.raw_html);
    let (header_markup, heading) = head_and_heading(&html);

    let body = match request.kind {
        ContentKind::DirectQuestion { legacy_id } => {
            let authorization = ctx.gateway_authorization.ok_or_else(|| {
                QnaError::ConfigError("gateway authorization is required for question pages".to_string())
            })?;
            QuestionResolver::new(ctx.client, &ctx.endpoints.question_graphql_url, authorization)
                .resolve(legacy_id)
                .await?
        }
        ContentKind::ChapterSolution => {
            let token = token.ok_or(QnaError::MissingSessionToken)?;
            SolutionResolver::new(ctx.client, &ctx.endpoints.solution_graphql_url, ctx.chapter_template)
                .resolve(&html, token)
                .await?
        }
    };

    Ok(ResolvedContent {
        header_markup,
        heading,
        question_markup: rewrite_protocol_relative_links(&body.question_markup),
        answers_markup: rewrite_protocol_relative_links(&body.answers_markup),
        content_id: body.content_id,
    })
}

/// Parses once for `<head>` and heading; the DOM is dropped before any await.
fn head_and_heading(html: &str) -> (String, String) {
    let document = Html::parse_document(html);
    (extract_head(&document), extract_heading(&document))
}
