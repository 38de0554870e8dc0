use std::sync::LazyLock;

use regex::Regex;

use super::ResolvedBody;
use crate::fetch::{HttpClient, RequestSpec};
use crate::payload::{QuestionQuery, QuestionResponse};
use crate::{QnaError, Result};

pub const ANSWERS_LIST_CLASS: &str = "answers-list";
pub const ANSWER_CLASS: &str = "answer-given-body ugc-base";

const CLIENT_NAME: &str = "chegg-web";
const CLIENT_VERSION: &str = "main-127d14c8-2503803178";

static EMBEDDED_HTML: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<html>.*?</html>").expect("valid embedded html regex"));

/// Resolves direct questions through the question gateway.
pub struct QuestionResolver<'a> {
    client: &'a HttpClient,
    endpoint: &'a str,
    authorization: &'a str,
}

impl<'a> QuestionResolver<'a> {
    pub fn new(client: &'a HttpClient, endpoint: &'a str, authorization: &'a str) -> Self {
        Self { client, endpoint, authorization }
    }

    /// Fetches the question and answers for `legacy_id`.
    ///
    /// # Errors
    ///
    /// [`QnaError::QuotaExceeded`] is returned before any markup is read when the
    /// gateway reports the device quota restriction, in any errors shape. A payload without the
    /// question object is a [`QnaError::JsonParse`].
    pub async fn resolve(&self, legacy_id: u64) -> Result<ResolvedBody> {
        tracing::info!(legacy_id, "fetching direct question");

        let spec = RequestSpec::post(self.endpoint)
            .header("authorization", format!("Basic {}", self.authorization))
            .header("content-type", "application/json")
            .header("apollographql-client-name", CLIENT_NAME)
            .header("apollographql-client-version", CLIENT_VERSION)
            .json_body(&QuestionQuery::by_legacy_id(legacy_id))?;
        let text = self.client.request_text(spec).await?;

        let (question_markup, answers_markup) = parse_question_response(&text)?;
        Ok(ResolvedBody { question_markup, answers_markup, content_id: Some(legacy_id.to_string()) })
    }
}

/// Turns a raw gateway response into question and answers markup.
fn parse_question_response(text: &str) -> Result<(String, String)> {
    let response = QuestionResponse::parse(text)?;

    if let Some(errors) = &response.errors
        && !errors.is_empty()
    {
        tracing::error!(errors = ?errors.messages(), "question gateway returned errors");
    }

    let question = response
        .question
        .ok_or_else(|| QnaError::JsonParse("response has no questionByLegacyId".to_string()))?;

    let answers_markup = if question.html_answers.is_empty() {
        tracing::warn!("no answers in payload, scanning response for embedded html");
        scan_embedded_html(text)
    } else {
        wrap_answers(question.html_answers.iter().map(|a| a.answer_data.html.as_str()))
    };

    Ok((question.content.body, answers_markup))
}

/// Wraps each answer in its container and the lot in one list, keeping order.
pub fn wrap_answers<'a>(answers: impl IntoIterator<Item = &'a str>) -> String {
    let mut html = format!(r#"<ul class="{}">"#, ANSWERS_LIST_CLASS);
    for answer in answers {
        html.push_str(&format!(r#"<div class="{}">{}</div>"#, ANSWER_CLASS, answer));
    }
    html.push_str("</ul>");
    html
}

/// Concatenates every `<html>…</html>` fragment found in `text`, verbatim.
fn scan_embedded_html(text: &str) -> String {
    EMBEDDED_HTML.find_iter(text).map(|m| m.as_str()).collect()
}
