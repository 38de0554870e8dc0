//! Typed request and response shapes for the two upstream GraphQL APIs.
//!
//! The question gateway and the textbook-solution endpoint use unrelated
//! schemas. Each gets a narrow struct tree here; anything that does not fit
//! is rejected as [`QnaError::JsonParse`] instead of being walked blindly.

use serde::{Deserialize, Serialize};

use crate::{QnaError, Result};

/// Persisted query id for `QnaPageQuestionByLegacyId`.
pub const QUESTION_QUERY_HASH: &str = "26efed323ef07d1759f67adadd2832ac85d7046b7eca681fe224d7824bab0928";
pub const QUESTION_OPERATION: &str = "QnaPageQuestionByLegacyId";
pub const SOLUTION_OPERATION: &str = "getSolutionDetails";
/// Access restriction code signalling the device quota is used up.
pub const QUOTA_RESTRICTION: &str = "DEVICE_ALLOWED_QUOTA_EXCEEDED";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionQuery {
    pub operation_name: &'static str,
    pub variables: QuestionVariables,
    pub extensions: QueryExtensions,
}

#[derive(Debug, Serialize)]
pub struct QuestionVariables {
    pub id: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryExtensions {
    pub persisted_query: PersistedQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedQuery {
    pub version: u32,
    pub sha256_hash: &'static str,
}

impl QuestionQuery {
    pub fn by_legacy_id(id: u64) -> Self {
        Self {
            operation_name: QUESTION_OPERATION,
            variables: QuestionVariables { id },
            extensions: QueryExtensions {
                persisted_query: PersistedQuery { version: 1, sha256_hash: QUESTION_QUERY_HASH },
            },
        }
    }
}

/// Body for the textbook-solution endpoint. The session token rides next to the query.
#[derive(Debug, Serialize)]
pub struct SolutionQuery {
    pub query: SolutionOperation,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionOperation {
    pub operation_name: &'static str,
    pub variables: SolutionVariables,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionVariables {
    pub isbn13: String,
    pub problem_id: String,
}

impl SolutionQuery {
    pub fn new(isbn13: String, problem_id: String, token: String) -> Self {
        Self {
            query: SolutionOperation {
                operation_name: SOLUTION_OPERATION,
                variables: SolutionVariables { isbn13, problem_id },
            },
            token,
        }
    }
}

/// Top-level `errors`, which upstream sends either as a list or as one object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum GraphQlErrors {
    Many(Vec<GraphQlError>),
    One(GraphQlError),
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    #[serde(default)]
    pub message: Option<ErrorMessage>,
    #[serde(default)]
    pub extensions: Option<ErrorExtensions>,
}

/// `message` is usually text, but some gateway versions nest the extensions in it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    Text(String),
    Detail {
        #[serde(default)]
        extensions: Option<ErrorExtensions>,
    },
}

#[derive(Debug, Deserialize)]
pub struct ErrorExtensions {
    #[serde(default)]
    pub metadata: Option<ErrorMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorMetadata {
    #[serde(rename = "accessRestrictions", default)]
    pub access_restrictions: Option<OneOrMany<String>>,
}

/// A value upstream sends either bare or wrapped in a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => std::slice::from_ref(item),
        }
    }
}

impl GraphQlError {
    fn restrictions(&self) -> impl Iterator<Item = &str> {
        let nested = match &self.message {
            Some(ErrorMessage::Detail { extensions }) => extensions.as_ref(),
            _ => None,
        };
        [self.extensions.as_ref(), nested]
            .into_iter()
            .flatten()
            .filter_map(|ext| ext.metadata.as_ref())
            .filter_map(|meta| meta.access_restrictions.as_ref())
            .flat_map(|restrictions| restrictions.as_slice().iter().map(String::as_str))
    }

    fn summary(&self) -> String {
        match &self.message {
            Some(ErrorMessage::Text(text)) => text.clone(),
            Some(ErrorMessage::Detail { .. }) => "structured error".to_string(),
            None => "unknown error".to_string(),
        }
    }
}

impl GraphQlErrors {
    pub fn iter(&self) -> impl Iterator<Item = &GraphQlError> {
        let errors: &[GraphQlError] = match self {
            GraphQlErrors::Many(errors) => errors,
            GraphQlErrors::One(error) => std::slice::from_ref(error),
        };
        errors.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn quota_exceeded(&self) -> bool {
        self.iter().any(|e| e.restrictions().any(|r| r == QUOTA_RESTRICTION))
    }

    pub fn messages(&self) -> Vec<String> {
        self.iter().map(GraphQlError::summary).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct QuestionData {
    #[serde(rename = "questionByLegacyId")]
    pub question: Option<QuestionByLegacyId>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionByLegacyId {
    pub content: QuestionContent,
    #[serde(rename = "htmlAnswers", default)]
    pub html_answers: Vec<HtmlAnswer>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionContent {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct HtmlAnswer {
    #[serde(rename = "answerData")]
    pub answer_data: AnswerData,
}

#[derive(Debug, Deserialize)]
pub struct AnswerData {
    #[serde(default)]
    pub html: String,
}

/// Parsed question gateway response.
#[derive(Debug)]
pub struct QuestionResponse {
    pub errors: Option<GraphQlErrors>,
    pub question: Option<QuestionByLegacyId>,
}

impl QuestionResponse {
    /// Parses the raw body.
    ///
    /// `errors` is read before `data`: the quota restriction is looked for in
    /// the raw value first, so it is caught whatever shape the rest of the
    /// errors take. An `errors` value that fits no known shape is rejected.
    ///
    /// # Errors
    ///
    /// [`QnaError::QuotaExceeded`] when any error carries the quota restriction,
    /// [`QnaError::JsonParse`] for invalid JSON or unknown shapes.
    pub fn parse(text: &str) -> Result<Self> {
        let mut value: serde_json::Value = serde_json::from_str(text)?;

        let errors = match value.get_mut("errors").map(serde_json::Value::take) {
            None | Some(serde_json::Value::Null) => None,
            Some(raw) => {
                if mentions_quota(&raw) {
                    tracing::error!("question gateway reports device quota exceeded");
                    return Err(QnaError::QuotaExceeded);
                }
                let errors = serde_json::from_value::<GraphQlErrors>(raw)
                    .map_err(|e| QnaError::JsonParse(format!("unrecognised errors object: {}", e)))?;
                Some(errors)
            }
        };

        let question = match value.get_mut("data").map(serde_json::Value::take) {
            None | Some(serde_json::Value::Null) => None,
            Some(raw) => serde_json::from_value::<QuestionData>(raw)?.question,
        };

        Ok(Self { errors, question })
    }
}

/// True if any `accessRestrictions` below `value` names the quota code.
fn mentions_quota(value: &serde_json::Value) -> bool {
    use serde_json::Value;

    match value {
        Value::Object(map) => map.iter().any(|(key, child)| {
            let listed = match child {
                Value::String(code) => code == QUOTA_RESTRICTION,
                Value::Array(codes) => codes.iter().any(|code| code.as_str() == Some(QUOTA_RESTRICTION)),
                _ => false,
            };
            (key == "accessRestrictions" && listed) || mentions_quota(child)
        }),
        Value::Array(items) => items.iter().any(mentions_quota),
        _ => false,
    }
}

#[derive(Debug, Deserialize)]
pub struct SolutionResponse {
    pub data: SolutionData,
}

#[derive(Debug, Deserialize)]
pub struct SolutionData {
    pub textbook_solution: TextbookSolution,
}

#[derive(Debug, Deserialize)]
pub struct TextbookSolution {
    #[serde(default)]
    pub chapter: Vec<Chapter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    #[serde(default)]
    pub chapter_name: String,
    #[serde(default)]
    pub problems: Vec<Problem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    #[serde(default)]
    pub problem_name: String,
    #[serde(default)]
    pub problem_html: String,
    #[serde(rename = "solutionV2", default)]
    pub solution_v2: Vec<Solution>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub total_steps: u32,
    #[serde(default)]
    pub steps: Vec<SolutionStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolutionStep {
    pub link: String,
}

/// The first chapter, problem and solution of a solution response, flattened.
#[derive(Debug)]
pub struct SolutionDetails {
    pub chapter_name: String,
    pub problem_name: String,
    pub problem_html: String,
    pub total_steps: u32,
    pub steps: Vec<SolutionStep>,
}

impl SolutionResponse {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn into_details(self) -> Result<SolutionDetails> {
        let chapter = self
            .data
            .textbook_solution
            .chapter
            .into_iter()
            .next()
            .ok_or_else(|| QnaError::JsonParse("solution payload has no chapter".to_string()))?;
        let problem = chapter
            .problems
            .into_iter()
            .next()
            .ok_or_else(|| QnaError::JsonParse("solution payload has no problem".to_string()))?;
        let solution = problem
            .solution_v2
            .into_iter()
            .next()
            .ok_or_else(|| QnaError::JsonParse("solution payload has no solution".to_string()))?;

        Ok(SolutionDetails {
            chapter_name: chapter.chapter_name,
            problem_name: problem.problem_name,
            problem_html: problem.problem_html,
            total_steps: solution.total_steps,
            steps: solution.steps,
        })
    }
}
