//! URL classification.
//!
//! Maps a raw, possibly tracking-laden URL onto a canonical content URL and the
//! kind of content it addresses. Pure; no network access.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::{QnaError, Result};

/// Scheme and host every canonical URL is rebuilt on.
pub const CANONICAL_ORIGIN: &str = "https://www.chegg.com";

static QUESTION_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"chegg\.com(/homework-help/questions-and-answers/([^ ?/\n]+)-q(\d+))").expect("valid question regex")
});

static CONTENT_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"chegg\.com(/homework-help/[^?/\s]+)").expect("valid content regex"));

/// Which resolver a URL needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Single question page addressed by its numeric legacy id.
    DirectQuestion { legacy_id: u64 },
    /// Textbook solution page addressed by book/chapter/problem coordinates.
    ChapterSolution,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::DirectQuestion { legacy_id } => write!(f, "direct question {}", legacy_id),
            ContentKind::ChapterSolution => write!(f, "chapter solution"),
        }
    }
}

/// A classified URL, ready for fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub kind: ContentKind,
    /// Path part of the canonical URL, starting with `/homework-help/`.
    pub path: String,
    pub canonical_url: String,
}

impl ContentRequest {
    pub fn legacy_question_id(&self) -> Option<u64> {
        match self.kind {
            ContentKind::DirectQuestion { legacy_id } => Some(legacy_id),
            ContentKind::ChapterSolution => None,
        }
    }

    /// The page URL on another origin, used when the site is mirrored or mocked.
    pub fn url_on(&self, origin: &str) -> String {
        format!("{}{}", origin.trim_end_matches('/'), self.path)
    }
}

/// Classifies `url` into a [`ContentRequest`].
///
/// The question shape is always tried first so question URLs are never taken
/// for solution URLs.
///
/// # Errors
///
/// Returns [`QnaError::UnsupportedUrl`] if neither shape matches, or if a
/// question URL carries an id too large to address.
///
/// # Example
///
/// ```rust
/// use qnasnap_core::{ContentKind, classify};
///
/// let request = classify("https://www.chegg.com/homework-help/questions-and-answers/pick-one-q8125333?trackid=x").unwrap();
/// assert_eq!(request.kind, ContentKind::DirectQuestion { legacy_id: 8125333 });
/// ```
pub fn classify(url: &str) -> Result<ContentRequest> {
    if let Some(caps) = QUESTION_URL.captures(url) {
        let legacy_id = caps[3].parse::<u64>().map_err(|e| {
            tracing::error!(url, id = &caps[3], "question id out of range: {}", e);
            QnaError::UnsupportedUrl(url.to_string())
        })?;
        let path = caps[1].to_string();
        return Ok(ContentRequest {
            kind: ContentKind::DirectQuestion { legacy_id },
            canonical_url: format!("{}{}", CANONICAL_ORIGIN, path),
            path,
        });
    }

    if let Some(caps) = CONTENT_URL.captures(url) {
        let path = caps[1].to_string();
        return Ok(ContentRequest {
            kind: ContentKind::ChapterSolution,
            canonical_url: format!("{}{}", CANONICAL_ORIGIN, path),
            path,
        });
    }

    tracing::error!(url, "URL not supported");
    Err(QnaError::UnsupportedUrl(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_question_url() {
        let url = "https://www.chegg.com/homework-help/questions-and-answers/question--choose-random-questions-answer-possible-least-5-questions--thank-q8125333";
        let request = classify(url).unwrap();
        assert_eq!(request.kind, ContentKind::DirectQuestion { legacy_id: 8125333 });
        assert_eq!(request.legacy_question_id(), Some(8125333));
        assert_eq!(request.canonical_url, url);
    }

    #[test]
    fn test_tracking_parameters_are_dropped() {
        let request =
            classify("http://chegg.com/homework-help/questions-and-answers/some-title-q42?trackid=abc&strackid=def").unwrap();
        assert_eq!(
            request.canonical_url,
            "https://www.chegg.com/homework-help/questions-and-answers/some-title-q42"
        );
    }

    #[test]
    fn test_solution_url() {
        let request = classify(
            "https://www.chegg.com/homework-help/calculus-8th-edition-chapter-2.1-problem-5e-solution-9781285740621?x=1",
        )
        .unwrap();
        assert_eq!(request.kind, ContentKind::ChapterSolution);
        assert_eq!(request.legacy_question_id(), None);
        assert_eq!(
            request.canonical_url,
            "https://www.chegg.com/homework-help/calculus-8th-edition-chapter-2.1-problem-5e-solution-9781285740621"
        );
    }

    #[rstest]
    #[case("https://example.com/homework-help/questions-and-answers/x-q1")]
    #[case("https://www.chegg.com/flashcards/abc")]
    #[case("not a url")]
    #[case("")]
    #[case("https://www.chegg.com/homework-help/questions-and-answers/title-q99999999999999999999999")]
    #[case("https://www.chegg.com/homework-help/questions-and-answers/title-q18446744073709551616")]
    fn test_unsupported(#[case] url: &str) {
        assert!(matches!(classify(url), Err(QnaError::UnsupportedUrl(_))));
    }

    #[test]
    fn test_largest_question_id() {
        let request = classify("https://www.chegg.com/homework-help/questions-and-answers/t-q18446744073709551615").unwrap();
        assert_eq!(request.legacy_question_id(), Some(u64::MAX));
    }

    #[rstest]
    #[case("https://www.chegg.com/homework-help/questions-and-answers/title-q99")]
    #[case("https://www.chegg.com/homework-help/questions-and-answers/title-without-id")]
    #[case("https://www.chegg.com/homework-help/book-chapter-3-problem-1-solution-9780262033848")]
    fn test_canonical_url_round_trips(#[case] url: &str) {
        let first = classify(url).unwrap();
        let second = classify(&first.canonical_url).unwrap();
        assert_eq!(first.kind, second.kind);
        assert_eq!(first.canonical_url, second.canonical_url);
    }

    #[test]
    fn test_url_on_other_origin() {
        let request = classify("https://www.chegg.com/homework-help/questions-and-answers/t-q7").unwrap();
        assert_eq!(
            request.url_on("http://127.0.0.1:8080/"),
            "http://127.0.0.1:8080/homework-help/questions-and-answers/t-q7"
        );
    }
}
