//! Output path synthesis and persistence.
//!
//! File names come from a small placeholder grammar expanded once per run:
//!
//! | Placeholder            | Expands to                          |
//! |------------------------|-------------------------------------|
//! | `{random_u_str_int}`   | 10 characters from `A-Z0-9`         |
//! | `{random_u_str}`       | 10 characters from `A-Z`            |
//! | `{random_str}`         | 10 ASCII letters                    |
//! | `{random_int}`         | 10 digits                           |
//! | `{heading}`, `{title}` | slug of the page heading            |
//! | `{question_uuid}`, `{content_id}` | legacy question or problem id |
//!
//! `{{` and `}}` stand for literal braces. Anything else in braces is an error.
//!
//! # Example
//!
//! ```rust
//! use qnasnap_core::output::slugify;
//!
//! assert_eq!(slugify("Intro to Linear Algebra!"), "intro-to-linear-algebra");
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::markup::MISSING_HEADING;
use crate::render::RenderedDocument;
use crate::{QnaError, Result};

const RANDOM_LEN: usize = 10;
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const UPPER_DIGITS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid slug regex"));
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid separator regex"));

/// Turns a heading into a lowercase, hyphen-separated, filesystem-safe name.
///
/// Idempotent: `slugify(&slugify(x)) == slugify(x)`.
pub fn slugify(value: &str) -> String {
    let ascii: String = value.nfkd().filter(char::is_ascii).collect();
    let lowered = ascii.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, "");
    let collapsed = SEPARATORS.replace_all(&stripped, "-");
    collapsed.trim_matches(|c: char| c == '-' || c == '_').to_string()
}

/// One piece of a parsed name template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    RandomUpperDigits,
    RandomUpper,
    RandomLetters,
    RandomDigits,
    Slug,
    ContentId,
}

impl Segment {
    fn placeholder(name: &str) -> Option<Self> {
        match name {
            "random_u_str_int" => Some(Self::RandomUpperDigits),
            "random_u_str" => Some(Self::RandomUpper),
            "random_str" => Some(Self::RandomLetters),
            "random_int" => Some(Self::RandomDigits),
            "heading" | "title" => Some(Self::Slug),
            "question_uuid" | "content_id" => Some(Self::ContentId),
            _ => None,
        }
    }
}

/// A parsed, validated file name template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl NameTemplate {
    /// # Errors
    ///
    /// [`QnaError::InvalidNameTemplate`] for unknown or unterminated placeholders
    /// and stray `}`.
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(QnaError::InvalidNameTemplate(format!("unterminated placeholder in '{}'", source)));
                    }
                    let segment = Segment::placeholder(&name).ok_or_else(|| {
                        QnaError::InvalidNameTemplate(format!("unknown placeholder '{{{}}}' in '{}'", name, source))
                    })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                }
                '}' => {
                    return Err(QnaError::InvalidNameTemplate(format!("single '}}' in '{}'", source)));
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { source: source.to_string(), segments })
    }

    /// The default template: the slug plus `.html`.
    pub fn slug_html() -> Self {
        Self {
            source: "{heading}.html".to_string(),
            segments: vec![Segment::Slug, Segment::Literal(".html".to_string())],
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Expands every placeholder. Random tokens are drawn fresh on each call.
    pub fn expand(&self, slug: &str, content_id: Option<&str>) -> Result<String> {
        let mut rng = rand::thread_rng();
        let mut out = String::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::RandomUpperDigits => out.push_str(&random_token(&mut rng, UPPER_DIGITS)),
                Segment::RandomUpper => out.push_str(&random_token(&mut rng, UPPER)),
                Segment::RandomLetters => out.push_str(&random_token(&mut rng, LETTERS)),
                Segment::RandomDigits => out.push_str(&random_token(&mut rng, DIGITS)),
                Segment::Slug => out.push_str(slug),
                Segment::ContentId => {
                    let id = content_id.ok_or_else(|| {
                        QnaError::InvalidNameTemplate(format!("'{}' needs a content id, none available", self.source))
                    })?;
                    out.push_str(id);
                }
            }
        }

        Ok(out)
    }
}

fn random_token(rng: &mut impl Rng, charset: &[u8]) -> String {
    (0..RANDOM_LEN)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}

/// Where one run's document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub path_template: Option<String>,
    pub resolved_path: PathBuf,
}

/// Computes the output path for `heading` under `base_path`.
///
/// Template priority: `name_override`, then `saved_default`, then slug + `.html`.
/// A heading with nothing left after slugifying is replaced by the content id,
/// or by `none` when there is no id.
pub fn synthesize_path(
    base_path: &Path, heading: &str, name_override: Option<&str>, saved_default: Option<&str>,
    content_id: Option<&str>,
) -> Result<OutputDescriptor> {
    let mut slug = slugify(heading.trim().trim_matches('.').trim());
    if slug.is_empty() {
        slug = content_id.map_or_else(|| slugify(MISSING_HEADING), str::to_string);
        tracing::warn!(heading, slug = %slug, "heading has no usable characters for a file name");
    }
    let path_template = name_override.or(saved_default).map(str::to_string);
    let template = match &path_template {
        Some(source) => NameTemplate::parse(source)?,
        None => NameTemplate::slug_html(),
    };

    let file_name = template.expand(&slug, content_id)?;
    let resolved_path = base_path.join(file_name);
    tracing::debug!(template = template.source(), path = %resolved_path.display(), "output path synthesized");

    Ok(OutputDescriptor { path_template, resolved_path })
}

/// Writes the document as UTF-8, replacing whatever is at the path.
pub fn write_document(descriptor: &OutputDescriptor, document: &RenderedDocument) -> Result<PathBuf> {
    let path = &descriptor.resolved_path;
    let write_error = |source| QnaError::OutputWrite { path: path.clone(), source };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, document.html.as_bytes()).map_err(write_error)?;

    tracing::info!(path = %path.display(), bytes = document.html.len(), "document written");
    Ok(path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;
    use rstest::rstest;

    #[rstest]
    #[case("Intro to Linear Algebra!", "intro-to-linear-algebra")]
    #[case("  --Hello,   World--  ", "hello-world")]
    #[case("Crème Brûlée", "creme-brulee")]
    #[case("a_b - c", "a_b-c")]
    #[case("_leading and trailing_", "leading-and-trailing")]
    #[case("日本語", "")]
    fn test_slugify(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[rstest]
    #[case("Intro to Linear Algebra!")]
    #[case("-_ weird -- __ input _-")]
    #[case("Ünïcödé   and\ttabs")]
    #[case("x - _ - y")]
    fn test_slugify_is_idempotent_and_clean(#[case] input: &str) {
        let once = slugify(input);
        assert_eq!(slugify(&once), once);
        assert!(!once.starts_with('-') && !once.ends_with('-'));
        assert!(!once.contains("--"));
        assert!(once.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'));
    }

    #[test]
    fn test_heading_with_random_int() {
        let descriptor = synthesize_path(
            Path::new(""),
            "Intro to Linear Algebra!",
            Some("{heading}-{random_int}.html"),
            None,
            None,
        )
        .unwrap();
        let name = descriptor.resolved_path.to_string_lossy().to_string();
        assert!(Regex::new(r"^intro-to-linear-algebra-\d{10}\.html$").unwrap().is_match(&name), "{}", name);
    }

    #[test]
    fn test_template_priority() {
        let base = Path::new("out");
        let p = synthesize_path(base, "T", Some("a.html"), Some("b.html"), None).unwrap();
        assert_eq!(p.resolved_path, base.join("a.html"));
        let p = synthesize_path(base, "T", None, Some("b.html"), None).unwrap();
        assert_eq!(p.resolved_path, base.join("b.html"));
        let p = synthesize_path(base, "My Title.", None, None, None).unwrap();
        assert_eq!(p.resolved_path, base.join("my-title.html"));
        assert_eq!(p.path_template, None);
    }

    #[rstest]
    #[case("日本語の問題", Some("8125333"), "8125333.html")]
    #[case("日本語の問題", None, "none.html")]
    #[case(" ... ", None, "none.html")]
    fn test_heading_without_slug_characters(#[case] heading: &str, #[case] id: Option<&str>, #[case] expected: &str) {
        let p = synthesize_path(Path::new("out"), heading, None, None, id).unwrap();
        assert_eq!(p.resolved_path, Path::new("out").join(expected));
    }

    #[test]
    fn test_random_tokens() {
        let template = NameTemplate::parse("{random_u_str_int}_{random_u_str}_{random_str}_{random_int}").unwrap();
        let name = template.expand("s", None).unwrap();
        let re = Regex::new(r"^[A-Z0-9]{10}_[A-Z]{10}_[A-Za-z]{10}_[0-9]{10}$").unwrap();
        assert!(re.is_match(&name), "{}", name);
    }

    #[test]
    fn test_aliases_and_literal_braces() {
        let template = NameTemplate::parse("{{{title}}}-{question_uuid}-{content_id}.html").unwrap();
        assert_eq!(template.expand("slug", Some("42")).unwrap(), "{slug}-42-42.html");
    }

    #[rstest]
    #[case("{nope}.html")]
    #[case("{heading.html")]
    #[case("heading}.html")]
    fn test_invalid_templates(#[case] source: &str) {
        assert!(matches!(NameTemplate::parse(source), Err(QnaError::InvalidNameTemplate(_))));
    }

    #[test]
    fn test_content_id_required_when_used() {
        let template = NameTemplate::parse("{content_id}.html").unwrap();
        assert!(matches!(template.expand("s", None), Err(QnaError::InvalidNameTemplate(_))));
    }

    #[test]
    fn test_write_document_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = synthesize_path(dir.path(), "Page", None, None, None).unwrap();
        std::fs::write(&descriptor.resolved_path, "old").unwrap();

        let doc = RenderedDocument { html: "<html>new ü</html>".to_string() };
        let path = write_document(&descriptor, &doc).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<html>new ü</html>");
    }

    #[test]
    fn test_write_document_failure_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let descriptor = OutputDescriptor { path_template: None, resolved_path: blocker.join("page.html") };

        let err = write_document(&descriptor, &RenderedDocument { html: String::new() }).unwrap_err();
        assert!(matches!(err, QnaError::OutputWrite { ref path, .. } if path == &blocker.join("page.html")));
    }
}
