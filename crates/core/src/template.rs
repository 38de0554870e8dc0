//! Page templates.
//!
//! The pipeline treats templates as black boxes that turn named fields into
//! markup. [`BuiltinTemplate`] ships a minimal self-contained page;
//! [`FileTemplate`] loads a caller-supplied main template with `{{ name }}`
//! placeholders.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::payload::SolutionStep;
use crate::{QnaError, Result};

/// Fields accepted by the main page template.
#[derive(Debug, Clone, Copy)]
pub struct PageFields<'a> {
    pub url: &'a str,
    /// Original `<head>` markup of the fetched page.
    pub headers: &'a str,
    pub title: &'a str,
    pub heading: &'a str,
    pub question_body: &'a str,
    pub answers_wrap: &'a str,
    pub extra_header_tag: Option<&'a str>,
}

impl PageFields<'_> {
    /// Field names in the order templates see them.
    pub const NAMES: [&'static str; 7] =
        ["url", "headers", "title", "heading", "question_body", "answers_wrap", "extra_header_tag"];

    fn get(&self, name: &str) -> Option<&str> {
        match name {
            "url" => Some(self.url),
            "headers" => Some(self.headers),
            "title" => Some(self.title),
            "heading" => Some(self.heading),
            "question_body" => Some(self.question_body),
            "answers_wrap" => Some(self.answers_wrap),
            "extra_header_tag" => Some(self.extra_header_tag.unwrap_or("")),
            _ => None,
        }
    }
}

/// Fields accepted by the chapter-solution template.
#[derive(Debug, Clone, Copy)]
pub struct ChapterFields<'a> {
    pub chapter_name: &'a str,
    pub problem_name: &'a str,
    pub problem_html: &'a str,
    pub total_steps: u32,
    pub steps: &'a [SolutionStep],
}

/// Renders the final document.
pub trait PageTemplate: Send + Sync {
    fn render_page(&self, fields: &PageFields<'_>) -> Result<String>;
}

/// Renders the answers block of a chapter solution.
pub trait ChapterTemplate: Send + Sync {
    fn render_chapter(&self, fields: &ChapterFields<'_>) -> Result<String>;
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder regex"));

static HEAD_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^\s*<head[^>]*>(.*)</head>\s*$").expect("valid head regex"));

/// Escapes text for use in element content or a double-quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Built-in templates for both the page and the chapter answers block.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplate;

impl PageTemplate for BuiltinTemplate {
    fn render_page(&self, fields: &PageFields<'_>) -> Result<String> {
        let head_inner = HEAD_ELEMENT
            .captures(fields.headers)
            .and_then(|caps| caps.get(1))
            .map_or(fields.headers, |m| m.as_str());

        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
{head_inner}
<title>{title}</title>
{extra}
</head>
<body>
<header class="snapshot-source"><a href="{url}">{url_text}</a></header>
<main class="snapshot">
<h1 class="snapshot-heading">{heading}</h1>
<section class="question-body">{question}</section>
<section class="answers-wrap">{answers}</section>
</main>
</body>
</html>
"#,
            head_inner = head_inner.trim(),
            title = escape_html(fields.title),
            extra = fields.extra_header_tag.unwrap_or(""),
            url = escape_html(fields.url),
            url_text = escape_html(fields.url),
            heading = escape_html(fields.heading),
            question = fields.question_body,
            answers = fields.answers_wrap,
        ))
    }
}

impl ChapterTemplate for BuiltinTemplate {
    fn render_chapter(&self, fields: &ChapterFields<'_>) -> Result<String> {
        let mut html = String::new();
        html.push_str(r#"<div class="chapter-solution">"#);
        html.push_str(&format!(
            r#"<h2 class="chapter-problem">Chapter {}, Problem {}</h2>"#,
            escape_html(fields.chapter_name),
            escape_html(fields.problem_name)
        ));
        html.push_str(&format!(r#"<div class="problem-html">{}</div>"#, fields.problem_html));
        html.push_str(&format!(r#"<ol class="solution-steps" data-total-steps="{}">"#, fields.total_steps));

        for (i, step) in fields.steps.iter().enumerate() {
            html.push_str(&format!(
                r#"<li class="solution-step"><p class="step-label">Step {} of {}</p><iframe class="step-frame" src="{}" loading="lazy"></iframe></li>"#,
                i + 1,
                fields.total_steps,
                escape_html(&step.link)
            ));
        }

        html.push_str("</ol></div>");
        Ok(html)
    }
}

/// A main page template loaded from text with `{{ name }}` placeholders.
///
/// Placeholders are checked once at load time; values are inserted verbatim.
#[derive(Debug, Clone)]
pub struct FileTemplate {
    source: String,
}

impl FileTemplate {
    pub fn from_source(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        for caps in PLACEHOLDER.captures_iter(&source) {
            let name = &caps[1];
            if !PageFields::NAMES.contains(&name) {
                return Err(QnaError::Template(format!(
                    "unknown placeholder '{}', expected one of {:?}",
                    name,
                    PageFields::NAMES
                )));
            }
        }
        Ok(Self { source })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .map_err(|e| QnaError::Template(format!("cannot read {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loaded page template");
        Self::from_source(source)
    }
}

impl PageTemplate for FileTemplate {
    fn render_page(&self, fields: &PageFields<'_>) -> Result<String> {
        let rendered = PLACEHOLDER.replace_all(&self.source, |caps: &Captures| {
            fields.get(&caps[1]).unwrap_or_default().to_string()
        });
        Ok(rendered.into_owned())
    }
}
