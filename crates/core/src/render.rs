//! Merges resolved content into the final document.

use std::sync::Arc;

use crate::markup::final_repair;
use crate::resolve::ResolvedContent;
use crate::template::{BuiltinTemplate, PageFields, PageTemplate};
use crate::Result;

/// A finished, self-contained page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub html: String,
}

/// Renders resolved content through a page template and repairs the result.
///
/// Deterministic for identical inputs; performs no I/O.
#[derive(Clone)]
pub struct Renderer {
    template: Arc<dyn PageTemplate>,
    extra_header_tag: Option<String>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self { template: Arc::new(BuiltinTemplate), extra_header_tag: None }
    }
}

impl Renderer {
    pub fn new(template: Arc<dyn PageTemplate>, extra_header_tag: Option<String>) -> Self {
        Self { template, extra_header_tag }
    }

    pub fn render(&self, canonical_url: &str, content: &ResolvedContent) -> Result<RenderedDocument> {
        let rendered = self.template.render_page(&PageFields {
            url: canonical_url,
            headers: &content.header_markup,
            title: &content.heading,
            heading: &content.heading,
            question_body: &content.question_markup,
            answers_wrap: &content.answers_markup,
            extra_header_tag: self.extra_header_tag.as_deref(),
        })?;

        Ok(RenderedDocument { html: final_repair(&rendered)? })
    }
}
