pub mod classify;
pub mod error;
pub mod fetch;
pub mod markup;
pub mod output;
pub mod payload;
pub mod pipeline;
pub mod render;
pub mod resolve;
pub mod session;
pub mod template;

pub use classify::{CANONICAL_ORIGIN, ContentKind, ContentRequest, classify};
pub use error::{QnaError, Result};
pub use fetch::{FetchConfig, FetchedPage, HttpClient, RequestSpec};
pub use markup::{
    contains_bot_challenge, extract_heading, extract_session_token, final_repair, rewrite_protocol_relative_links,
};
pub use output::{NameTemplate, OutputDescriptor, slugify, synthesize_path, write_document};
pub use pipeline::{Endpoints, Pipeline, PipelineConfig, PipelineConfigBuilder, PipelineOutput};
pub use render::{RenderedDocument, Renderer};
pub use resolve::{ResolvedContent, resolve};
pub use session::SessionContext;
pub use template::{BuiltinTemplate, ChapterFields, ChapterTemplate, FileTemplate, PageFields, PageTemplate};
