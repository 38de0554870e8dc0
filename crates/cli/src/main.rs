mod config;
mod echo;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use qnasnap_core::{Endpoints, FileTemplate, Pipeline, PipelineConfig, SessionContext, classify};
use tracing_subscriber::EnvFilter;

use config::{DEFAULT_COOKIE_FILE, DEFAULT_USER_AGENT, FileConfig, load_cookie_file};
use echo::{print_banner, print_error, print_info, print_parts, print_step, print_success, print_warning};

const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Save a homework-help question or textbook solution page as offline HTML
#[derive(Parser, Debug)]
#[command(name = "qnasnap")]
#[command(version)]
#[command(about = "Save homework-help pages as self-contained HTML", long_about = None)]
struct Args {
    /// Question or textbook-solution URL
    #[arg(value_name = "URL")]
    url: String,

    /// Cookie file: browser JSON export or raw "k=v; k=v" header
    #[arg(short, long, value_name = "FILE")]
    cookie: Option<PathBuf>,

    /// File name template, e.g. "{heading}-{random_int}.html"
    #[arg(short, long, value_name = "FORMAT")]
    save: Option<String>,

    /// Directory documents are written under
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Config file (default: <config dir>/qnasnap/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// User-Agent sent with every request
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Main page template with {{ name }} placeholders
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Basic credential for the question gateway
    #[arg(long, value_name = "TOKEN")]
    gateway_authorization: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print what was resolved after saving
    #[arg(long)]
    print_parts: bool,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "qnasnap=debug,qnasnap_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let request = classify(&args.url).context("Failed to classify URL")?;

    let file = FileConfig::load(args.config.as_deref())?;

    if args.verbose {
        print_step(1, 3, "Loading session");
    }
    let cookie_path = args.cookie.or(file.cookie_file).unwrap_or_else(|| PathBuf::from(DEFAULT_COOKIE_FILE));
    let cookie = load_cookie_file(&cookie_path)?;
    let user_agent = args.user_agent.or(file.user_agent).unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
    let session = SessionContext::new(&cookie, &user_agent).context("Failed to parse cookie")?;
    if args.verbose && session.device_fingerprint().is_none() {
        print_warning("Cookie has no DFID entry");
    }

    let gateway_authorization = args.gateway_authorization.or(file.gateway_authorization);

    let mut builder = PipelineConfig::builder().timeout(args.timeout.or(file.timeout).unwrap_or(DEFAULT_TIMEOUT_SECS));
    if let Some(base) = args.output_dir.or(file.base_path) {
        builder = builder.base_path(base);
    }
    if let Some(format) = file.save_file_format {
        builder = builder.save_file_format(format);
    }
    if let Some(tag) = file.extra_header_tag {
        builder = builder.extra_header_tag(tag);
    }
    if let Some(token) = gateway_authorization {
        builder = builder.gateway_authorization(token);
    }
    if let Some(origin) = file.site_origin {
        builder = builder.endpoints(Endpoints::on_origin(&origin));
    }

    let mut pipeline = Pipeline::new(session, builder.build()).context("Failed to set up pipeline")?;
    if let Some(path) = args.template.or(file.template) {
        let template = FileTemplate::from_file(&path)
            .with_context(|| format!("Failed to load template: {}", path.display()))?;
        pipeline = pipeline.with_page_template(Arc::new(template));
    }

    if args.verbose {
        print_step(2, 3, &format!("Resolving {}", request.canonical_url.bright_white().underline()));
    }
    let parts = pipeline
        .url_to_parts(&args.url, args.save.as_deref())
        .await
        .with_context(|| format!("Failed to save {}", request.canonical_url))?;

    if args.verbose {
        print_step(3, 3, "Written");
    }
    if args.print_parts {
        print_parts(&parts);
    }
    if args.verbose {
        print_success(&format!("Saved to {}", parts.path.display().bright_white()));
    }

    println!("{}", parts.path.display());
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(err) = run(args).await {
        print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}
