use owo_colors::OwoColorize;
use qnasnap_core::PipelineOutput;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "qnasnap".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Save question pages as offline HTML\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print what a run resolved, for `--print-parts`
pub fn print_parts(parts: &PipelineOutput) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Resolved Content".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    eprintln!("  {} {}", "Kind:".dimmed(), parts.kind.to_string().bright_white());
    eprintln!("  {} {}", "URL:".dimmed(), parts.canonical_url.bright_white());
    eprintln!("  {} {}", "Heading:".dimmed(), parts.content.heading.bright_white());
    eprintln!(
        "  {} {}",
        "Content id:".dimmed(),
        parts.content.content_id.as_deref().unwrap_or("-").bright_white()
    );
    eprintln!(
        "  {} {}",
        "Name template:".dimmed(),
        parts.output.path_template.as_deref().unwrap_or("<slug>.html").bright_white()
    );
    eprintln!("  {} {}\n", "Size:".dimmed(), format_size(parts.document.html.len()).bright_white());
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
