//! Handles all user-facing output for the CLI.
//!
//! Snippets are serialised to stdout; warnings and the check summary are
//! coloured on stderr. Errors go through miette in
//! [`print_error`](crate::diagnostics::print_error).

use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::cli::args::OutputFormat;
use crate::diagnostics::{SnippetError, Warning};
use crate::snippet::Snippet;

/// Renders the whole snippet in the requested format.
pub fn render_snippet(snippet: &Snippet, format: OutputFormat) -> Result<String, SnippetError> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(snippet).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(snippet).map_err(|e| e.to_string()),
    };
    rendered.map_err(|message| SnippetError::Config { message })
}

/// Prints one line per warning, prefixed with the statement name.
pub fn print_warnings(name: &str, warnings: &[Warning]) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    for warning in warnings {
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
        let _ = write!(stderr, "warning");
        let _ = stderr.reset();
        let _ = writeln!(stderr, ": {name}: {warning}");
    }
}

/// Prints the totals of a `check` run.
pub fn print_summary(checked: usize, failed: usize, warned: usize) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    let color = if failed > 0 { Color::Red } else { Color::Green };
    let _ = stderr.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(stderr, "{}", if failed > 0 { "failed" } else { "ok" });
    let _ = stderr.reset();
    let _ = writeln!(
        stderr,
        ": {checked} checked, {failed} with errors, {warned} with warnings"
    );
}
