//! Output formatting for streamed search events
//!
//! Human-readable lines by default, one JSON object per event with `--json`.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::search::{MatchEntry, PathCandidate, SearchEvent, SearchResult, TaskSnapshot};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON document per line
    Json,
    Text,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Print data as a single JSON line
pub fn print_json_line<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Print one streamed event
pub fn print_event(event: &SearchEvent, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json_line(event),
        OutputFormat::Text => {
            if let Some(line) = render_event(event) {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

/// Text form of an event; `None` for events only shown in the summary
pub fn render_event(event: &SearchEvent) -> Option<String> {
    match event {
        SearchEvent::PathHit(candidate) => Some(render_path_hit(candidate)),
        SearchEvent::Result(result) => Some(render_result(result)),
        SearchEvent::Warning { message } => Some(format!("warning: {}", message)),
        SearchEvent::Finished { .. } => None,
    }
}

fn render_path_hit(candidate: &PathCandidate) -> String {
    format!("path   {}", candidate.full_path)
}

fn render_result(result: &SearchResult) -> String {
    let mut out = format!("match  {}  ({})", result.full_path, result.open_url);
    for entry in &result.key_matches {
        out.push_str(&format!("\n         key   {}", render_entry(entry)));
    }
    for entry in &result.value_matches {
        out.push_str(&format!("\n         value {}", render_entry(entry)));
    }
    out
}

fn render_entry(entry: &MatchEntry) -> String {
    format!("{} = {}", entry.field_path, truncate(&entry.value, 60))
}

/// Print the final summary of a search
pub fn print_summary(snapshot: &TaskSnapshot, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json_line(&serde_json::json!({
            "type": "summary",
            "status": snapshot.status,
            "pathHits": snapshot.path_hits.len(),
            "deepResults": snapshot.deep_results.len(),
            "progress": snapshot.progress,
            "error": snapshot.error,
        })),
        OutputFormat::Text => {
            print_separator(60);
            println!("{}", render_summary(snapshot));
            Ok(())
        }
    }
}

pub fn render_summary(snapshot: &TaskSnapshot) -> String {
    let progress = &snapshot.progress;
    let mut out = format!(
        "{}: {} path hits, {} secrets with matches ({} listed, {} scanned)",
        snapshot.status,
        snapshot.path_hits.len(),
        snapshot.deep_results.len(),
        progress.units_listed,
        progress.candidates_scanned
    );
    if progress.list_failures + progress.read_failures > 0 {
        out.push_str(&format!(
            "\nskipped: {} listings, {} reads",
            progress.list_failures, progress.read_failures
        ));
    }
    if let Some(error) = &snapshot.error {
        out.push_str(&format!("\nerror: {}", error));
    }
    out
}

/// Truncate string to maximum length with ellipsis
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Print a horizontal separator line
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}
