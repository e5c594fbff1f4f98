// Colored terminal output for the aggregated feed.
//
// This module handles all terminal-specific formatting. One display entry
// becomes one card: attribution header (repost groups only), author line,
// body, embedded quote, counters.

use chrono::Utc;
use colored::Colorize;

use crate::feed::attribution::attribution_line;
use crate::feed::{ActivityRow, DisplayEntry};

const BODY_MAX_CHARS: usize = 280;
const QUOTE_MAX_CHARS: usize = 140;

/// Display an aggregated feed.
pub fn display_feed(entries: &[DisplayEntry], viewer_id: Option<&str>) {
    if entries.is_empty() {
        println!("Nothing to show. Run `unifeed sync` or pass --file.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Feed ({} entries) ===", entries.len()).bold()
    );

    for entry in entries {
        println!();
        display_entry(entry, viewer_id);
    }
    println!();
}

/// Display a single card.
pub fn display_entry(entry: &DisplayEntry, viewer_id: Option<&str>) {
    if let Some(header) = attribution_line(entry, viewer_id) {
        println!("  {} {}", "⟲".green(), header.green());
    }

    if entry.is_stub() {
        println!("  {}", "Original post unavailable".dimmed().italic());
        return;
    }

    let main = &entry.main;
    println!("  {}", author_line(main));

    let text = main.text();
    if !text.is_empty() {
        println!("  {}", truncate_body(text, BODY_MAX_CHARS));
    }
    if let Some(url) = main.image_url.as_deref().filter(|u| !u.trim().is_empty()) {
        println!("  {} {}", "[image]".cyan(), url.dimmed());
    }

    if entry.quoted_post_missing() {
        println!("    {}", "│ Original post unavailable".dimmed().italic());
    } else if let Some(quoted) = main.original_post.as_deref() {
        println!("    {} {}", "│".dimmed(), author_line(quoted));
        let preview = truncate_body(quoted.text(), QUOTE_MAX_CHARS);
        if !preview.is_empty() {
            println!("    {} {}", "│".dimmed(), preview.dimmed());
        }
    }

    println!(
        "  {}",
        format!(
            "♥ {}  💬 {}  ⟲ {}",
            main.likes, main.comments, main.shares
        )
        .dimmed()
    );
}

fn author_line(row: &ActivityRow) -> String {
    let name = match &row.author {
        Some(author) => author.display_name(),
        None => row.author_identity().to_string(),
    };
    let official = if row.author.as_ref().is_some_and(|a| a.is_official) {
        format!(" {}", "[official]".blue())
    } else {
        String::new()
    };
    let age = super::format_age(row.created_at, Utc::now());
    format!("{}{} · {}", name.bold(), official, age.dimmed())
}

fn truncate_body(text: &str, max_chars: usize) -> String {
    // Cards are single-paragraph; collapse newlines before truncating.
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    super::truncate_chars(&flat, max_chars)
}
