//! Terminal styling and result rendering for CLI output.

use std::process::ExitCode;

use chatdex_index::{MessageDocument, SearchPage};
use comfy_table::{ContentArrangement, Table, presets::UTF8_BORDERS_ONLY};
use serde::Serialize;

/// ANSI escape codes used by the styling helpers.
mod colors {
    /// Bold text.
    pub const BOLD: &str = "\x1b[1m";
    /// Dimmed text.
    pub const DIM: &str = "\x1b[2m";
    /// Yellow foreground.
    pub const YELLOW: &str = "\x1b[33m";
    /// Reset all attributes.
    pub const RESET: &str = "\x1b[0m";
}

/// Formats text as a subheader (bold).
pub fn subheader(text: &str) -> String {
    format!("{}{}{}", colors::BOLD, text, colors::RESET)
}

/// Formats text as dimmed/less important.
pub fn dim(text: &str) -> String {
    format!("{}{}{}", colors::DIM, text, colors::RESET)
}

/// Formats text as a warning (yellow).
pub fn warning(text: &str) -> String {
    format!("{}{}{}", colors::YELLOW, text, colors::RESET)
}

/// Indents every line of `content` by three spaces.
pub fn indent_content(content: &str) -> String {
    content
        .lines()
        .map(|line| format!("   {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prints a value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize JSON: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Prints one page of search results as a table followed by a summary line.
pub fn print_page(page: &SearchPage, skip: usize) {
    if page.messages.is_empty() {
        println!("{}", dim("No results found."));
        if page.total > 0 {
            println!("{}", dim(&format!("{} total matches", page.total)));
        }
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["group", "message", "from", "time", "content"]);
    for message in &page.messages {
        table.add_row(row(message));
    }
    println!("{table}");

    let first = skip.saturating_add(1);
    let last = skip.saturating_add(page.messages.len());
    println!(
        "{}",
        dim(&format!("{first}-{last} of {} matches", page.total))
    );
}

/// Table cells for one message.
fn row(message: &MessageDocument) -> Vec<String> {
    let mut content = message.content.clone();
    for extension in &message.extensions {
        content.push_str(&format!("\n[{}] {}", extension.name, extension.value));
    }
    vec![
        message.group_id.to_string(),
        message.message_id.to_string(),
        message.from_user_id.to_string(),
        message.timestamp.clone(),
        content,
    ]
}
