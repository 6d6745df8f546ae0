//! Implementation of `chatdex snippet`.

use std::process::ExitCode;

use chatdex_index::find_best_snippet;

use crate::cli::{args::SnippetCommand, context::CommandContext};

/// Prints the excerpt of the text that best matches the query.
pub fn run(ctx: &CommandContext, cmd: &SnippetCommand) -> ExitCode {
    let length = cmd.length.unwrap_or(ctx.config.snippet.length);
    match find_best_snippet(&cmd.text, &cmd.query, length) {
        Ok(snippet) => {
            println!("{snippet}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
