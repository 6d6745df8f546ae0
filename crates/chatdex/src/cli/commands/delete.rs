//! Implementation of `chatdex delete`.

use std::process::ExitCode;

use crate::cli::{args::DeleteCommand, context::CommandContext};

/// Removes one message from a group's index.
pub fn run(ctx: &CommandContext, cmd: &DeleteCommand) -> ExitCode {
    let manager = ctx.manager();
    if let Err(e) = manager.delete(cmd.group, cmd.message) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
