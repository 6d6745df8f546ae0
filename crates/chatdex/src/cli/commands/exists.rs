//! Implementation of `chatdex exists`.

use std::process::ExitCode;

use crate::cli::{args::ExistsCommand, context::CommandContext};

/// Reports whether a group has an index through the exit status.
pub fn run(ctx: &CommandContext, cmd: &ExistsCommand) -> ExitCode {
    if ctx.manager().index_exists(cmd.group) {
        println!("yes");
        ExitCode::SUCCESS
    } else {
        println!("no");
        ExitCode::FAILURE
    }
}
