//! Implementation of `chatdex search`.

use std::process::ExitCode;

use chatdex_index::{SearchMode, SearchRequest, SearchScope};

use crate::cli::{
    args::SearchCommand,
    context::CommandContext,
    output::{print_json, print_page},
};

/// Searches one group or every group and prints a page of matches.
pub fn run(ctx: &CommandContext, cmd: &SearchCommand) -> ExitCode {
    let request = SearchRequest {
        query: Some(cmd.query.clone()),
        scope: cmd.group.map_or(SearchScope::All, SearchScope::Tenant),
        mode: if cmd.syntax {
            SearchMode::Syntax
        } else {
            SearchMode::Simple
        },
        skip: cmd.skip,
        take: cmd.take.unwrap_or(ctx.config.search.default_take),
    };

    let page = match ctx.service().search(&request) {
        Ok(page) => page,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cmd.json {
        return print_json(&page);
    }
    print_page(&page, request.skip);
    ExitCode::SUCCESS
}
