//! Implementation of `chatdex status`.

use std::process::ExitCode;

use chatdex_config::discover_config_files;
use comfy_table::{Table, presets::UTF8_BORDERS_ONLY};

use crate::cli::{
    context::CommandContext,
    output::{dim, subheader, warning},
};

/// Shows configuration files, the index root, and every group with its document count.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let config_files = discover_config_files(&ctx.cwd);
    println!("{}", subheader("Config files:"));
    if config_files.is_empty() {
        println!("   {}", dim("(none, using defaults)"));
        println!(
            "   Run {} to create a configuration file.",
            subheader("chatdex init")
        );
    } else {
        for path in &config_files {
            println!("   {}", path.display());
        }
    }
    println!();

    let manager = ctx.manager();
    println!("{}", subheader("Index root:"));
    if manager.root().is_dir() {
        println!("   {}", manager.root().display());
    } else {
        println!(
            "   {} {}",
            manager.root().display(),
            warning("[missing]")
        );
    }
    println!();

    let tenants = match manager.tenants() {
        Ok(tenants) => tenants,
        Err(e) => {
            eprintln!("error: failed to list groups: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("{}", subheader(&format!("Groups ({}):", tenants.len())));
    if tenants.is_empty() {
        println!("   {}", dim("(no indexes yet)"));
        return ExitCode::SUCCESS;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .set_header(vec!["group", "documents"]);
    for tenant in tenants {
        table.add_row(vec![
            tenant.to_string(),
            manager.document_count(tenant).to_string(),
        ]);
    }
    println!("{table}");

    ExitCode::SUCCESS
}
