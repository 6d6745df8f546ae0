//! Implementation of `chatdex init`.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use chatdex_config::{CONFIG_FILENAME, global_config_path, global_template, local_template};

use crate::cli::{
    args::InitCommand,
    context::CommandContext,
    output::{indent_content, subheader},
};

/// Directory holding local indexes, kept out of version control.
const INDEX_PATTERN: &str = ".chatdex/";

/// Where `init` writes and which template it uses.
struct Target {
    /// Config file to create.
    path: PathBuf,
    /// Whether this is the user-wide file.
    global: bool,
}

/// Writes a commented `.chatdex.toml` template.
///
/// Running in the home directory behaves like `--global`.
pub fn run(ctx: &CommandContext, cmd: &InitCommand) -> ExitCode {
    let target = match resolve_target(&ctx.cwd, cmd.global) {
        Some(target) => target,
        None => {
            eprintln!("error: could not determine home directory");
            return ExitCode::FAILURE;
        }
    };

    if target.path.exists() && !cmd.force {
        eprintln!(
            "error: configuration file already exists: {}",
            target.path.display()
        );
        eprintln!("use --force to overwrite");
        return ExitCode::FAILURE;
    }

    let template = if target.global {
        global_template()
    } else {
        local_template()
    };
    if let Err(e) = fs::write(&target.path, &template) {
        eprintln!("error: failed to write {}: {e}", target.path.display());
        return ExitCode::FAILURE;
    }

    println!("Created {}", target.path.display());
    println!();
    println!("{}", subheader("Configuration written:"));
    println!("{}", indent_content(&template));

    if !target.global {
        match ignore_index_dir(&ctx.cwd) {
            Ok(true) => println!("Added {INDEX_PATTERN} to .gitignore"),
            Ok(false) => {}
            Err(e) => eprintln!("warning: could not update .gitignore: {e}"),
        }
    }

    ExitCode::SUCCESS
}

/// Picks the file to create. `None` when a global file is wanted but there is no home.
fn resolve_target(cwd: &Path, global: bool) -> Option<Target> {
    let global_path = global_config_path();
    let in_home = global_path
        .as_deref()
        .and_then(Path::parent)
        .is_some_and(|home| home == cwd);

    if global || in_home {
        return global_path.map(|path| Target { path, global: true });
    }
    Some(Target {
        path: cwd.join(CONFIG_FILENAME),
        global: false,
    })
}

/// Appends the index directory to an existing `.gitignore` in `dir`.
///
/// Returns whether the file changed. A missing `.gitignore` is left alone.
fn ignore_index_dir(dir: &Path) -> io::Result<bool> {
    let gitignore = dir.join(".gitignore");
    if !gitignore.is_file() {
        return Ok(false);
    }

    let contents = fs::read_to_string(&gitignore)?;
    let bare = INDEX_PATTERN.trim_end_matches('/');
    let already = contents
        .lines()
        .map(str::trim)
        .any(|line| line == INDEX_PATTERN || line == bare);
    if already {
        return Ok(false);
    }

    let mut file = OpenOptions::new().append(true).open(&gitignore)?;
    if !contents.is_empty() && !contents.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{INDEX_PATTERN}")?;
    Ok(true)
}
