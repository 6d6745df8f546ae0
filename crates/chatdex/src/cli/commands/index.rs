//! Implementation of `chatdex index`.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    process::ExitCode,
};

use chatdex_index::{BatchReport, IndexManager, MessageDocument};
use tracing::debug;

use crate::cli::{args::IndexCommand, context::CommandContext};

/// Indexes messages read as JSON lines from a file or stdin.
pub fn run(ctx: &CommandContext, cmd: &IndexCommand) -> ExitCode {
    let reader: Box<dyn BufRead> = match &cmd.file {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(e) => {
                eprintln!("error: failed to open {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Box::new(io::stdin().lock()),
    };

    let messages = match read_messages(reader) {
        Ok(messages) => messages,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };
    debug!(count = messages.len(), single = cmd.single, "read messages");

    let manager = ctx.manager();
    let report = if cmd.single {
        write_each(&manager, &messages)
    } else {
        manager.write_batch(&messages)
    };

    println!(
        "Indexed {} messages ({} skipped, {} failed)",
        report.written, report.skipped, report.failed
    );
    if report.failed > 0 {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Parses one message per non-blank line.
fn read_messages(reader: impl BufRead) -> Result<Vec<MessageDocument>, String> {
    let mut messages = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("failed to read input: {e}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let message = serde_json::from_str::<MessageDocument>(&line)
            .map_err(|e| format!("line {}: invalid message: {e}", number + 1))?;
        messages.push(message);
    }
    Ok(messages)
}

/// Writes messages one at a time, reporting each failure and carrying on.
fn write_each(manager: &IndexManager, messages: &[MessageDocument]) -> BatchReport {
    let mut report = BatchReport::default();
    for message in messages {
        match manager.write(message) {
            Ok(()) => report.written += 1,
            Err(e) => {
                eprintln!(
                    "error: group {} message {}: {e}",
                    message.group_id, message.message_id
                );
                report.failed += 1;
            }
        }
    }
    report
}
