// dbops/src/utils/prompt.rs
use anyhow::{Context, Result};
use std::io::{stdin, stdout, Write};

use crate::config::RunOptions;

/// Gate in front of every state-mutating step (copy, restore, drop, create).
///
/// Returns whether the step should execute: `--dry-run` previews it and
/// answers no, `--confirm` asks the operator, otherwise the step proceeds.
pub fn confirm_step(options: &RunOptions, description: &str) -> Result<bool> {
    if options.dry_run {
        println!("🧪 Dry run: would {description}");
        return Ok(false);
    }
    if !options.confirm {
        return Ok(true);
    }

    print!("About to {description}. Continue? [y/N]: ");
    stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin()
        .read_line(&mut input)
        .context("Failed to read confirmation input")?;
    let answer = input.trim().to_ascii_lowercase();
    if answer == "y" || answer == "yes" {
        Ok(true)
    } else {
        println!("Skipped: {description}");
        Ok(false)
    }
}
