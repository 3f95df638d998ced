//! Operator prompt for the round count

use super::validator::validate_round_count;
use anyhow::{Context, Result};
use std::io::{BufRead, Write};

/// Ask the operator for a positive round count
///
/// Re-prompts until a positive integer is entered. End of input is an error.
pub fn read_round_count<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<u32> {
    write!(output, "Enter the number of rounds (each round runs the basic and accelerated phases): ")?;
    output.flush()?;

    let mut line = String::new();
    loop {
        line.clear();
        let read = input
            .read_line(&mut line)
            .context("Failed to read round count")?;
        if read == 0 {
            anyhow::bail!("Input closed before a round count was entered");
        }

        match line.trim().parse::<u32>() {
            Ok(rounds) if validate_round_count(rounds).is_ok() => return Ok(rounds),
            _ => {
                write!(output, "Please enter a valid positive integer: ")?;
                output.flush()?;
            }
        }
    }
}
