use std::io::{self, BufRead, Write};

use anyhow::{Context, bail};

/// Asks for a 1-based index into a list of `len` entries.
pub fn select_index(prompt: &str, len: usize) -> anyhow::Result<usize> {
    print!("{prompt}");
    io::stdout().flush().context("flushing prompt")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading selection")?;
    parse_selection(&line, len)
}

fn parse_selection(input: &str, len: usize) -> anyhow::Result<usize> {
    let choice: usize = input
        .trim()
        .parse()
        .with_context(|| format!("'{}' is not a number", input.trim()))?;
    if choice == 0 || choice > len {
        bail!("selection {choice} is out of range 1-{len}");
    }
    Ok(choice - 1)
}
