use anyhow::Result;
use serde::Serialize;
use std::io::Write;

/// Write a serializable value to stdout as pretty JSON, newline-terminated.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
