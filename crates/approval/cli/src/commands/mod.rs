//! Command implementations

pub mod eval;
pub mod simulate;

use serde::Serialize;

/// Pretty-print a report on stdout
pub fn print_json<T: Serialize>(report: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
