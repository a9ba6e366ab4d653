use serde::Serialize;

/// Pretty JSON on stdout, or nothing in quiet mode.
pub fn output<T: Serialize>(value: &T, quiet: bool) -> anyhow::Result<()> {
    if !quiet {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}
