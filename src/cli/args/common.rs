//! Common CLI types shared across commands

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty format - colored text and tables for humans
    #[default]
    Pretty,
    /// JSON format - structured for scripts and CI
    Json,
}

/// Parse a `NAME:VALUE` header argument
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got {:?}", raw))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("header name missing in {:?}", raw));
    }

    Ok((name.to_string(), value.trim().to_string()))
}
