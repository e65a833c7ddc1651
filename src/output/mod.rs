//! Output formatting for CLI results

use serde::Serialize;

use crate::error::Result;

pub mod json;
pub mod table;

/// Print data wrapped in the JSON envelope to stdout
pub fn print_json<T: Serialize + ?Sized>(data: &T) -> Result<()> {
    println!("{}", json::format_json(data)?);
    Ok(())
}

/// Render milliseconds the way people read latencies
pub fn format_ms(ms: Option<u64>) -> String {
    match ms {
        Some(ms) if ms >= 1000 => format!("{:.2}s", ms as f64 / 1000.0),
        Some(ms) => format!("{}ms", ms),
        None => "-".to_string(),
    }
}

/// Render a remaining lifetime as hours and minutes
pub fn format_remaining(ms: i64) -> String {
    let total_mins = ms.max(0) / 60_000;
    format!("{}h {}m", total_mins / 60, total_mins % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ms() {
        assert_eq!(format_ms(None), "-");
        assert_eq!(format_ms(Some(42)), "42ms");
        assert_eq!(format_ms(Some(1500)), "1.50s");
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(0), "0h 0m");
        assert_eq!(format_remaining(-5), "0h 0m");
        assert_eq!(format_remaining((2 * 60 + 35) * 60_000 + 999), "2h 35m");
    }
}
