//! Check command implementation

use colored::Colorize;
use tabled::Tabled;

use crate::cli::HarnessContext;
use crate::contract::{CheckOutcome, run_auth_suite};
use crate::error::{Error, Result};
use crate::output::print_json;
use crate::output::table::format_table;

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "CHECK")]
    name: &'static str,
    #[tabled(rename = "RESULT")]
    result: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "DETAIL")]
    detail: String,
}

impl From<&CheckOutcome> for CheckRow {
    fn from(outcome: &CheckOutcome) -> Self {
        Self {
            name: outcome.name,
            result: if outcome.passed { "pass" } else { "FAIL" }.to_string(),
            status: outcome
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            detail: outcome.detail.clone(),
        }
    }
}

/// Run the auth contract suite; fails when any check fails
pub async fn run(ctx: &HarnessContext, query: &str) -> Result<()> {
    let client = ctx.client()?;
    let resolved = ctx.provider()?.resolve().await?;
    log::debug!("Checking with token from {} source", resolved.source);

    let outcomes = run_auth_suite(&client, &resolved.token, query).await;
    let failed = outcomes.iter().filter(|o| !o.passed).count();

    if ctx.is_json() {
        print_json(&outcomes)?;
    } else {
        println!("Endpoint: {}\n", client.endpoint().cyan());
        let rows: Vec<CheckRow> = outcomes.iter().map(CheckRow::from).collect();
        println!("{}", format_table(&rows));

        if failed == 0 {
            println!("{} All {} checks passed", "✓".green(), outcomes.len());
        }
    }

    if failed > 0 {
        return Err(Error::Other(format!(
            "{} of {} checks failed",
            failed,
            outcomes.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_row_from_outcome() {
        let row = CheckRow::from(&CheckOutcome {
            name: "missing authorization",
            passed: false,
            status: None,
            detail: "query request timed out after 1s".to_string(),
        });

        assert_eq!(row.result, "FAIL");
        assert_eq!(row.status, "-");
    }
}
