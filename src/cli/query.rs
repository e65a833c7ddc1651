//! Query command implementation

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use crate::cli::{HarnessContext, QueryArgs};
use crate::client::{ErrorBody, QueryApi, QueryOptions, QueryOutcome, QueryResponse};
use crate::error::Result;
use crate::output::table::{format_table, one_line};
use crate::output::{format_ms, print_json};

/// Send one query and print what came back
pub async fn run(ctx: &HarnessContext, args: &QueryArgs) -> Result<()> {
    let client = ctx.client()?;
    let options = build_options(ctx, args).await?;

    let outcome = client.query(&args.text, &options).await?;

    if ctx.is_json() {
        return print_json(&QueryReport::from(&outcome));
    }

    print_pretty(&outcome);
    Ok(())
}

async fn build_options(ctx: &HarnessContext, args: &QueryArgs) -> Result<QueryOptions> {
    let mut options = if args.no_auth {
        QueryOptions::default()
    } else if let Some(raw) = &args.auth_header {
        QueryOptions::default().auth_header(raw.clone())
    } else {
        QueryOptions::with_token(ctx.provider()?.token().await?)
    };

    if let Some(count) = args.count {
        options = options.count(count);
    }
    if let Some(index) = &args.index {
        options = options.index(index.clone());
    }
    for (name, value) in &args.headers {
        options = options.header(name.clone(), value.clone());
    }

    Ok(options)
}

/// JSON rendering of a completed exchange
#[derive(Debug, Serialize)]
struct QueryReport<'a> {
    status: u16,
    elapsed_ms: u64,
    body: &'a Value,
}

impl<'a> From<&'a QueryOutcome> for QueryReport<'a> {
    fn from(outcome: &'a QueryOutcome) -> Self {
        Self {
            status: outcome.status.as_u16(),
            elapsed_ms: outcome.elapsed.as_millis() as u64,
            body: &outcome.data,
        }
    }
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "#")]
    rank: usize,
    #[tabled(rename = "SCORE")]
    score: String,
    #[tabled(rename = "SOURCE")]
    source: String,
    #[tabled(rename = "CONTENT")]
    content: String,
}

fn print_pretty(outcome: &QueryOutcome) {
    let status = outcome.status;
    let label = status.to_string();
    let label = if status.is_success() {
        label.green()
    } else if status.is_client_error() {
        label.yellow()
    } else {
        label.red()
    };
    println!(
        "{} {}",
        label.bold(),
        format!("({})", format_ms(Some(outcome.elapsed.as_millis() as u64))).dimmed()
    );

    if status.is_success() {
        if let Ok(response) = outcome.parse::<QueryResponse>() {
            print_results(&response);
            return;
        }
    } else if let Ok(body) = outcome.parse::<ErrorBody>() {
        print_error(&body, outcome);
        return;
    }

    // Body did not match a known shape; show it verbatim
    match serde_json::to_string_pretty(&outcome.data) {
        Ok(raw) => println!("{}", raw),
        Err(_) => println!("{}", outcome.data),
    }
}

fn print_results(response: &QueryResponse) {
    let rows: Vec<ResultRow> = response
        .results
        .iter()
        .enumerate()
        .map(|(i, r)| ResultRow {
            rank: i + 1,
            score: r.score.map(|s| format!("{:.3}", s)).unwrap_or_else(|| "-".to_string()),
            source: r.source.clone().unwrap_or_else(|| "-".to_string()),
            content: one_line(&r.content),
        })
        .collect();

    println!("{}", format_table(&rows));

    if let Some(usage) = &response.usage {
        println!(
            "Usage: {} / {} tokens ({} remaining{}{})",
            usage.tokens_used,
            usage.monthly_limit,
            usage.tokens_remaining,
            usage
                .percent_used
                .map(|p| format!(", {:.1}% used", p))
                .unwrap_or_default(),
            usage
                .tier
                .as_deref()
                .map(|t| format!(", tier {}", t))
                .unwrap_or_default(),
        );
    }
}

fn print_error(body: &ErrorBody, outcome: &QueryOutcome) {
    println!("{} {}", "Error:".red().bold(), body.error);
    if let Some(message) = &body.message {
        println!("  {}", message);
    }
    if let Some(quota) = &body.quota {
        println!(
            "  Quota: {} / {} used, {} remaining",
            quota.used, quota.limit, quota.remaining
        );
    }
    if let Some(wait) = outcome.retry_after() {
        println!("  Retry after {}s", wait.as_secs());
    }
}
