//! Burst command implementation

use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::StatusCode;

use crate::cli::{BurstArgs, HarnessContext};
use crate::client::QueryOptions;
use crate::error::Result;
use crate::load::{BurstPlan, BurstSummary, run_burst};
use crate::output::{format_ms, print_json};

/// Fire a burst of authenticated queries and summarize the results
pub async fn run(ctx: &HarnessContext, args: &BurstArgs) -> Result<()> {
    let client = ctx.client()?;
    let token = ctx.provider()?.token().await?;

    let mut options = QueryOptions::with_token(token);
    if let Some(index) = &args.index {
        options = options.index(index.clone());
    }

    let plan = BurstPlan {
        requests: args.requests,
        concurrency: usize::from(args.concurrency),
        rate_per_sec: args.rate,
        query: args.query.clone(),
    };

    let progress = if ctx.is_json() {
        ProgressBar::hidden()
    } else {
        progress_bar(plan.requests as u64)
    };

    let summary = run_burst(&client, &options, &plan, &progress).await;
    progress.finish_and_clear();

    if ctx.is_json() {
        return print_json(&summary);
    }

    print_summary(&summary);
    Ok(())
}

fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {elapsed}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn print_summary(summary: &BurstSummary) {
    println!(
        "{} requests in {}",
        summary.requests.to_string().bold(),
        format_ms(Some(summary.wall_ms))
    );

    for (status, count) in &summary.status_counts {
        let line = format!("  {}: {}", status, count);
        match StatusCode::from_u16(*status) {
            Ok(s) if s.is_success() => println!("{}", line.green()),
            Ok(s) if s.is_client_error() => println!("{}", line.yellow()),
            _ => println!("{}", line.red()),
        }
    }
    if summary.timeouts > 0 {
        println!("  {}", format!("timeouts: {}", summary.timeouts).red());
    }
    if summary.errors > 0 {
        println!("  {}", format!("errors: {}", summary.errors).red());
        for sample in &summary.error_samples {
            println!("    {}", sample.dimmed());
        }
    }

    println!(
        "Latency p50 {} / p95 {} / max {}",
        format_ms(summary.p50_ms),
        format_ms(summary.p95_ms),
        format_ms(summary.max_ms)
    );

    if summary.rate_limited {
        let limited = summary.count(StatusCode::TOO_MANY_REQUESTS);
        let hint = summary
            .max_retry_after_secs
            .map(|s| format!(", retry-after up to {}s", s))
            .unwrap_or_default();
        println!(
            "{} Rate limit enforced: {} of {} requests got 429{}",
            "⚠".yellow(),
            limited,
            summary.requests,
            hint
        );
    } else {
        println!("{} No 429 responses observed", "○".dimmed());
    }
}
