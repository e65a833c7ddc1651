//! Token command implementations

use chrono::{TimeZone, Utc};
use colored::Colorize;
use serde::Serialize;

use crate::cli::HarnessContext;
use crate::credential::jwt::{decode_claims, redact};
use crate::credential::{TokenRecord, is_token_valid, now_ms};
use crate::error::Result;
use crate::output::{format_remaining, print_json};

/// Resolve a token through the source chain and print it
pub async fn show(ctx: &HarnessContext) -> Result<()> {
    let resolved = ctx.provider()?.resolve().await?;

    if ctx.is_json() {
        return print_json(&resolved);
    }

    // Bare token on stdout so it can be piped
    eprintln!("{} token from {} source", "✓".green(), resolved.source.bold());
    println!("{}", resolved.token);
    Ok(())
}

/// Print the cache location for the active partition
pub fn path(ctx: &HarnessContext) -> Result<()> {
    let partition = ctx.config.partition();
    let location = ctx.store()?.describe(&partition);

    if ctx.is_json() {
        return print_json(&serde_json::json!({
            "partition": partition,
            "location": location,
        }));
    }

    println!("{}", location);
    Ok(())
}

/// Snapshot of credential state, gathered without network calls
#[derive(Debug, Serialize)]
pub struct TokenStatus {
    pub partition: String,
    pub environment: &'static str,
    pub override_set: bool,
    pub oauth_configured: bool,
    pub cache_location: String,
    pub cached: Option<CachedToken>,
}

#[derive(Debug, Serialize)]
pub struct CachedToken {
    pub preview: String,
    pub valid: bool,
    pub expires_at: Option<String>,
    pub remaining_ms: Option<i64>,
    pub jwt_issued_at: Option<String>,
    pub jwt_expires_at: Option<String>,
    pub jwt_client_id: Option<String>,
    pub jwt_type: Option<String>,
}

/// Show credential environment and cached token state
pub fn status(ctx: &HarnessContext) -> Result<()> {
    let report = gather_status(ctx)?;

    if ctx.is_json() {
        return print_json(&report);
    }

    println!("{}\n", "ragcheck Credential Status".bold());
    println!("Environment: {}", report.environment.cyan());
    println!("Partition:   {}", report.partition.cyan());
    println!("Cache:       {}", report.cache_location.cyan());
    println!();

    if report.override_set {
        println!(
            "{} Manual token override set (takes precedence over every other source)",
            "✓".green()
        );
    } else {
        println!("{} No manual token override", "○".dimmed());
    }

    if report.environment == "automated" {
        if report.oauth_configured {
            println!("{} OAuth client credentials configured", "✓".green());
        } else {
            println!("{} OAuth client credentials incomplete", "✗".red());
            println!("  → Set IMS_TOKEN_URL, IMS_CLIENT_ID and IMS_CLIENT_SECRET");
        }
    } else {
        let login = &ctx.config.login_command;
        println!(
            "{} Interactive login via '{} {}'",
            "○".dimmed(),
            login.program,
            login.args.join(" ")
        );
    }

    match &report.cached {
        Some(cached) if cached.valid => {
            let remaining = cached.remaining_ms.map(format_remaining).unwrap_or_default();
            println!(
                "{} Cached token {} valid (expires in {})",
                "✓".green(),
                cached.preview,
                remaining
            );
        }
        Some(cached) => {
            println!(
                "{} Cached token {} not usable (will refresh on next fetch)",
                "⚠".yellow(),
                cached.preview
            );
        }
        None => println!("{} No cached token", "○".dimmed()),
    }

    if let Some(cached) = &report.cached {
        if let Some(iat) = &cached.jwt_issued_at {
            println!("  JWT issued: {}", iat);
        }
        if let Some(exp) = &cached.jwt_expires_at {
            println!("  JWT expiry: {}", exp);
        }
        if let Some(client) = &cached.jwt_client_id {
            println!("  JWT client: {}", client);
        }
        if let Some(kind) = &cached.jwt_type {
            println!("  JWT type:   {}", kind);
        }
    }

    Ok(())
}

fn gather_status(ctx: &HarnessContext) -> Result<TokenStatus> {
    let config = &ctx.config;
    let partition = config.partition();
    let store = ctx.store()?;

    // An unreadable cache file is reported as "no cached token"
    let record = store.load(&partition).unwrap_or_else(|e| {
        log::warn!("Could not read token cache: {}", e);
        None
    });

    let oauth_configured = [&config.token_url, &config.client_id, &config.client_secret]
        .iter()
        .all(|v| v.as_deref().is_some_and(|s| !s.is_empty()));

    Ok(TokenStatus {
        cache_location: store.describe(&partition),
        partition,
        environment: if config.is_automated_environment {
            "automated"
        } else {
            "interactive"
        },
        override_set: config.manual_token_override.is_some(),
        oauth_configured,
        cached: record.map(|r| describe_record(&r, now_ms())),
    })
}

fn describe_record(record: &TokenRecord, now: i64) -> CachedToken {
    let claims = decode_claims(&record.access_token);

    CachedToken {
        preview: redact(&record.access_token),
        valid: is_token_valid(Some(record), now),
        expires_at: record.expires_at.and_then(format_epoch_ms),
        remaining_ms: record.remaining_ms(now),
        jwt_issued_at: claims
            .as_ref()
            .and_then(|c| c.issued_at_ms)
            .and_then(format_epoch_ms),
        jwt_expires_at: claims
            .as_ref()
            .and_then(|c| c.expires_at_ms)
            .and_then(format_epoch_ms),
        jwt_client_id: claims.as_ref().and_then(|c| c.client_id.clone()),
        jwt_type: claims.and_then(|c| c.token_type),
    }
}

fn format_epoch_ms(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.to_rfc3339())
}
