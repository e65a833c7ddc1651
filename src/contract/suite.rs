//! Authentication contract scenarios
//!
//! Each scenario sends one query with a particular authorization setup and
//! judges the outcome. Scenarios run sequentially; nothing is retried.

use reqwest::StatusCode;
use serde::Serialize;

use super::shape::{check_error_body, check_quota_body, check_success_body};
use crate::client::models::EMPTY_RESPONSE_ERROR;
use crate::client::{QueryApi, QueryOptions, QueryOutcome};

/// Token that no issuer would ever accept
const BOGUS_TOKEN: &str = "ragcheck-invalid-token";

/// What a scenario requires from the response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// 200 with a well-formed success body
    Success,
    /// 401 with one of the listed error codes (or an empty body)
    Unauthorized(&'static [&'static str]),
    /// Any completed exchange; the server decides the status
    Handled,
}

/// A single request and its expectation
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub query: String,
    pub options: QueryOptions,
    pub expect: Expectation,
}

/// Verdict for one scenario
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub status: Option<u16>,
    pub detail: String,
}

/// The standard auth scenarios for a known-good token
pub fn auth_scenarios(token: &str, query: &str) -> Vec<Scenario> {
    vec![
        Scenario {
            name: "authorized query",
            query: query.to_string(),
            options: QueryOptions::with_token(token),
            expect: Expectation::Success,
        },
        Scenario {
            name: "missing authorization",
            query: query.to_string(),
            options: QueryOptions::default(),
            expect: Expectation::Unauthorized(&["missing_token"]),
        },
        Scenario {
            name: "invalid bearer token",
            query: query.to_string(),
            options: QueryOptions::with_token(BOGUS_TOKEN),
            expect: Expectation::Unauthorized(&["invalid_token"]),
        },
        Scenario {
            name: "missing Bearer prefix",
            query: query.to_string(),
            options: QueryOptions::default().auth_header(token),
            expect: Expectation::Unauthorized(&[]),
        },
        Scenario {
            name: "empty query",
            query: String::new(),
            options: QueryOptions::with_token(token),
            expect: Expectation::Handled,
        },
    ]
}

/// Judge a completed exchange against an expectation
pub fn evaluate(outcome: &QueryOutcome, expect: Expectation) -> (bool, String) {
    let status = outcome.status;

    match expect {
        Expectation::Success => {
            if status == StatusCode::TOO_MANY_REQUESTS {
                let shape = check_quota_body(&outcome.data);
                let mut detail = "quota exhausted, cannot verify success body".to_string();
                if !shape.is_empty() {
                    detail.push_str(&format!("; 429 body: {}", join(&shape)));
                }
                return (false, detail);
            }
            if status != StatusCode::OK {
                return (false, format!("expected 200, got {}", status));
            }
            let violations = check_success_body(&outcome.data);
            if violations.is_empty() {
                (true, "success body well-formed".to_string())
            } else {
                (false, join(&violations))
            }
        }
        Expectation::Unauthorized(codes) => {
            if status != StatusCode::UNAUTHORIZED {
                return (false, format!("expected 401, got {}", status));
            }
            if outcome.error_code() == Some(EMPTY_RESPONSE_ERROR) {
                return (true, "401 with empty body".to_string());
            }
            let violations = check_error_body(&outcome.data, codes);
            if violations.is_empty() {
                (true, format!("401 {}", outcome.error_code().unwrap_or_default()))
            } else {
                (false, join(&violations))
            }
        }
        Expectation::Handled => (true, format!("handled with {}", status)),
    }
}

/// Run scenarios in order against the query API
pub async fn run_scenarios(client: &dyn QueryApi, scenarios: &[Scenario]) -> Vec<CheckOutcome> {
    let mut outcomes = Vec::with_capacity(scenarios.len());

    for scenario in scenarios {
        log::debug!("Running scenario: {}", scenario.name);
        let outcome = match client.query(&scenario.query, &scenario.options).await {
            Ok(outcome) => {
                let (passed, detail) = evaluate(&outcome, scenario.expect);
                CheckOutcome {
                    name: scenario.name,
                    passed,
                    status: Some(outcome.status.as_u16()),
                    detail,
                }
            }
            Err(e) => CheckOutcome {
                name: scenario.name,
                passed: false,
                status: None,
                detail: e.to_string(),
            },
        };
        outcomes.push(outcome);
    }

    outcomes
}

/// Run the standard auth scenarios
pub async fn run_auth_suite(client: &dyn QueryApi, token: &str, query: &str) -> Vec<CheckOutcome> {
    run_scenarios(client, &auth_scenarios(token, query)).await
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
