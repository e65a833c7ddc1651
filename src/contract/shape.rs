//! Response body shape validation
//!
//! Validators walk the raw JSON rather than a typed model so that every
//! deviation is reported, not just the first one serde trips over.

use std::fmt;

use serde_json::Value;

/// One deviation from the documented body shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub problem: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.problem)
    }
}

#[derive(Default)]
struct Checker {
    violations: Vec<Violation>,
}

impl Checker {
    fn fail(&mut self, path: impl Into<String>, problem: impl Into<String>) {
        self.violations.push(Violation {
            path: path.into(),
            problem: problem.into(),
        });
    }

    fn string<'a>(&mut self, body: &'a Value, path: &str, key: &str) -> Option<&'a str> {
        match body.get(key) {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => {
                self.fail(format!("{}{}", path, key), "expected a string");
                None
            }
            None => {
                self.fail(format!("{}{}", path, key), "missing");
                None
            }
        }
    }

    fn integer(&mut self, body: &Value, path: &str, key: &str) -> Option<i64> {
        match body.get(key) {
            Some(v) if v.is_i64() => v.as_i64(),
            Some(_) => {
                self.fail(format!("{}{}", path, key), "expected an integer");
                None
            }
            None => {
                self.fail(format!("{}{}", path, key), "missing");
                None
            }
        }
    }

    fn object<'a>(&mut self, body: &'a Value, path: &str, key: &str) -> Option<&'a Value> {
        match body.get(key) {
            Some(v @ Value::Object(_)) => Some(v),
            Some(_) => {
                self.fail(format!("{}{}", path, key), "expected an object");
                None
            }
            None => {
                self.fail(format!("{}{}", path, key), "missing");
                None
            }
        }
    }
}

/// Validate a 200 query response body
pub fn check_success_body(body: &Value) -> Vec<Violation> {
    let mut c = Checker::default();

    if !body.is_object() {
        c.fail("$", "expected a JSON object");
        return c.violations;
    }

    match body.get("success") {
        Some(Value::Bool(true)) => {}
        Some(other) => c.fail("success", format!("expected true, got {}", other)),
        None => c.fail("success", "missing"),
    }
    c.string(body, "", "query");

    let requested = match body.get("count") {
        None | Some(Value::Null) => None,
        Some(v) if v.is_u64() => v.as_u64(),
        Some(_) => {
            c.fail("count", "expected a non-negative integer");
            None
        }
    };

    match body.get("results") {
        Some(Value::Array(results)) => {
            if let Some(limit) = requested {
                if results.len() as u64 > limit {
                    c.fail(
                        "results",
                        format!("{} results exceed requested count {}", results.len(), limit),
                    );
                }
            }
            for (i, result) in results.iter().enumerate() {
                check_result(&mut c, result, i);
            }
        }
        Some(_) => c.fail("results", "expected an array"),
        None => c.fail("results", "missing"),
    }

    if let Some(usage) = c.object(body, "", "usage") {
        check_usage(&mut c, usage);
    }

    c.violations
}

fn check_result(c: &mut Checker, result: &Value, index: usize) {
    let path = format!("results[{}].", index);
    if !result.is_object() {
        c.fail(format!("results[{}]", index), "expected an object");
        return;
    }

    c.string(result, &path, "content");
    c.string(result, &path, "source");

    match result.get("metadata") {
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(_) => c.fail(format!("{}metadata", path), "expected an object"),
    }
    match result.get("score") {
        None | Some(Value::Null) => {}
        Some(v) if v.is_number() => {}
        Some(_) => c.fail(format!("{}score", path), "expected a number"),
    }
}

fn check_usage(c: &mut Checker, usage: &Value) {
    let used = c.integer(usage, "usage.", "tokensUsed");
    let remaining = c.integer(usage, "usage.", "tokensRemaining");
    let limit = c.integer(usage, "usage.", "monthlyLimit");
    c.string(usage, "usage.", "tier");

    match usage.get("percentUsed").map(Value::as_f64) {
        Some(Some(pct)) if (0.0..=100.0).contains(&pct) => {}
        Some(Some(pct)) => c.fail("usage.percentUsed", format!("{} outside 0..=100", pct)),
        Some(None) => c.fail("usage.percentUsed", "expected a number"),
        None => c.fail("usage.percentUsed", "missing"),
    }

    if let (Some(used), Some(remaining), Some(limit)) = (used, remaining, limit) {
        match limit.checked_sub(used) {
            Some(diff) if remaining == diff.max(0) => {}
            Some(_) => c.fail(
                "usage.tokensRemaining",
                format!("{} != monthlyLimit {} - tokensUsed {}", remaining, limit, used),
            ),
            None => c.fail(
                "usage",
                format!("monthlyLimit {} - tokensUsed {} is out of range", limit, used),
            ),
        }
    }
}

/// Validate an error body. An empty `expected_codes` accepts any code.
pub fn check_error_body(body: &Value, expected_codes: &[&str]) -> Vec<Violation> {
    let mut c = Checker::default();

    if !body.is_object() {
        c.fail("$", "expected a JSON object");
        return c.violations;
    }

    if let Some(code) = c.string(body, "", "error") {
        if !expected_codes.is_empty() && !expected_codes.contains(&code) {
            c.fail(
                "error",
                format!("expected one of {:?}, got {:?}", expected_codes, code),
            );
        }
    }
    c.string(body, "", "message");

    c.violations
}

/// Validate a 429 quota rejection body
pub fn check_quota_body(body: &Value) -> Vec<Violation> {
    let mut c = Checker::default();

    if !body.is_object() {
        c.fail("$", "expected a JSON object");
        return c.violations;
    }

    c.string(body, "", "error");
    if let Some(quota) = c.object(body, "", "quota") {
        let used = c.integer(quota, "quota.", "used");
        let limit = c.integer(quota, "quota.", "limit");
        let remaining = c.integer(quota, "quota.", "remaining");

        if let (Some(used), Some(limit), Some(remaining)) = (used, limit, remaining) {
            if remaining < 0 || remaining > limit {
                c.fail("quota.remaining", format!("{} outside 0..={}", remaining, limit));
            }
            if used < limit && remaining == 0 {
                c.fail("quota", format!("remaining is 0 but used {} < limit {}", used, limit));
            }
        }
    }

    c.violations
}
