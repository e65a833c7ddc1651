//! OAuth client-credentials token endpoint

use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;

use super::record::IssuedToken;
use crate::config::HarnessConfig;
use crate::error::{ApiError, AuthError, ConfigError, Error, Result};

/// Scope requested with every client-credentials grant
pub const TOKEN_SCOPE: &str = "openid,AdobeID";

/// Client for the token issuer
pub struct TokenIssuer {
    http: HttpClient,
    token_url: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    timeout: Duration,
}

impl TokenIssuer {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            timeout,
        })
    }

    /// Request a fresh token with the client-credentials grant
    pub async fn fetch(&self) -> Result<IssuedToken> {
        let (client_id, client_secret) = match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => (id, secret),
            _ => return Err(ConfigError::MissingClientCredentials.into()),
        };
        let token_url = self
            .token_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingTokenUrl)?;

        log::info!("Requesting access token from {}", token_url);

        let response = self
            .http
            .post(token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("scope", TOKEN_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| Error::from_transport(e, "token request", self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::from_transport(e, "token request", self.timeout))?;

        if !status.is_success() {
            return Err(AuthError::Fetch(failure_detail(status, &body)).into());
        }

        let issued: IssuedToken = serde_json::from_str(&body).map_err(|e| {
            AuthError::Fetch(format!("Failed to parse token response: {}", e))
        })?;

        if issued.access_token.is_empty() {
            return Err(AuthError::Fetch("token response had an empty access_token".to_string()).into());
        }

        Ok(issued)
    }
}

/// Prefer the issuer's `error_description`, fall back to the raw body
fn failure_detail(status: reqwest::StatusCode, body: &str) -> String {
    #[derive(Deserialize)]
    struct IssuerError {
        error_description: Option<String>,
    }

    let description = serde_json::from_str::<IssuerError>(body)
        .ok()
        .and_then(|e| e.error_description)
        .filter(|d| !d.is_empty());

    match description {
        Some(d) => format!("{} ({})", d, status),
        None if body.trim().is_empty() => format!("issuer returned {}", status),
        None => format!("{} ({})", body.trim(), status),
    }
}
