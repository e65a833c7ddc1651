//! Ordered credential resolution

use std::sync::Arc;

use log::debug;
use serde::Serialize;

use super::issuer::TokenIssuer;
use super::sources::{CredentialSource, LoginCommandSource, OAuthSource, OverrideSource};
use super::store::CredentialStore;
use crate::config::HarnessConfig;
use crate::error::{ConfigError, Result};

/// Token together with the source that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedToken {
    pub source: &'static str,
    pub token: String,
}

/// Walks its sources in order and returns the first token produced
pub struct CredentialProvider {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl CredentialProvider {
    pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> Self {
        Self { sources }
    }

    /// Standard chain: manual override, then OAuth (CI) or the login command (local).
    pub fn from_config(config: &HarnessConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let automated = config.is_automated_environment;
        debug!(
            "Credential environment: {}",
            if automated { "automated" } else { "interactive" }
        );

        let sources: Vec<Box<dyn CredentialSource>> = vec![
            Box::new(OverrideSource::new(config.manual_token_override.clone())),
            Box::new(OAuthSource::new(
                automated,
                config.partition(),
                store,
                TokenIssuer::new(config)?,
            )),
            Box::new(LoginCommandSource::new(
                !automated,
                config.login_command.clone(),
                config.login_timeout(),
            )),
        ];

        Ok(Self::new(sources))
    }

    /// Resolve a token. The first source that applies decides the outcome.
    pub async fn resolve(&self) -> Result<ResolvedToken> {
        for source in &self.sources {
            if let Some(token) = source.attempt().await? {
                debug!("Credential resolved by {} source", source.name());
                return Ok(ResolvedToken {
                    source: source.name(),
                    token,
                });
            }
            debug!("Credential source {} not applicable", source.name());
        }

        Err(ConfigError::NoCredentialSource.into())
    }

    /// Resolve and return only the token string
    pub async fn token(&self) -> Result<String> {
        self.resolve().await.map(|r| r.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::store::MemoryCredentialStore;
    use crate::error::{AuthError, Error};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        name: &'static str,
        outcome: Option<&'static str>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CredentialSource for StubSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn attempt(&self) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AuthError::Login("stub failure".to_string()).into());
            }
            Ok(self.outcome.map(str::to_string))
        }
    }

    fn stub(
        name: &'static str,
        outcome: Option<&'static str>,
        fail: bool,
    ) -> (Box<dyn CredentialSource>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = StubSource {
            name,
            outcome,
            fail,
            calls: calls.clone(),
        };
        let boxed: Box<dyn CredentialSource> = Box::new(source);
        (boxed, calls)
    }

    #[tokio::test]
    async fn test_first_applicable_source_wins() {
        let (a, a_calls) = stub("a", None, false);
        let (b, _) = stub("b", Some("tok-b"), false);
        let (c, c_calls) = stub("c", Some("tok-c"), false);

        let provider = CredentialProvider::new(vec![a, b, c]);
        let resolved = provider.resolve().await.unwrap();

        assert_eq!(resolved.source, "b");
        assert_eq!(resolved.token, "tok-b");
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_fall_through() {
        let (a, _) = stub("a", None, true);
        let (b, b_calls) = stub("b", Some("tok-b"), false);

        let provider = CredentialProvider::new(vec![a, b]);
        let err = provider.resolve().await.unwrap_err();

        assert!(matches!(err, Error::Auth(AuthError::Login(_))));
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_applicable_source() {
        let (a, _) = stub("a", None, false);
        let provider = CredentialProvider::new(vec![a]);

        let err = provider.token().await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::NoCredentialSource)));
    }

    #[tokio::test]
    async fn test_override_bypasses_cache_and_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let config = HarnessConfig {
            token_url: Some(format!("{}/ims/token", server.url())),
            client_id: Some("cid".to_string()),
            client_secret: Some("secret".to_string()),
            is_automated_environment: true,
            manual_token_override: Some("manual-token".to_string()),
            ..HarnessConfig::default()
        };
        let store = Arc::new(MemoryCredentialStore::new());
        let provider = CredentialProvider::from_config(&config, store.clone()).unwrap();

        let resolved = provider.resolve().await.unwrap();
        assert_eq!(resolved.source, "override");
        assert_eq!(resolved.token, "manual-token");
        assert!(store.load("ci").unwrap().is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_automated_environment_uses_oauth() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ims/token")
            .with_status(200)
            .with_body(r#"{"access_token":"ci-token","expires_in":3600}"#)
            .create_async()
            .await;

        let config = HarnessConfig {
            token_url: Some(format!("{}/ims/token", server.url())),
            client_id: Some("cid".to_string()),
            client_secret: Some("secret".to_string()),
            is_automated_environment: true,
            ..HarnessConfig::default()
        };
        let provider =
            CredentialProvider::from_config(&config, Arc::new(MemoryCredentialStore::new())).unwrap();

        let resolved = provider.resolve().await.unwrap();
        assert_eq!(resolved.source, "oauth");
        assert_eq!(resolved.token, "ci-token");
    }

    #[tokio::test]
    async fn test_automated_environment_requires_client_credentials() {
        let config = HarnessConfig {
            token_url: Some("http://127.0.0.1:9/token".to_string()),
            is_automated_environment: true,
            ..HarnessConfig::default()
        };
        let provider =
            CredentialProvider::from_config(&config, Arc::new(MemoryCredentialStore::new())).unwrap();

        let err = provider.resolve().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingClientCredentials)
        ));
    }
}
