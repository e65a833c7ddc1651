//! Credential sources evaluated in order by the provider
//!
//! Each source either produces a token, reports that it does not apply
//! (`Ok(None)`), or fails. A failure stops resolution; nothing falls back
//! to a later source after an error.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::process::Command;
use tokio::sync::Mutex;

use super::issuer::TokenIssuer;
use super::record::{TokenRecord, is_token_valid, now_ms};
use super::store::CredentialStore;
use crate::config::LoginCommand;
use crate::error::{AuthError, Error, Result};

/// One way of obtaining a bearer token
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Short label used in logs and status output
    fn name(&self) -> &'static str;

    /// Produce a token, or `Ok(None)` if this source does not apply
    async fn attempt(&self) -> Result<Option<String>>;
}

/// Manually supplied token, returned as-is
pub struct OverrideSource {
    token: Option<String>,
}

impl OverrideSource {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

#[async_trait]
impl CredentialSource for OverrideSource {
    fn name(&self) -> &'static str {
        "override"
    }

    async fn attempt(&self) -> Result<Option<String>> {
        Ok(self.token.clone())
    }
}

/// Client-credentials token backed by a persistent cache. Automated environments only.
pub struct OAuthSource {
    enabled: bool,
    partition: String,
    store: Arc<dyn CredentialStore>,
    issuer: TokenIssuer,
    /// Held across the fetch so one process never refreshes twice at once
    memo: Mutex<Option<TokenRecord>>,
}

impl OAuthSource {
    pub fn new(
        enabled: bool,
        partition: String,
        store: Arc<dyn CredentialStore>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            enabled,
            partition,
            store,
            issuer,
            memo: Mutex::new(None),
        }
    }

    /// Return a valid token from memory or cache, fetching and persisting a new one on a miss.
    pub async fn get_oauth_token(&self) -> Result<String> {
        let mut memo = self.memo.lock().await;
        let now = now_ms();

        if let Some(record) = memo.as_ref().filter(|r| is_token_valid(Some(*r), now)) {
            debug!("Using in-process token for partition {}", self.partition);
            return Ok(record.access_token.clone());
        }

        let cached = match self.load_cached().await {
            Ok(record) => record,
            Err(e) => {
                debug!(
                    "Token cache {} unreadable, treating as miss: {}",
                    self.store.describe(&self.partition),
                    e
                );
                None
            }
        };

        if let Some(record) = cached.filter(|r| is_token_valid(Some(r), now)) {
            debug!("Token cache hit for partition {}", self.partition);
            let token = record.access_token.clone();
            *memo = Some(record);
            return Ok(token);
        }

        debug!("Token cache miss for partition {}", self.partition);
        let issued = self.issuer.fetch().await?;
        let record = TokenRecord::from_issued(issued, now_ms());

        if let Err(e) = self.persist(record.clone()).await {
            warn!(
                "Failed to persist token to {}: {}",
                self.store.describe(&self.partition),
                e
            );
        } else {
            info!("Cached new token at {}", self.store.describe(&self.partition));
        }

        let token = record.access_token.clone();
        *memo = Some(record);
        Ok(token)
    }

    // Store I/O runs on the blocking pool so file access never stalls the runtime
    async fn load_cached(&self) -> Result<Option<TokenRecord>> {
        let store = Arc::clone(&self.store);
        let partition = self.partition.clone();
        tokio::task::spawn_blocking(move || store.load(&partition))
            .await
            .map_err(|e| Error::Other(format!("token cache read task failed: {}", e)))?
    }

    async fn persist(&self, record: TokenRecord) -> Result<()> {
        let store = Arc::clone(&self.store);
        let partition = self.partition.clone();
        tokio::task::spawn_blocking(move || store.save(&partition, &record))
            .await
            .map_err(|e| Error::Other(format!("token cache write task failed: {}", e)))?
    }
}

#[async_trait]
impl CredentialSource for OAuthSource {
    fn name(&self) -> &'static str {
        "oauth"
    }

    async fn attempt(&self) -> Result<Option<String>> {
        if !self.enabled {
            return Ok(None);
        }
        self.get_oauth_token().await.map(Some)
    }
}

/// External interactive login command. Interactive environments only.
pub struct LoginCommandSource {
    enabled: bool,
    command: LoginCommand,
    timeout: Duration,
    memo: Mutex<Option<String>>,
}

impl LoginCommandSource {
    pub fn new(enabled: bool, command: LoginCommand, timeout: Duration) -> Self {
        Self {
            enabled,
            command,
            timeout,
            memo: Mutex::new(None),
        }
    }

    async fn login(&self) -> Result<String> {
        info!("Running login command `{}`", self.command.program);

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| Error::Timeout {
                operation: "login command",
                after: self.timeout,
            })?
            .map_err(|e| {
                AuthError::Login(format!("failed to run `{}`: {}", self.command.program, e))
            })?;

        if !output.status.success() {
            return Err(AuthError::Login(format!(
                "`{}` exited with {}",
                self.command.program, output.status
            ))
            .into());
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(AuthError::Login(format!(
                "`{}` returned an empty token",
                self.command.program
            ))
            .into());
        }

        Ok(token)
    }
}

#[async_trait]
impl CredentialSource for LoginCommandSource {
    fn name(&self) -> &'static str {
        "login"
    }

    async fn attempt(&self) -> Result<Option<String>> {
        if !self.enabled {
            return Ok(None);
        }

        let mut memo = self.memo.lock().await;
        if let Some(token) = memo.as_ref() {
            return Ok(Some(token.clone()));
        }

        let token = self.login().await?;
        *memo = Some(token.clone());
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::credential::store::MemoryCredentialStore;
    use mockito::Matcher;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    struct FailingStore;

    impl CredentialStore for FailingStore {
        fn load(&self, _partition: &str) -> Result<Option<TokenRecord>> {
            Err(Error::Other("disk on fire".to_string()))
        }

        fn save(&self, _partition: &str, _record: &TokenRecord) -> Result<()> {
            Err(Error::Other("read-only filesystem".to_string()))
        }

        fn describe(&self, partition: &str) -> String {
            format!("failing:{}", partition)
        }
    }

    fn issuer_for(server: &mockito::ServerGuard) -> TokenIssuer {
        let config = HarnessConfig {
            token_url: Some(format!("{}/ims/token", server.url())),
            client_id: Some("cid".to_string()),
            client_secret: Some("secret".to_string()),
            request_timeout_secs: 5,
            ..HarnessConfig::default()
        };
        TokenIssuer::new(&config).unwrap()
    }

    fn cached(token: &str, expires_at: i64) -> TokenRecord {
        TokenRecord {
            access_token: token.to_string(),
            token_type: Some("bearer".to_string()),
            expires_in: Some(86400),
            expires_at: Some(expires_at),
        }
    }

    #[tokio::test]
    async fn test_override_source() {
        assert_eq!(
            OverrideSource::new(Some("manual".to_string())).attempt().await.unwrap(),
            Some("manual".to_string())
        );
        assert_eq!(OverrideSource::new(None).attempt().await.unwrap(), None);
        assert_eq!(
            OverrideSource::new(Some(String::new())).attempt().await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_cache_hit_avoids_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        store
            .save("ci", &cached("from-cache", now_ms() + HOUR_MS))
            .unwrap();

        let source = OAuthSource::new(true, "ci".to_string(), store, issuer_for(&server));
        assert_eq!(source.get_oauth_token().await.unwrap(), "from-cache");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ims/token")
            .with_status(200)
            .with_body(r#"{"access_token":"shared","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let source = OAuthSource::new(true, "ci".to_string(), store, issuer_for(&server));

        let (first, second) = tokio::join!(source.get_oauth_token(), source.get_oauth_token());
        assert_eq!(first.unwrap(), "shared");
        assert_eq!(second.unwrap(), "shared");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cache_miss_fetches_once_and_persists() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ims/token")
            .with_status(200)
            .with_body(r#"{"access_token":"abc","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let source = OAuthSource::new(
            true,
            "ci".to_string(),
            store.clone(),
            issuer_for(&server),
        );

        let before = now_ms();
        assert_eq!(source.get_oauth_token().await.unwrap(), "abc");
        let after = now_ms();

        // Second call is served from memory
        assert_eq!(source.get_oauth_token().await.unwrap(), "abc");
        mock.assert_async().await;

        let saved = store.load("ci").unwrap().unwrap();
        let expires_at = saved.expires_at.unwrap();
        assert!(expires_at >= before + 3_300_000);
        assert!(expires_at <= after + 3_300_000);
    }

    #[tokio::test]
    async fn test_expired_cache_is_refreshed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ims/token")
            .with_status(200)
            .with_body(r#"{"access_token":"fresh","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        store.save("ci", &cached("stale", now_ms() - 1)).unwrap();

        let source = OAuthSource::new(
            true,
            "ci".to_string(),
            store.clone(),
            issuer_for(&server),
        );
        assert_eq!(source.get_oauth_token().await.unwrap(), "fresh");
        assert_eq!(store.load("ci").unwrap().unwrap().access_token, "fresh");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_implausible_cache_entry_is_refetched() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ims/token")
            .with_status(200)
            .with_body(r#"{"access_token":"fresh","expires_in":3600}"#)
            .expect(1)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        store
            .save("ci", &cached("corrupt", now_ms() + 49 * HOUR_MS))
            .unwrap();

        let source = OAuthSource::new(true, "ci".to_string(), store, issuer_for(&server));
        assert_eq!(source.get_oauth_token().await.unwrap(), "fresh");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_store_failures_are_not_fatal() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ims/token")
            .with_status(200)
            .with_body(r#"{"access_token":"abc","expires_in":3600}"#)
            .create_async()
            .await;

        let source = OAuthSource::new(
            true,
            "ci".to_string(),
            Arc::new(FailingStore),
            issuer_for(&server),
        );
        assert_eq!(source.get_oauth_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_issuer_rejection_propagates() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ims/token")
            .with_status(401)
            .with_body(r#"{"error_description":"bad creds"}"#)
            .create_async()
            .await;

        let source = OAuthSource::new(
            true,
            "ci".to_string(),
            Arc::new(MemoryCredentialStore::new()),
            issuer_for(&server),
        );
        let err = source.attempt().await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_disabled_oauth_source_does_not_apply() {
        let server = mockito::Server::new_async().await;
        let source = OAuthSource::new(
            false,
            "local".to_string(),
            Arc::new(MemoryCredentialStore::new()),
            issuer_for(&server),
        );
        assert_eq!(source.attempt().await.unwrap(), None);
    }

    #[cfg(unix)]
    fn shell(script: &str) -> LoginCommand {
        LoginCommand {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_login_command_captures_stdout() {
        let source = LoginCommandSource::new(true, shell("echo '  tok-123  '"), Duration::from_secs(5));
        assert_eq!(source.attempt().await.unwrap(), Some("tok-123".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_login_command_failure() {
        let source = LoginCommandSource::new(true, shell("exit 3"), Duration::from_secs(5));
        let err = source.attempt().await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Login(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_login_command_empty_output() {
        let source = LoginCommandSource::new(true, shell("true"), Duration::from_secs(5));
        let err = source.attempt().await.unwrap_err();
        assert!(err.to_string().contains("empty token"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_login_command_timeout() {
        let source = LoginCommandSource::new(true, shell("sleep 5"), Duration::from_millis(100));
        let err = source.attempt().await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_missing_login_program() {
        let command = LoginCommand {
            program: "ragcheck-no-such-login-binary".to_string(),
            args: vec![],
        };
        let source = LoginCommandSource::new(true, command, Duration::from_secs(5));
        let err = source.attempt().await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Login(_))));
    }

    #[tokio::test]
    async fn test_disabled_login_source_does_not_apply() {
        let source = LoginCommandSource::new(false, LoginCommand::default(), Duration::from_secs(1));
        assert_eq!(source.attempt().await.unwrap(), None);
    }
}
