//! Bearer token acquisition
//!
//! A [`CredentialProvider`] walks an ordered chain of [`CredentialSource`]s:
//! a manual override, the cached client-credentials flow used in CI, and the
//! interactive login command used on developer machines. OAuth tokens are
//! persisted through a [`CredentialStore`] keyed by cache partition.

pub mod issuer;
pub mod jwt;
pub mod provider;
pub mod record;
pub mod sources;
pub mod store;

pub use issuer::TokenIssuer;
pub use provider::{CredentialProvider, ResolvedToken};
pub use record::{TokenRecord, is_token_valid, now_ms};
pub use sources::CredentialSource;
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
