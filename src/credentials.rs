//! Tenant credentials and the store the engine resolves them from.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// An access credential for one tenant.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    /// `None` for credentials that do not expire (e.g. app-only certificates)
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    /// Whether the credential can no longer be used at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_empty() || self.expires_at.is_some_and(|expiry| expiry <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of tenant credentials.
///
/// Implementations must be safe to share between runs.
pub trait CredentialStore: Send + Sync {
    fn get(&self, tenant_id: &str) -> Option<Credentials>;
    fn put(&self, tenant_id: &str, credentials: Credentials);
}

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    entries: DashMap<String, Credentials>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, tenant_id: &str) -> Option<Credentials> {
        self.entries.get(tenant_id).map(|entry| entry.value().clone())
    }

    fn put(&self, tenant_id: &str, credentials: Credentials) {
        self.entries.insert(tenant_id.to_string(), credentials);
    }
}
