//! API Key Entity
//!
//! Auth credentials gating every control-surface operation behind a
//! permission string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A credential for the control surface. `key_hash` is the stored digest of
/// the issued secret; the secret itself is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    id: Uuid,
    name: String,
    key_hash: String,
    permissions: Vec<String>,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    revoked: bool,
}

impl ApiKey {
    /// Creates a new API key record.
    pub fn new(
        name: String,
        key_hash: String,
        permissions: Vec<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            key_hash,
            permissions,
            created_at: Utc::now(),
            expires_at,
            revoked: false,
        }
    }

    /// Reconstructs an API key from database fields.
    pub fn from_db(
        id: Uuid,
        name: String,
        key_hash: String,
        permissions: Vec<String>,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
        revoked: bool,
    ) -> Self {
        Self {
            id,
            name,
            key_hash,
            permissions,
            created_at,
            expires_at,
            revoked,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_hash(&self) -> &str {
        &self.key_hash
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn revoked(&self) -> bool {
        self.revoked
    }

    pub fn revoke(&mut self) {
        self.revoked = true;
    }

    /// True if the key is usable right now: not revoked and not expired.
    pub fn is_valid(&self) -> bool {
        if self.revoked {
            return false;
        }
        match self.expires_at {
            Some(exp) => Utc::now() < exp,
            None => true,
        }
    }

    /// Checks whether this key grants the given permission string, honoring
    /// the `*` wildcard and `group:*` group wildcards (e.g. `person:*`
    /// grants `person:create`).
    pub fn grants(&self, permission: &str) -> bool {
        self.permissions.iter().any(|granted| {
            if granted == "*" {
                return true;
            }
            if granted == permission {
                return true;
            }
            if let Some(group) = granted.strip_suffix(":*") {
                return permission
                    .strip_prefix(group)
                    .map(|rest| rest.starts_with(':'))
                    .unwrap_or(false);
            }
            false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_grants_everything() {
        let key = ApiKey::new("root".into(), "hash".into(), vec!["*".into()], None);
        assert!(key.grants("person:create"));
        assert!(key.grants("admin"));
    }

    #[test]
    fn group_wildcard_grants_only_its_group() {
        let key = ApiKey::new(
            "hr".into(),
            "hash".into(),
            vec!["person:*".into()],
            None,
        );
        assert!(key.grants("person:create"));
        assert!(!key.grants("attendance:mark"));
    }

    #[test]
    fn revoked_key_is_invalid() {
        let mut key = ApiKey::new("k".into(), "hash".into(), vec!["*".into()], None);
        key.revoke();
        assert!(!key.is_valid());
    }
}
