//! User accounts
//!
//! Passwords are stored as salted SHA-256 digests, never in the clear.
//! With a snapshot path configured the whole book is rewritten on every
//! registration.

use crate::core::error::{KernelError, Result};
use crate::core::types::{now_millis, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    salt: String,
    password_hash: String,
    pub created_at: Timestamp,
}

impl UserRecord {
    fn new(username: &str, password: &str) -> Self {
        let salt = uuid::Uuid::new_v4().simple().to_string();
        let password_hash = digest(&salt, password);
        Self {
            username: username.to_string(),
            salt,
            password_hash,
            created_at: now_millis(),
        }
    }

    fn matches(&self, password: &str) -> bool {
        digest(&self.salt, password) == self.password_hash
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Default)]
pub struct AccountBook {
    users: RwLock<BTreeMap<String, UserRecord>>,
    snapshot: Option<PathBuf>,
}

impl AccountBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a book backed by a JSON file, loading it when present
    pub fn open(path: &Path) -> Result<Self> {
        let mut users = BTreeMap::new();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let records: Vec<UserRecord> = serde_json::from_str(&content)?;
            for record in records {
                users.insert(record.username.clone(), record);
            }
            tracing::info!(file = %path.display(), users = users.len(), "Loaded accounts");
        }
        Ok(Self {
            users: RwLock::new(users),
            snapshot: Some(path.to_path_buf()),
        })
    }

    pub fn has_users(&self) -> bool {
        self.count() > 0
    }

    pub fn count(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn register(&self, username: &str, password: &str) -> Result<()> {
        let username = username.trim();
        if username.is_empty() || username.contains(char::is_whitespace) {
            return Err(KernelError::InvalidParams(
                "username must be a single non-empty word".into(),
            ));
        }
        if password.is_empty() {
            return Err(KernelError::InvalidParams("password must not be empty".into()));
        }

        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users.contains_key(username) {
            return Err(KernelError::AlreadyExists(format!("user {}", username)));
        }
        users.insert(username.to_string(), UserRecord::new(username, password));

        if let Err(e) = self.persist(&users) {
            users.remove(username);
            return Err(e);
        }
        tracing::info!(user = username, "Account registered");
        Ok(())
    }

    /// Check credentials; unknown users and wrong passwords fail alike
    pub fn verify(&self, username: &str, password: &str) -> Result<()> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        match users.get(username.trim()) {
            Some(record) if record.matches(password) => Ok(()),
            _ => Err(KernelError::AuthFailed("invalid username or password".into())),
        }
    }

    fn persist(&self, users: &BTreeMap<String, UserRecord>) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let records: Vec<&UserRecord> = users.values().collect();
        let json = serde_json::to_vec_pretty(&records)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .and_then(|_| std::fs::rename(&tmp, path))
            .map_err(|e| KernelError::internal_with("accounts write failed", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_verify() {
        let book = AccountBook::new();
        assert!(!book.has_users());

        book.register("ada", "lovelace").unwrap();
        assert!(book.has_users());
        assert!(book.verify("ada", "lovelace").is_ok());
        assert!(matches!(book.verify("ada", "babbage"), Err(KernelError::AuthFailed(_))));
        assert!(matches!(book.verify("bob", "lovelace"), Err(KernelError::AuthFailed(_))));
    }

    #[test]
    fn test_register_rejects_duplicates_and_blanks() {
        let book = AccountBook::new();
        book.register("ada", "pw").unwrap();
        assert!(matches!(book.register("ada", "other"), Err(KernelError::AlreadyExists(_))));
        assert!(matches!(book.register("  ", "pw"), Err(KernelError::InvalidParams(_))));
        assert!(matches!(book.register("two words", "pw"), Err(KernelError::InvalidParams(_))));
        assert!(matches!(book.register("eve", ""), Err(KernelError::InvalidParams(_))));
        assert_eq!(book.count(), 1);
    }

    #[test]
    fn test_same_password_different_salt() {
        let a = UserRecord::new("a", "secret");
        let b = UserRecord::new("b", "secret");
        assert_ne!(a.password_hash, b.password_hash);
        assert!(!a.password_hash.contains("secret"));
        assert_eq!(a.password_hash.len(), 64);
    }

    #[test]
    fn test_accounts_survive_reopen() {
        let dir = std::env::temp_dir().join(format!("neuro-casio-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("users.json");

        AccountBook::open(&file).unwrap().register("ada", "pw").unwrap();
        let reopened = AccountBook::open(&file).unwrap();
        assert_eq!(reopened.count(), 1);
        assert!(reopened.verify("ada", "pw").is_ok());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
