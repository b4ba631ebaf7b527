//! Password accounts.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::UserConfig;

/// Lowercase hex SHA-256 of a password, the format stored in config.
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

/// Email → password hash table. Emails compare case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct UserStore {
    users: HashMap<String, String>,
}

impl UserStore {
    pub fn from_config(users: &[UserConfig]) -> Self {
        Self {
            users: users
                .iter()
                .map(|u| (normalize(&u.email), u.password_sha256.to_lowercase()))
                .collect(),
        }
    }

    /// Check a password. Unknown users still pay for a hash so timing
    /// does not reveal which emails exist.
    pub fn verify(&self, email: &str, password: &str) -> bool {
        let candidate = hash_password(password);
        match self.users.get(&normalize(email)) {
            Some(stored) => candidate.as_bytes().ct_eq(stored.as_bytes()).into(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

pub(crate) fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}
