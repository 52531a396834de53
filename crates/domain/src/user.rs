//! Marketplace accounts and roles.

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The role a user plays in the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Browses, fills a cart and places orders.
    #[default]
    Buyer,
    /// Lists products and fulfils orders containing them.
    Seller,
    /// Manages users, catalog and orders.
    Admin,
}

impl Role {
    /// Returns the role name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// A registered user.
///
/// Identity fields are fixed at registration; only `role` changes afterwards,
/// and only by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Registration input.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
}

impl NewUser {
    /// Validates the input and builds the user record.
    pub fn into_user(self, now: DateTime<Utc>) -> Result<User, DomainError> {
        let email = self.email.trim().to_lowercase();
        let username = self.username.trim().to_string();
        let name = self.name.trim().to_string();

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => return Err(DomainError::validation("email must look like user@host")),
        }
        if username.is_empty() {
            return Err(DomainError::validation("username must not be empty"));
        }
        if name.is_empty() {
            return Err(DomainError::validation("name must not be empty"));
        }

        Ok(User {
            id: UserId::new(),
            email,
            username,
            name,
            role: self.role,
            created_at: now,
            updated_at: now,
        })
    }
}
