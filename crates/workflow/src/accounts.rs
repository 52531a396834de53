//! User registration and role management.

use chrono::Utc;
use common::UserId;
use domain::{NewUser, Role, User};
use store::MarketStore;

use crate::access::load_with_role;
use crate::error::{Result, WorkflowError};

/// Registers users and manages their roles.
pub struct AccountService<S: MarketStore> {
    store: S,
}

impl<S: MarketStore> AccountService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a buyer or seller. Admin accounts cannot self-register.
    #[tracing::instrument(skip(self, input), fields(username = %input.username))]
    pub async fn register(&self, input: NewUser) -> Result<User> {
        if input.role == Role::Admin {
            return Err(WorkflowError::forbidden("admin accounts cannot be registered"));
        }
        let user = input.into_user(Utc::now())?;
        self.store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| WorkflowError::not_found("user", id))
    }

    pub async fn list_users(&self, actor_id: UserId) -> Result<Vec<User>> {
        load_with_role(&self.store, actor_id, Role::Admin, "list users").await?;
        Ok(self.store.list_users().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_role(&self, actor_id: UserId, user_id: UserId, role: Role) -> Result<User> {
        load_with_role(&self.store, actor_id, Role::Admin, "change roles").await?;
        if !self.store.set_user_role(user_id, role, Utc::now()).await? {
            return Err(WorkflowError::not_found("user", user_id));
        }
        self.get_user(user_id).await
    }

    /// Makes sure an admin with this email exists, creating it on first start.
    ///
    /// An existing account with the email is promoted to admin.
    pub async fn ensure_admin(&self, email: &str, username: &str) -> Result<User> {
        let input = NewUser {
            email: email.to_string(),
            username: username.to_string(),
            name: username.to_string(),
            role: Role::Admin,
        };
        let admin = input.into_user(Utc::now())?;

        if let Some(existing) = self.store.find_user_by_email(&admin.email).await? {
            if existing.is_admin() {
                return Ok(existing);
            }
            self.store
                .set_user_role(existing.id, Role::Admin, Utc::now())
                .await?;
            tracing::info!(user_id = %existing.id, "existing user promoted to admin");
            return self.get_user(existing.id).await;
        }

        self.store.insert_user(&admin).await?;
        tracing::info!(user_id = %admin.id, "bootstrap admin created");
        Ok(admin)
    }
}
