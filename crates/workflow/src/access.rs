//! Loading the acting user and checking roles.

use common::UserId;
use domain::{Role, User};
use store::MarketStore;

use crate::error::{Result, WorkflowError};

/// Loads the acting user. An id with no account is rejected as unauthenticated.
pub(crate) async fn load_actor<S: MarketStore>(store: &S, actor_id: UserId) -> Result<User> {
    store
        .get_user(actor_id)
        .await?
        .ok_or(WorkflowError::UnknownActor(actor_id))
}

/// Fails with `Forbidden` unless the user has `role`.
pub(crate) fn require_role(user: &User, role: Role, action: &str) -> Result<()> {
    if user.role != role {
        let article = if role == Role::Admin { "an" } else { "a" };
        return Err(WorkflowError::forbidden(format!(
            "only {article} {role} may {action}"
        )));
    }
    Ok(())
}

/// Loads the actor and checks its role in one step.
pub(crate) async fn load_with_role<S: MarketStore>(
    store: &S,
    actor_id: UserId,
    role: Role,
    action: &str,
) -> Result<User> {
    let user = load_actor(store, actor_id).await?;
    require_role(&user, role, action)?;
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::NewUser;
    use store::InMemoryStore;

    fn user(role: Role) -> User {
        NewUser {
            email: "someone@example.com".to_string(),
            username: "someone".to_string(),
            name: "Someone".to_string(),
            role,
        }
        .into_user(Utc::now())
        .unwrap()
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&user(Role::Buyer), Role::Buyer, "check out").is_ok());
        let err = require_role(&user(Role::Seller), Role::Buyer, "check out").unwrap_err();
        assert_eq!(err.to_string(), "Forbidden: only a buyer may check out");
    }

    #[tokio::test]
    async fn test_unknown_actor() {
        let store = InMemoryStore::new();
        let id = UserId::new();
        let err = load_actor(&store, id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownActor(actor) if actor == id));
    }
}
