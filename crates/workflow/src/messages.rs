//! Direct messages between users.

use chrono::Utc;
use common::UserId;
use domain::{Message, NewMessage};
use store::MarketStore;

use crate::access::load_actor;
use crate::error::{Result, WorkflowError};

pub struct MessageService<S: MarketStore> {
    store: S,
}

impl<S: MarketStore> MessageService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, input), fields(receiver_id = %input.receiver_id))]
    pub async fn send_message(&self, actor_id: UserId, input: NewMessage) -> Result<Message> {
        let sender = load_actor(&self.store, actor_id).await?;
        if self.store.get_user(input.receiver_id).await?.is_none() {
            return Err(WorkflowError::not_found("user", input.receiver_id));
        }
        let message = input.into_message(sender.id, Utc::now())?;
        self.store.insert_message(&message).await?;
        Ok(message)
    }

    /// Messages between the actor and `other`, oldest first.
    pub async fn conversation(&self, actor_id: UserId, other: UserId) -> Result<Vec<Message>> {
        let actor = load_actor(&self.store, actor_id).await?;
        Ok(self.store.list_conversation(actor.id, other).await?)
    }
}
