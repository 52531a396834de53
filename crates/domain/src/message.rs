//! Direct messages between users.

use chrono::{DateTime, Utc};
use common::{MessageId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Returns true if the message was exchanged between `a` and `b`, in either direction.
    pub fn is_between(&self, a: UserId, b: UserId) -> bool {
        (self.sender_id == a && self.receiver_id == b)
            || (self.sender_id == b && self.receiver_id == a)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    pub receiver_id: UserId,
    pub content: String,
}

impl NewMessage {
    pub fn into_message(self, sender_id: UserId, now: DateTime<Utc>) -> Result<Message, DomainError> {
        if self.receiver_id == sender_id {
            return Err(DomainError::validation("cannot send a message to yourself"));
        }
        let content = self.content.trim().to_string();
        if content.is_empty() {
            return Err(DomainError::validation("content must not be empty"));
        }

        Ok(Message {
            id: MessageId::new(),
            sender_id,
            receiver_id: self.receiver_id,
            content,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_self_message() {
        let me = UserId::new();
        let input = NewMessage {
            receiver_id: me,
            content: "hi".to_string(),
        };
        assert!(input.into_message(me, Utc::now()).is_err());
    }

    #[test]
    fn test_is_between_either_direction() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let message = NewMessage {
            receiver_id: b,
            content: "hello".to_string(),
        }
        .into_message(a, Utc::now())
        .unwrap();

        assert!(message.is_between(a, b));
        assert!(message.is_between(b, a));
        assert!(!message.is_between(a, c));
    }
}
