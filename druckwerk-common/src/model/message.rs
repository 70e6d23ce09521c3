use crate::model::{Id, user::Email};
use serde::{Deserialize, Serialize};
use time::{UtcDateTime, format_description::well_known::Rfc3339};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct MessageMarker;

/// A contact-form submission. Append-only from the public surface; each
/// email address may submit at most once.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct Message {
    pub id: Id<MessageMarker>,
    pub email: Email,
    pub content: String,
    pub created_at: UtcDateTime,
}

impl Message {
    /// The text pushed to the notifier when the message arrives.
    #[must_use]
    pub fn notification_text(&self) -> String {
        let timestamp = self
            .created_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.created_at.to_string());

        format!("New message\n{timestamp}\n{}\n{}", self.email, self.content)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
pub struct CreateMessage {
    pub email: Email,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use crate::model::message::Message;
    use time::macros::utc_datetime;

    #[test]
    fn notification_text_carries_email_and_content() {
        let message = Message {
            id: 1.into(),
            email: crate::model::user::Email::new("writer@example.com".into()).unwrap(),
            content: "hello there".into(),
            created_at: utc_datetime!(2025-06-01 12:00),
        };

        let text = message.notification_text();
        assert!(text.contains("writer@example.com"));
        assert!(text.contains("hello there"));
        assert!(text.contains("2025-06-01T12:00:00Z"));
    }
}
