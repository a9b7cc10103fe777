//! Message persistence records.
//!
//! Field extraction from wire messages is done here and is real; the row
//! writes themselves are delegated to the database collaborator.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::trace;

use crate::db::DbConn;
use crate::telegram::{Message, MessageContent, MessageSender};

/// Primary-key reference to whoever sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderKey {
    User(i64),
    Chat(i64),
}

impl SenderKey {
    pub fn from_sender(sender: &MessageSender) -> Self {
        match sender {
            MessageSender::User { user_id } => SenderKey::User(*user_id),
            MessageSender::Chat { chat_id } => SenderKey::Chat(*chat_id),
        }
    }

    /// Resolve the sender's row id. Lookup against the senders table is
    /// delegated; callers treat 0 as "not yet resolved".
    pub fn primary_key(&self, conn: &mut DbConn) -> u64 {
        conn.ensure_connected();
        0
    }
}

/// One row of the messages table, assembled from a wire message.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub chat_id: i64,
    pub sender: SenderKey,
    pub tg_msg_id: i64,
    pub reply_to_tg_msg_id: i64,
    pub msg_type: &'static str,
    pub is_edited: bool,
    pub is_forwarded: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl MessageRecord {
    pub fn from_message(msg: &Message) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self {
            chat_id: msg.chat_id,
            sender: SenderKey::from_sender(&msg.sender_id),
            tg_msg_id: msg.id,
            reply_to_tg_msg_id: msg.reply_to_message_id,
            msg_type: content_type_tag(msg.content.as_ref()),
            is_edited: msg.edit_date != 0,
            is_forwarded: msg.forward_info.is_some(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Write the row. The INSERT itself is the collaborator's job; this
    /// records the write and returns the (unresolved) row id.
    pub fn save(&self, conn: &mut DbConn) -> u64 {
        let sender_pk = self.sender.primary_key(conn);
        conn.record_insert();
        trace!(
            chat_id = self.chat_id,
            tg_msg_id = self.tg_msg_id,
            sender_pk,
            msg_type = self.msg_type,
            "saved message"
        );
        0
    }
}

fn content_type_tag(content: Option<&MessageContent>) -> &'static str {
    match content {
        Some(MessageContent::Text { .. }) => "text",
        Some(MessageContent::Other) => "other",
        None => "none",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::FormattedText;

    fn text_message() -> Message {
        Message {
            id: 99,
            chat_id: -1001,
            sender_id: MessageSender::User { user_id: 7 },
            date: 1_650_000_000,
            edit_date: 0,
            reply_to_message_id: 55,
            forward_info: None,
            content: Some(MessageContent::Text {
                text: FormattedText { text: "hi".into() },
            }),
        }
    }

    #[test]
    fn extracts_row_fields() {
        let record = MessageRecord::from_message(&text_message());
        assert_eq!(record.chat_id, -1001);
        assert_eq!(record.tg_msg_id, 99);
        assert_eq!(record.reply_to_tg_msg_id, 55);
        assert_eq!(record.sender, SenderKey::User(7));
        assert_eq!(record.msg_type, "text");
        assert!(!record.is_edited);
        assert!(!record.is_forwarded);
        assert!(record.created_at > 0);
    }

    #[test]
    fn flags_edits_and_forwards() {
        let mut msg = text_message();
        msg.edit_date = 1_650_000_100;
        msg.forward_info = Some(serde_json::json!({"origin": {}}));
        let record = MessageRecord::from_message(&msg);
        assert!(record.is_edited);
        assert!(record.is_forwarded);
    }

    #[test]
    fn tags_contentless_messages() {
        let mut msg = text_message();
        msg.content = None;
        assert_eq!(MessageRecord::from_message(&msg).msg_type, "none");
        msg.content = Some(MessageContent::Other);
        assert_eq!(MessageRecord::from_message(&msg).msg_type, "other");
    }

    #[test]
    fn chat_sender_key() {
        let mut msg = text_message();
        msg.sender_id = MessageSender::Chat { chat_id: -42 };
        let record = MessageRecord::from_message(&msg);
        assert_eq!(record.sender, SenderKey::Chat(-42));
    }
}
