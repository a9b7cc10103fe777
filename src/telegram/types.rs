//! Wire objects exchanged with the client library.
//!
//! The transport speaks line-delimited JSON in the tdjson style: every
//! object carries a `@type` tag, and replies to queries echo the `@extra`
//! correlation id the daemon attached. Only the handful of objects the
//! daemon actually touches are modeled; everything else deserializes to an
//! `Unknown`/`Other` catch-all and is ignored.

use serde::{Deserialize, Serialize};

/// Objects the daemon can receive: updates, query replies, errors.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "@type")]
pub enum Incoming {
    #[serde(rename = "updateNewMessage")]
    UpdateNewMessage { message: Message },
    #[serde(rename = "chats")]
    Chats {
        chat_ids: Vec<i64>,
        #[serde(default)]
        total_count: i32,
    },
    #[serde(rename = "chat")]
    Chat(Chat),
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "error")]
    Error(ApiError),
    #[serde(other)]
    Unknown,
}

/// Queries the daemon sends.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "@type")]
pub enum Query {
    #[serde(rename = "getChats")]
    GetChats { limit: i32 },
    #[serde(rename = "getChat")]
    GetChat { chat_id: i64 },
    #[serde(rename = "setTdlibParameters")]
    SetTdlibParameters {
        api_id: u32,
        api_hash: String,
        database_directory: String,
        device_model: String,
        application_version: String,
    },
    #[serde(rename = "close")]
    Close,
}

/// An incoming frame: payload plus the optional correlation id.
#[derive(Deserialize, Debug)]
pub(super) struct Frame {
    #[serde(rename = "@extra")]
    pub extra: Option<u64>,
    #[serde(flatten)]
    pub payload: Incoming,
}

/// An outgoing frame: query plus correlation id.
#[derive(Serialize)]
pub(super) struct QueryFrame<'a> {
    #[serde(rename = "@extra")]
    pub extra: u64,
    #[serde(flatten)]
    pub query: &'a Query,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub chat_id: i64,
    pub sender_id: MessageSender,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub edit_date: i64,
    #[serde(default)]
    pub reply_to_message_id: i64,
    /// Present when the message was forwarded; kept opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_info: Option<serde_json::Value>,
    #[serde(default)]
    pub content: Option<MessageContent>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "@type")]
pub enum MessageSender {
    #[serde(rename = "messageSenderUser")]
    User { user_id: i64 },
    #[serde(rename = "messageSenderChat")]
    Chat { chat_id: i64 },
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "@type")]
pub enum MessageContent {
    #[serde(rename = "messageText")]
    Text { text: FormattedText },
    #[serde(other)]
    Other,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FormattedText {
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Chat {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ChatKind,
}

impl Chat {
    pub fn is_supergroup(&self) -> bool {
        matches!(self.kind, ChatKind::Supergroup { .. })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "@type")]
pub enum ChatKind {
    #[serde(rename = "chatTypeSupergroup")]
    Supergroup {
        supergroup_id: i64,
        #[serde(default)]
        is_channel: bool,
    },
    #[serde(rename = "chatTypeBasicGroup")]
    BasicGroup { basic_group_id: i64 },
    #[serde(rename = "chatTypePrivate")]
    Private { user_id: i64 },
    #[serde(other)]
    Other,
}

/// Error object returned by the client library.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "telegram error {}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_new_message_update() {
        let raw = r#"{
            "@type": "updateNewMessage",
            "message": {
                "id": 42,
                "chat_id": -1001,
                "sender_id": {"@type": "messageSenderUser", "user_id": 7},
                "date": 1650000000,
                "content": {"@type": "messageText", "text": {"text": "hi"}}
            }
        }"#;
        let frame: Frame = serde_json::from_str(raw).expect("valid update");
        assert_eq!(frame.extra, None);
        let Incoming::UpdateNewMessage { message } = frame.payload else {
            panic!("wrong variant");
        };
        assert_eq!(message.id, 42);
        assert_eq!(message.chat_id, -1001);
        assert_eq!(message.sender_id, MessageSender::User { user_id: 7 });
        assert!(matches!(
            message.content,
            Some(MessageContent::Text { .. })
        ));
    }

    #[test]
    fn parses_reply_with_extra() {
        let raw = r#"{"@type": "chats", "chat_ids": [1, 2, 3], "total_count": 3, "@extra": 9}"#;
        let frame: Frame = serde_json::from_str(raw).expect("valid reply");
        assert_eq!(frame.extra, Some(9));
        assert!(matches!(frame.payload, Incoming::Chats { ref chat_ids, .. } if chat_ids.len() == 3));
    }

    #[test]
    fn unknown_updates_do_not_fail() {
        let raw = r#"{"@type": "updateChatPhoto", "chat_id": 5}"#;
        let frame: Frame = serde_json::from_str(raw).expect("catch-all");
        assert!(matches!(frame.payload, Incoming::Unknown));
    }

    #[test]
    fn unknown_content_is_other() {
        let raw = r#"{"@type": "messageSticker", "sticker": {}}"#;
        let content: MessageContent = serde_json::from_str(raw).expect("catch-all");
        assert!(matches!(content, MessageContent::Other));
    }

    #[test]
    fn chat_kind_detection() {
        let raw = r#"{
            "id": -100,
            "title": "kernel talk",
            "type": {"@type": "chatTypeSupergroup", "supergroup_id": 100, "is_channel": false}
        }"#;
        let chat: Chat = serde_json::from_str(raw).expect("valid chat");
        assert!(chat.is_supergroup());

        let raw = r#"{"id": 7, "type": {"@type": "chatTypePrivate", "user_id": 7}}"#;
        let chat: Chat = serde_json::from_str(raw).expect("valid chat");
        assert!(!chat.is_supergroup());
    }

    #[test]
    fn query_frame_carries_extra() {
        let query = Query::GetChat { chat_id: 11 };
        let frame = QueryFrame {
            extra: 4,
            query: &query,
        };
        let raw = serde_json::to_string(&frame).expect("serializes");
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["@type"], "getChat");
        assert_eq!(value["@extra"], 4);
        assert_eq!(value["chat_id"], 11);
    }
}
