//! Telegram client collaborator.
//!
//! The daemon treats the client library as an external source of updates
//! and a request/response peer. [`Transport`] is the byte seam;
//! [`Client`] adds typed queries, `@extra` correlation and the blocking
//! [`Client::send_query_sync`] used by side channels such as the scraper.

mod client;
mod transport;
mod types;

pub use client::{Client, ClientError};
#[cfg(feature = "tdjson")]
pub use transport::TdJsonTransport;
pub use transport::{StubTransport, Transport};
pub use types::{
    ApiError, Chat, ChatKind, FormattedText, Incoming, Message, MessageContent, MessageSender,
    Query,
};
