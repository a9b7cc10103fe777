//! Client driver: update dispatch, query correlation, synchronous requests.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tracing::{trace, warn};

use super::transport::Transport;
use super::types::{ApiError, Chat, Frame, Incoming, Message, Query, QueryFrame};
use crate::shutdown::StopToken;

/// Errors surfaced by client operations.
#[derive(Debug)]
pub enum ClientError {
    /// Query could not be serialized.
    Encode(serde_json::Error),
    /// The client library answered with an error object.
    Api(ApiError),
    /// No reply arrived within the caller's budget.
    Timeout { seconds: u32 },
    /// The reply had an unexpected type.
    UnexpectedReply { expected: &'static str },
    /// The daemon is stopping; the wait was abandoned.
    Stopped,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Encode(e) => write!(f, "failed to encode query: {}", e),
            ClientError::Api(e) => write!(f, "{}", e),
            ClientError::Timeout { seconds } => {
                write!(f, "no reply within {}s", seconds)
            }
            ClientError::UnexpectedReply { expected } => {
                write!(f, "unexpected reply type, wanted {}", expected)
            }
            ClientError::Stopped => write!(f, "client is stopping"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Encode(e)
    }
}

type ResponseHandler = Box<dyn FnOnce(Incoming) + Send>;
type UpdateHandler = Box<dyn Fn(Message) + Send + Sync>;

/// Completion record for one synchronous query.
///
/// Owned via `Arc` by both the waiting caller and the response handler, so
/// it outlives whichever side finishes first. The response path signals it
/// exactly once.
struct SyncCall {
    slot: Mutex<Option<Incoming>>,
    cond: Condvar,
    finished: AtomicBool,
}

impl SyncCall {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            cond: Condvar::new(),
            finished: AtomicBool::new(false),
        }
    }

    fn complete(&self, reply: Incoming) {
        *self.slot.lock().unwrap() = Some(reply);
        self.finished.store(true, Ordering::Release);
        self.cond.notify_one();
    }
}

/// Driver around a [`Transport`].
///
/// One thread (the daemon event loop) calls [`process`](Self::process)
/// repeatedly; any thread may send queries or register the update callback.
pub struct Client<T: Transport> {
    transport: T,
    next_query_id: AtomicU64,
    handlers: Mutex<HashMap<u64, ResponseHandler>>,
    update_handler: Mutex<Option<UpdateHandler>>,
    stop: StopToken,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, stop: StopToken) -> Self {
        Self {
            transport,
            next_query_id: AtomicU64::new(1),
            handlers: Mutex::new(HashMap::new()),
            update_handler: Mutex::new(None),
            stop,
        }
    }

    /// Register the callback invoked for every `updateNewMessage`.
    pub fn on_new_message<F>(&self, callback: F)
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        *self.update_handler.lock().unwrap() = Some(Box::new(callback));
    }

    /// Send a query; `handler` runs on the event-loop thread when the reply
    /// arrives. Returns the query id.
    pub fn send_query<F>(&self, query: &Query, handler: F) -> Result<u64, ClientError>
    where
        F: FnOnce(Incoming) + Send + 'static,
    {
        let id = self.next_query_id.fetch_add(1, Ordering::Relaxed);
        let frame = QueryFrame {
            extra: id,
            query,
        };
        let payload = serde_json::to_string(&frame)?;
        self.handlers.lock().unwrap().insert(id, Box::new(handler));
        self.transport.send(payload);
        Ok(id)
    }

    /// Send a query without caring about the reply.
    pub fn send_query_detached(&self, query: &Query) -> Result<(), ClientError> {
        let frame = QueryFrame {
            extra: self.next_query_id.fetch_add(1, Ordering::Relaxed),
            query,
        };
        self.transport.send(serde_json::to_string(&frame)?);
        Ok(())
    }

    /// Send a query and block until its reply, an error, a timeout, or
    /// daemon stop, whichever comes first.
    ///
    /// The wait runs in one-second slices counted against `timeout_secs`,
    /// re-checking the stop token after every slice. If the reply arrives
    /// after the caller gave up, the completion record is still alive (the
    /// handler owns an `Arc` to it) and the late signal is harmless.
    pub fn send_query_sync(&self, query: &Query, timeout_secs: u32) -> Result<Incoming, ClientError> {
        let call = Arc::new(SyncCall::new());
        let call2 = Arc::clone(&call);
        self.send_query(query, move |reply| call2.complete(reply))?;

        let mut guard = call.slot.lock().unwrap();
        let mut waited = 0u32;
        while !call.finished.load(Ordering::Acquire) {
            if self.stop.should_stop() {
                return Err(ClientError::Stopped);
            }
            if waited >= timeout_secs {
                return Err(ClientError::Timeout {
                    seconds: timeout_secs,
                });
            }
            let (g, _) = call
                .cond
                .wait_timeout(guard, Duration::from_secs(1))
                .unwrap();
            guard = g;
            waited += 1;
        }

        match guard.take() {
            Some(Incoming::Error(e)) => Err(ClientError::Api(e)),
            Some(reply) => Ok(reply),
            None => Err(ClientError::Timeout {
                seconds: timeout_secs,
            }),
        }
    }

    /// Fetch up to `limit` chat ids from the main chat list.
    pub fn get_chats(&self, limit: i32, timeout_secs: u32) -> Result<Vec<i64>, ClientError> {
        match self.send_query_sync(&Query::GetChats { limit }, timeout_secs)? {
            Incoming::Chats { chat_ids, .. } => Ok(chat_ids),
            _ => Err(ClientError::UnexpectedReply { expected: "chats" }),
        }
    }

    /// Resolve one chat.
    pub fn get_chat(&self, chat_id: i64, timeout_secs: u32) -> Result<Chat, ClientError> {
        match self.send_query_sync(&Query::GetChat { chat_id }, timeout_secs)? {
            Incoming::Chat(chat) => Ok(chat),
            _ => Err(ClientError::UnexpectedReply { expected: "chat" }),
        }
    }

    /// One event-loop step: receive a frame and dispatch it. Returns
    /// whether a frame was processed.
    pub fn process(&self, timeout: Duration) -> bool {
        let Some(raw) = self.transport.receive(timeout) else {
            return false;
        };
        let frame: Frame = match serde_json::from_str(&raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "unparseable frame from transport");
                return true;
            }
        };

        if let Some(extra) = frame.extra {
            if let Some(handler) = self.handlers.lock().unwrap().remove(&extra) {
                handler(frame.payload);
                return true;
            }
        }

        match frame.payload {
            Incoming::UpdateNewMessage { message } => {
                if let Some(callback) = &*self.update_handler.lock().unwrap() {
                    callback(message);
                }
            }
            other => trace!(?other, "ignoring unhandled frame"),
        }
        true
    }

    /// Close the underlying transport. Call after workers are drained so
    /// in-flight callbacks finish against a live client.
    pub fn close(&self) {
        self.transport.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::StubTransport;
    use std::sync::atomic::AtomicUsize;

    fn client() -> Client<StubTransport> {
        Client::new(StubTransport::new(), StopToken::new())
    }

    #[test]
    fn sync_query_gets_stub_error() {
        let client = Arc::new(client());
        let driver = Arc::clone(&client);
        let pump = std::thread::spawn(move || {
            // Drive the event loop until the reply lands.
            for _ in 0..50 {
                driver.process(Duration::from_millis(20));
            }
        });

        let err = client
            .send_query_sync(&Query::GetChats { limit: 10 }, 5)
            .unwrap_err();
        assert!(matches!(err, ClientError::Api(ApiError { code: 503, .. })));
        pump.join().unwrap();
    }

    #[test]
    fn sync_query_times_out_without_event_loop() {
        // Nobody pumps process(), so the reply never lands.
        let client = client();
        let err = client
            .send_query_sync(&Query::GetChat { chat_id: 1 }, 1)
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout { seconds: 1 }));
    }

    #[test]
    fn sync_query_aborts_on_stop() {
        let stop = StopToken::new();
        let client = Client::new(StubTransport::new(), stop.clone());
        stop.stop();
        let err = client
            .send_query_sync(&Query::GetChat { chat_id: 1 }, 30)
            .unwrap_err();
        assert!(matches!(err, ClientError::Stopped));
    }

    /// Transport yielding a fixed script of frames, newest first.
    struct ScriptedTransport {
        frames: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(frames: &[&str]) -> Self {
            let mut frames: Vec<String> = frames.iter().map(|s| s.to_string()).collect();
            frames.reverse();
            Self {
                frames: Mutex::new(frames),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn send(&self, _payload: String) {}
        fn receive(&self, _timeout: Duration) -> Option<String> {
            self.frames.lock().unwrap().pop()
        }
        fn close(&self) {}
    }

    #[test]
    fn update_callback_receives_messages() {
        let update = r#"{
            "@type": "updateNewMessage",
            "message": {
                "id": 1,
                "chat_id": -5,
                "sender_id": {"@type": "messageSenderUser", "user_id": 2},
                "content": {"@type": "messageText", "text": {"text": "x"}}
            }
        }"#;
        let noise = r#"{"@type": "updateChatPhoto", "chat_id": 9}"#;
        let client = Client::new(
            ScriptedTransport::new(&[noise, update]),
            StopToken::new(),
        );
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);
        client.on_new_message(move |msg| {
            assert_eq!(msg.chat_id, -5);
            seen2.fetch_add(1, Ordering::SeqCst);
        });

        assert!(client.process(Duration::from_millis(10))); // noise, ignored
        assert!(client.process(Duration::from_millis(10))); // the update
        assert!(!client.process(Duration::from_millis(10))); // script drained
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
