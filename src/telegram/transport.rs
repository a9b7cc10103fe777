//! Transport seam between the client and the wire.
//!
//! Production builds link the native tdjson library behind the `tdjson`
//! feature. Everything else (tests, feature-less builds) uses
//! [`StubTransport`], which answers every query with an error object and
//! never produces updates.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use tracing::trace;

/// Byte-oriented, thread-safe channel to the client library.
///
/// `send` may be called from any thread. `receive` is driven by a single
/// thread (the daemon event loop) and blocks up to the given timeout.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, payload: String);
    fn receive(&self, timeout: Duration) -> Option<String>;
    fn close(&self);
}

/// Transport that rejects every query and yields no updates.
///
/// Lets the daemon run end to end without the native library: queries get
/// an `error` reply carrying their `@extra`, so synchronous callers fail
/// fast instead of waiting out their timeout.
pub struct StubTransport {
    inner: Mutex<StubState>,
    cond: Condvar,
}

struct StubState {
    closed: bool,
    replies: VecDeque<String>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StubState {
                closed: false,
                replies: VecDeque::new(),
            }),
            cond: Condvar::new(),
        }
    }
}

impl Default for StubTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for StubTransport {
    fn send(&self, payload: String) {
        trace!(payload = %payload, "stub transport rejecting query");
        let extra = serde_json::from_str::<serde_json::Value>(&payload)
            .ok()
            .and_then(|v| v.get("@extra").and_then(|e| e.as_u64()));
        let reply = match extra {
            Some(extra) => format!(
                r#"{{"@type":"error","code":503,"message":"stub transport","@extra":{}}}"#,
                extra
            ),
            None => r#"{"@type":"error","code":503,"message":"stub transport"}"#.into(),
        };
        let mut state = self.inner.lock().unwrap();
        if state.closed {
            return;
        }
        state.replies.push_back(reply);
        self.cond.notify_one();
    }

    fn receive(&self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.lock().unwrap();
        loop {
            if let Some(reply) = state.replies.pop_front() {
                return Some(reply);
            }
            if state.closed {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self.cond.wait_timeout(state, deadline - now).unwrap();
            state = guard;
        }
    }

    fn close(&self) {
        let mut state = self.inner.lock().unwrap();
        state.closed = true;
        state.replies.clear();
        self.cond.notify_all();
    }
}

#[cfg(feature = "tdjson")]
pub use tdjson::TdJsonTransport;

#[cfg(feature = "tdjson")]
mod tdjson {
    use super::Transport;
    use std::ffi::{CStr, CString};
    use std::os::raw::{c_char, c_double, c_void};
    use std::sync::Mutex;
    use std::time::Duration;

    use tracing::warn;

    extern "C" {
        fn td_json_client_create() -> *mut c_void;
        fn td_json_client_send(client: *mut c_void, request: *const c_char);
        fn td_json_client_receive(client: *mut c_void, timeout: c_double) -> *const c_char;
        fn td_json_client_destroy(client: *mut c_void);
    }

    /// Transport over the native tdjson client.
    pub struct TdJsonTransport {
        client: *mut c_void,
        /// Serializes `receive`: the returned pointer is only valid until
        /// the next `td_json_client_receive` call on the same client.
        recv_lock: Mutex<()>,
    }

    // SAFETY: tdjson documents td_json_client_send as callable from any
    // thread and td_json_client_receive as callable from one thread at a
    // time, which recv_lock enforces.
    unsafe impl Send for TdJsonTransport {}
    unsafe impl Sync for TdJsonTransport {}

    impl TdJsonTransport {
        pub fn new() -> Self {
            Self {
                client: unsafe { td_json_client_create() },
                recv_lock: Mutex::new(()),
            }
        }
    }

    impl Transport for TdJsonTransport {
        fn send(&self, payload: String) {
            let Ok(payload) = CString::new(payload) else {
                warn!("query contained an interior NUL byte, dropping");
                return;
            };
            unsafe { td_json_client_send(self.client, payload.as_ptr()) };
        }

        fn receive(&self, timeout: Duration) -> Option<String> {
            let _serialized = self.recv_lock.lock().unwrap();
            let raw = unsafe { td_json_client_receive(self.client, timeout.as_secs_f64()) };
            if raw.is_null() {
                return None;
            }
            let text = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
            Some(text)
        }

        fn close(&self) {
            self.send(r#"{"@type":"close"}"#.to_string());
        }
    }

    impl Drop for TdJsonTransport {
        fn drop(&mut self) {
            unsafe { td_json_client_destroy(self.client) };
        }
    }
}
