//! Cooperative stop token and Unix signal wiring.
//!
//! Every blocking loop in the daemon re-checks the token after each wake,
//! so raising it is all a signal handler needs to do.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared cancellation flag. Cloning is cheap; all clones observe the same
/// flag.
#[derive(Clone, Debug, Default)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Async-signal-safe: a single atomic store.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn should_stop(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Token the signal handler writes through. The first installation wins;
/// later calls reuse it.
static SIGNAL_TOKEN: OnceLock<StopToken> = OnceLock::new();

#[cfg(unix)]
extern "C" fn on_signal(_sig: libc::c_int) {
    // Only async-signal-safe operations here: one atomic load of the
    // OnceLock slot, one atomic store.
    if let Some(token) = SIGNAL_TOKEN.get() {
        token.stop();
    }
}

/// Route `SIGINT`, `SIGHUP` and `SIGTERM` to `token`.
#[cfg(unix)]
pub fn install_signal_handlers(token: &StopToken) -> io::Result<()> {
    let _ = SIGNAL_TOKEN.set(token.clone());

    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = on_signal as usize;
        libc::sigemptyset(&mut sa.sa_mask);
        for sig in [libc::SIGINT, libc::SIGHUP, libc::SIGTERM] {
            if libc::sigaction(sig, &sa, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn install_signal_handlers(_token: &StopToken) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_lowered() {
        let token = StopToken::new();
        assert!(!token.should_stop());
    }

    #[test]
    fn clones_share_the_flag() {
        let token = StopToken::new();
        let clone = token.clone();
        clone.stop();
        assert!(token.should_stop());
        assert!(clone.should_stop());
    }
}
