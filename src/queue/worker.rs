//! Worker descriptors and lifecycle states.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::thread::JoinHandle;

/// Lifecycle state of one worker slot.
///
/// Transitions: the grower flips `Dead -> Running` right before spawning a
/// thread into the slot; the worker itself moves between `Interruptible`
/// (waiting for work) and `Uninterruptible` (inside a job callback), and
/// publishes `Zombie` as its very last store before the thread returns.
/// The grower joins zombies and flips them back to `Dead`.
///
/// `Interruptible`/`Uninterruptible` exist for diagnostics only: they drive
/// the thread name visible in `ps`/`top`, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Dead = 0,
    Running = 1,
    Interruptible = 2,
    Uninterruptible = 3,
    Zombie = 4,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => WorkerState::Running,
            2 => WorkerState::Interruptible,
            3 => WorkerState::Uninterruptible,
            4 => WorkerState::Zombie,
            _ => WorkerState::Dead,
        }
    }
}

/// One slot in the fixed worker table.
pub(super) struct WorkerSlot {
    index: u32,
    state: AtomicU8,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerSlot {
    pub(super) fn new(index: usize) -> Self {
        Self {
            index: index as u32,
            state: AtomicU8::new(WorkerState::Dead as u8),
            handle: Mutex::new(None),
        }
    }

    pub(super) fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(super) fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(super) fn store_handle(&self, handle: JoinHandle<()>) {
        *self.handle.lock().unwrap() = Some(handle);
    }

    pub(super) fn take_handle(&self) -> Option<JoinHandle<()>> {
        self.handle.lock().unwrap().take()
    }

    pub(super) fn has_handle(&self) -> bool {
        self.handle.lock().unwrap().is_some()
    }

    /// Entering the wait loop. Called only from the slot's own thread.
    pub(super) fn set_interruptible(&self) {
        self.set_state(WorkerState::Interruptible);
        name_current_thread(&format!("tgv-wrk-{}", self.index));
    }

    /// Entering a job callback. Called only from the slot's own thread.
    pub(super) fn set_uninterruptible(&self) {
        self.set_state(WorkerState::Uninterruptible);
        name_current_thread(&format!("tgv-wrk-D-{}", self.index));
    }
}

/// Rename the current thread as seen by the kernel (`comm`, 15 bytes max).
#[cfg(target_os = "linux")]
fn name_current_thread(name: &str) {
    let mut buf = [0u8; 16];
    let bytes = name.as_bytes();
    let len = bytes.len().min(15);
    buf[..len].copy_from_slice(&bytes[..len]);
    unsafe {
        libc::prctl(libc::PR_SET_NAME, buf.as_ptr() as libc::c_ulong, 0, 0, 0);
    }
}

#[cfg(not(target_os = "linux"))]
fn name_current_thread(_name: &str) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips() {
        let slot = WorkerSlot::new(5);
        assert_eq!(slot.state(), WorkerState::Dead);
        for state in [
            WorkerState::Running,
            WorkerState::Interruptible,
            WorkerState::Uninterruptible,
            WorkerState::Zombie,
            WorkerState::Dead,
        ] {
            slot.set_state(state);
            assert_eq!(slot.state(), state);
        }
    }

    #[test]
    fn unknown_raw_state_is_dead() {
        assert_eq!(WorkerState::from_u8(99), WorkerState::Dead);
    }

    #[test]
    fn handle_take_is_one_shot() {
        let slot = WorkerSlot::new(0);
        assert!(!slot.has_handle());
        slot.store_handle(std::thread::spawn(|| {}));
        assert!(slot.has_handle());
        let handle = slot.take_handle().expect("stored above");
        handle.join().unwrap();
        assert!(slot.take_handle().is_none());
    }
}
