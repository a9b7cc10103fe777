//! Work-dispatch substrate.
//!
//! A bounded job table with a dynamically sized worker pool. Producers never
//! allocate past the fixed slot count; when every slot is taken they either
//! block until a worker frees one ([`WorkQueue::schedule`]) or bail out
//! ([`WorkQueue::try_schedule`]).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         WorkQueue                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  schedule() ──▶ free stack ──▶ job slots ──▶ ready ring      │
//! │                     ▲                            │           │
//! │                     │                            ▼           │
//! │              ┌──────┴──────┐              ┌─────────────┐    │
//! │              │ slot return │ ◀─────────── │  Worker 0..N │   │
//! │              └─────────────┘              └──────┬──────┘    │
//! │                                                  │           │
//! │      grower: joins zombies, spawns workers ◀─────┘           │
//! │      above the idle baseline while a backlog exists          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The idle baseline is paid for at all times; workers above it are spawned
//! by the grower when a backlog appears and retire after idling too long.

mod dispatch;
mod error;
mod job;
mod slots;
mod worker;

pub use dispatch::{PoolConfig, WorkQueue};
pub use error::{ConfigError, ScheduleError, TryScheduleError};
pub use job::{Job, JobId, WorkerRef};
pub use worker::WorkerState;
