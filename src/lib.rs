//! tgvisd - Telegram ingestion daemon.
//!
//! The daemon drives a tdlib-style client event loop on the main thread and
//! fans every received update out to a bounded work queue backed by OS
//! threads. Nothing about an update is processed on the event-loop thread;
//! the loop only packages the update and hands it to the queue.
//!
//! # Architecture
//!
//! - [`telegram`] - the client collaborator: JSON transport seam, update
//!   dispatch, and a synchronous request wrapper for side-channel queries.
//! - [`queue`] - the work-dispatch substrate: fixed job slots, a bounded
//!   ready ring, and a worker pool that grows on demand and shrinks when
//!   idle.
//! - [`ingest`] - glue that turns `updateNewMessage` into queue jobs.
//! - [`scraper`] - a periodic chat sweep that feeds scrape jobs to the same
//!   queue.
//! - [`db`], [`locks`], [`storage`] - thin persistence collaborators.
//!
//! # Example
//!
//! ```rust,ignore
//! use tgvisd::{Config, Daemon};
//! use tgvisd::telegram::StubTransport;
//!
//! let config = Config::from_env()?;
//! let daemon = Daemon::new(config, StubTransport::new())?;
//! daemon.run(true);
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash (8 chars) with optional "-dirty" suffix
pub const BUILD_VERSION: &str = env!("BUILD_VERSION");

/// Full version string: "0.3.0 (abc12345)" or "0.3.0 (abc12345-dirty)"
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_VERSION"), ")");

pub mod config;
pub mod daemon;
pub mod db;
pub mod ingest;
pub mod locks;
pub mod logging;
pub mod queue;
pub mod scraper;
pub mod shutdown;
pub mod storage;
pub mod telegram;

// Re-exports for convenience
pub use config::Config;
pub use daemon::Daemon;
pub use queue::{Job, WorkQueue};
pub use shutdown::StopToken;
