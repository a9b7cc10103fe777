//! Daemon assembly and lifecycle.
//!
//! Ownership flows one way: the daemon owns the queue, the pool, the lock
//! maps and the client; jobs only hold `Arc` handles to collaborators. At
//! shutdown the queue drains first and the client closes last, so every
//! in-flight callback still has a live client underneath it.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::Config;
use crate::db::DbPool;
use crate::ingest::Ingestor;
use crate::locks::EntityLocks;
use crate::queue::{self, WorkQueue};
use crate::scraper::Scraper;
use crate::shutdown::{install_signal_handlers, StopToken};
use crate::telegram::{Client, Query, Transport};

/// How long one event-loop step waits for a frame.
const LOOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Fatal startup errors.
#[derive(Debug)]
pub enum DaemonError {
    /// Work queue construction parameters were invalid.
    Pool(queue::ConfigError),
    /// Signal handlers could not be installed.
    Signal(io::Error),
}

impl fmt::Display for DaemonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonError::Pool(e) => write!(f, "work queue: {}", e),
            DaemonError::Signal(e) => write!(f, "signal handlers: {}", e),
        }
    }
}

impl std::error::Error for DaemonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DaemonError::Pool(e) => Some(e),
            DaemonError::Signal(e) => Some(e),
        }
    }
}

pub struct Daemon<T: Transport> {
    config: Config,
    stop: StopToken,
    client: Arc<Client<T>>,
    queue: Arc<WorkQueue>,
    db: Arc<DbPool>,
    locks: Arc<EntityLocks>,
}

impl<T: Transport> Daemon<T> {
    /// Build every component; nothing runs until [`run`](Self::run).
    /// Any failure here is fatal to startup.
    pub fn new(config: Config, transport: T) -> Result<Self, DaemonError> {
        let stop = StopToken::new();
        install_signal_handlers(&stop).map_err(DaemonError::Signal)?;

        let queue = WorkQueue::new(config.queue.pool_config()).map_err(DaemonError::Pool)?;
        let db = Arc::new(DbPool::new(config.mysql.clone(), stop.clone()));
        let locks = Arc::new(EntityLocks::new(stop.clone()));
        let client = Arc::new(Client::new(transport, stop.clone()));

        Ok(Self {
            config,
            stop,
            client,
            queue: Arc::new(queue),
            db,
            locks,
        })
    }

    /// The stop token shared with every component.
    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// Start workers, register callbacks and drive the event loop until
    /// the stop token fires, then drain everything in order.
    pub fn run(&self, scrape: bool) {
        self.queue.start();

        Ingestor::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.db),
            Arc::clone(&self.locks),
        )
        .attach(&self.client);

        // Non-interactive half of the client handshake. Authorization
        // against an already-initialized database needs no input.
        let telegram = &self.config.telegram;
        if let Err(e) = self.client.send_query_detached(&Query::SetTdlibParameters {
            api_id: telegram.api_id,
            api_hash: telegram.api_hash.clone(),
            database_directory: telegram.data_path.display().to_string(),
            device_model: "server".into(),
            application_version: crate::PKG_VERSION.into(),
        }) {
            debug!(error = %e, "parameter handshake not sent");
        }

        let scraper = scrape.then(|| {
            Scraper::new(
                Arc::clone(&self.client),
                Arc::clone(&self.queue),
                Arc::clone(&self.db),
                Arc::clone(&self.locks),
                self.stop.clone(),
            )
            .spawn()
        });

        info!("entering event loop");
        while !self.stop.should_stop() {
            self.client.process(LOOP_TIMEOUT);
        }

        info!("event loop exited, draining workers");
        self.queue.shutdown();
        self.queue.join();

        if let Some(handle) = scraper {
            let _ = handle.join();
        }

        // Workers are gone; nothing can touch the client past this point.
        self.client.close();

        info!(
            inserts = self.db.total_inserts(),
            chat_locks = self.locks.chat_lock_count(),
            user_locks = self.locks.user_lock_count(),
            "daemon stopped"
        );
    }
}
