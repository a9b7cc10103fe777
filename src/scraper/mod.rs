//! Periodic chat sweep.
//!
//! A dedicated master thread walks the chat list through the client's
//! synchronous query wrapper and schedules one scrape job per supergroup on
//! the shared work queue. The sweep is best effort: query failures end the
//! pass and the master retries after a delay.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::db::DbPool;
use crate::locks::EntityLocks;
use crate::queue::{Job, ScheduleError, WorkQueue, WorkerRef};
use crate::shutdown::StopToken;
use crate::telegram::{Chat, Client, ClientError, Transport};

/// Budget for one synchronous query, in seconds.
const QUERY_SYNC_TIMEOUT: u32 = 150;

/// Chats requested per sweep.
const CHAT_BATCH: i32 = 300;

/// Pause between sweeps, and after a failed one.
const SWEEP_DELAY: Duration = Duration::from_secs(10);

pub struct Scraper<T: Transport> {
    client: Arc<Client<T>>,
    queue: Arc<WorkQueue>,
    db: Arc<DbPool>,
    locks: Arc<EntityLocks>,
    stop: StopToken,
}

impl<T: Transport> Scraper<T> {
    pub fn new(
        client: Arc<Client<T>>,
        queue: Arc<WorkQueue>,
        db: Arc<DbPool>,
        locks: Arc<EntityLocks>,
        stop: StopToken,
    ) -> Self {
        Self {
            client,
            queue,
            db,
            locks,
            stop,
        }
    }

    /// Spawn the master thread.
    pub fn spawn(self) -> thread::JoinHandle<()> {
        thread::Builder::new()
            .name("scraper-master".into())
            .spawn(move || self.run())
            .expect("failed to spawn scraper thread")
    }

    fn run(&self) {
        info!("scraper started");
        while !self.stop.should_stop() {
            match self.sweep() {
                Ok(scheduled) => debug!(scheduled, "chat sweep finished"),
                Err(ClientError::Stopped) => break,
                Err(e) => warn!(error = %e, "chat sweep failed"),
            }
            self.idle_wait();
        }
        info!("scraper exiting");
    }

    /// One pass over the chat list. Returns how many jobs were scheduled.
    fn sweep(&self) -> Result<usize, ClientError> {
        let chat_ids = self.client.get_chats(CHAT_BATCH, QUERY_SYNC_TIMEOUT)?;
        let mut scheduled = 0usize;

        for chat_id in chat_ids {
            if self.stop.should_stop() {
                break;
            }
            let chat = match self.client.get_chat(chat_id, QUERY_SYNC_TIMEOUT) {
                Ok(chat) => chat,
                Err(ClientError::Stopped) => break,
                Err(e) => {
                    debug!(chat_id, error = %e, "skipping unresolvable chat");
                    continue;
                }
            };
            if !chat.is_supergroup() {
                continue;
            }
            if !self.submit(chat) {
                break;
            }
            scheduled += 1;
        }
        Ok(scheduled)
    }

    /// Schedule one scrape job. Returns false once the queue is stopping.
    fn submit(&self, chat: Chat) -> bool {
        let db = Arc::clone(&self.db);
        let locks = Arc::clone(&self.locks);
        let job = Job::new(move |w| scrape_chat(w, &chat, &db, &locks));
        match self.queue.schedule(job) {
            Ok(_) => true,
            Err(ScheduleError::Stopped) => false,
        }
    }

    fn idle_wait(&self) {
        let slices = SWEEP_DELAY.as_millis() as u64 / 250;
        for _ in 0..slices {
            if self.stop.should_stop() {
                return;
            }
            thread::sleep(Duration::from_millis(250));
        }
    }
}

/// Job body: hold the chat lock, lease a connection, record the visit.
/// History fetching belongs to the persistence collaborator.
fn scrape_chat(w: &WorkerRef<'_>, chat: &Chat, db: &DbPool, locks: &EntityLocks) {
    if w.is_stopping() {
        return;
    }
    let Some(chat_lock) = locks.chat_lock(chat.id) else {
        return;
    };
    let _chat = chat_lock.lock().unwrap();

    match db.get() {
        Some(mut conn) => {
            conn.ensure_connected();
            debug!(
                worker = w.index(),
                chat_id = chat.id,
                title = %chat.title,
                "scraping chat"
            );
        }
        None => debug!(chat_id = chat.id, "no db lease, skipping scrape"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::PoolConfig;
    use crate::telegram::{ChatKind, StubTransport};

    #[test]
    fn sweep_surfaces_stub_errors() {
        let stop = StopToken::new();
        let client = Arc::new(Client::new(StubTransport::new(), stop.clone()));
        let queue = Arc::new(
            WorkQueue::new(PoolConfig {
                max_workers: 1,
                max_jobs: 2,
                idle_workers: Some(1),
            })
            .unwrap(),
        );
        let scraper = Scraper::new(
            Arc::clone(&client),
            Arc::clone(&queue),
            Arc::new(DbPool::new(None, stop.clone())),
            Arc::new(EntityLocks::new(stop.clone())),
            stop,
        );

        // Pump the event loop so the stub's error reply is delivered.
        let driver = Arc::clone(&client);
        let pump = thread::spawn(move || {
            for _ in 0..100 {
                driver.process(Duration::from_millis(10));
            }
        });

        let err = scraper.sweep().unwrap_err();
        assert!(matches!(err, ClientError::Api(_)));
        pump.join().unwrap();
    }

    #[test]
    fn submit_respects_queue_shutdown() {
        let stop = StopToken::new();
        let queue = Arc::new(
            WorkQueue::new(PoolConfig {
                max_workers: 1,
                max_jobs: 2,
                idle_workers: Some(1),
            })
            .unwrap(),
        );
        queue.shutdown();
        let scraper = Scraper::new(
            Arc::new(Client::new(StubTransport::new(), stop.clone())),
            Arc::clone(&queue),
            Arc::new(DbPool::new(None, stop.clone())),
            Arc::new(EntityLocks::new(stop.clone())),
            stop,
        );
        let chat = Chat {
            id: -1,
            title: "t".into(),
            kind: ChatKind::Supergroup {
                supergroup_id: 1,
                is_channel: false,
            },
        };
        assert!(!scraper.submit(chat));
    }
}
