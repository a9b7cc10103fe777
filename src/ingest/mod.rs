//! Bridges client updates onto the work queue.
//!
//! The event-loop thread must never do per-update work itself; it packages
//! the update and schedules a job. Backpressure is the queue's problem,
//! update semantics are this module's, and neither leaks into the other.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::db::DbPool;
use crate::locks::EntityLocks;
use crate::queue::{Job, ScheduleError, WorkQueue};
use crate::storage::MessageRecord;
use crate::telegram::{Client, Message, Transport};

pub struct Ingestor {
    queue: Arc<WorkQueue>,
    db: Arc<DbPool>,
    locks: Arc<EntityLocks>,
}

impl Ingestor {
    pub fn new(queue: Arc<WorkQueue>, db: Arc<DbPool>, locks: Arc<EntityLocks>) -> Self {
        Self { queue, db, locks }
    }

    /// Register this ingestor as the client's new-message callback. The
    /// callback owns the ingestor from here on.
    pub fn attach<T: Transport>(self, client: &Client<T>) {
        client.on_new_message(move |msg| self.handle_new_message(msg));
    }

    /// Package one update into a job. Runs on the event-loop thread.
    pub fn handle_new_message(&self, msg: Message) {
        // Don't trash the queue with empty messages.
        if msg.content.is_none() {
            trace!(chat_id = msg.chat_id, "skipping contentless update");
            return;
        }

        let chat_id = msg.chat_id;
        let db = Arc::clone(&self.db);
        let locks = Arc::clone(&self.locks);
        let job = Job::new(move |_w| persist_message(&msg, &db, &locks));

        match self.queue.schedule(job) {
            Ok(_) => {}
            Err(ScheduleError::Stopped) => {
                // The queue already dropped the job and its captured update.
                debug!(chat_id, "dropping update, queue is stopping");
            }
        }
    }
}

/// Job body: serialize against the chat, lease a connection, write the row.
fn persist_message(msg: &Message, db: &DbPool, locks: &EntityLocks) {
    let record = MessageRecord::from_message(msg);

    let Some(chat_lock) = locks.chat_lock(msg.chat_id) else {
        return;
    };
    let _chat = chat_lock.lock().unwrap();

    match db.get() {
        Some(mut conn) => {
            record.save(&mut conn);
        }
        None => trace!(chat_id = msg.chat_id, "no db lease, skipping persist"),
    }
}
