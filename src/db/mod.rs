//! MySQL connection pool.
//!
//! The pool mechanics are real: a fixed slot table with an index free list,
//! leases returned on drop, lazy connect on first use. The connection
//! itself is a stub; wire-level MySQL is a collaborator this daemon does
//! not own.

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

use tracing::{debug, trace};

use crate::config::MysqlConfig;
use crate::shutdown::StopToken;

/// Fixed number of connection slots.
const POOL_SLOTS: usize = 128;

/// One pooled connection.
pub struct DbConn {
    config: MysqlConfig,
    connected: bool,
    inserts: u64,
}

impl DbConn {
    fn new(config: MysqlConfig) -> Self {
        Self {
            config,
            connected: false,
            inserts: 0,
        }
    }

    /// Connect on first use; later calls are no-ops.
    pub fn ensure_connected(&mut self) {
        if !self.connected {
            debug!(
                host = %self.config.host,
                port = self.config.port,
                db = %self.config.db_name,
                "opening mysql connection"
            );
            self.connected = true;
        }
    }

    /// Record one row write. The actual INSERT is delegated.
    pub fn record_insert(&mut self) {
        self.ensure_connected();
        self.inserts += 1;
    }

    pub fn insert_count(&self) -> u64 {
        self.inserts
    }
}

struct PoolInner {
    slots: Box<[Option<DbConn>]>,
    free: Vec<u32>,
}

/// Bounded pool of lazily connected MySQL handles.
pub struct DbPool {
    inner: Mutex<PoolInner>,
    config: Option<MysqlConfig>,
    stop: StopToken,
}

impl DbPool {
    /// A pool over `config`, or a disabled pool when persistence is off.
    pub fn new(config: Option<MysqlConfig>, stop: StopToken) -> Self {
        let mut slots = Vec::with_capacity(POOL_SLOTS);
        slots.resize_with(POOL_SLOTS, || None);
        Self {
            inner: Mutex::new(PoolInner {
                slots: slots.into_boxed_slice(),
                free: (0..POOL_SLOTS as u32).rev().collect(),
            }),
            config,
            stop,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Lease a connection. `None` when the pool is disabled, exhausted, or
    /// the daemon is stopping.
    pub fn get(&self) -> Option<DbLease<'_>> {
        let config = self.config.as_ref()?;
        if self.stop.should_stop() {
            return None;
        }
        let mut inner = self.inner.lock().unwrap();
        let idx = inner.free.pop()?;
        let conn = inner.slots[idx as usize]
            .take()
            .unwrap_or_else(|| DbConn::new(config.clone()));
        trace!(slot = idx, "leased db connection");
        Some(DbLease {
            pool: self,
            idx,
            conn: Some(conn),
        })
    }

    /// Rows recorded across all pooled connections.
    pub fn total_inserts(&self) -> u64 {
        let inner = self.inner.lock().unwrap();
        inner
            .slots
            .iter()
            .flatten()
            .map(DbConn::insert_count)
            .sum()
    }

    fn put(&self, idx: u32, conn: DbConn) {
        let mut inner = self.inner.lock().unwrap();
        inner.slots[idx as usize] = Some(conn);
        inner.free.push(idx);
    }
}

/// A leased connection; returns to the pool on drop.
pub struct DbLease<'a> {
    pool: &'a DbPool,
    idx: u32,
    conn: Option<DbConn>,
}

impl Deref for DbLease<'_> {
    type Target = DbConn;
    fn deref(&self) -> &DbConn {
        self.conn.as_ref().expect("lease holds a connection")
    }
}

impl DerefMut for DbLease<'_> {
    fn deref_mut(&mut self) -> &mut DbConn {
        self.conn.as_mut().expect("lease holds a connection")
    }
}

impl Drop for DbLease<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put(self.idx, conn);
        }
    }
}
