//! The dispatcher: producer API, worker loop, and the grower.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, trace};

use super::error::{ConfigError, ScheduleError, TryScheduleError};
use super::job::{Job, JobId, WorkerRef};
use super::slots::{FreeStack, ReadyRing};
use super::worker::{WorkerSlot, WorkerState};

/// Timed wait used by idle workers between ready-ring checks.
const WORKER_WAIT: Duration = Duration::from_secs(1);

/// Timed wait used by producers blocked on a full job table.
const SLOT_WAIT: Duration = Duration::from_secs(1);

/// Grower wake interval when no job signal arrives.
const GROWER_WAIT: Duration = Duration::from_secs(10);

/// Consecutive idle waits an elastic worker tolerates before retiring.
const MAX_IDLE_STRIKES: u32 = 300;

/// Pool construction parameters. Sizes are fixed for the pool's lifetime.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Worker ceiling, pinned plus elastic.
    pub max_workers: usize,
    /// Job slot count; the hard bound on queued plus in-flight jobs.
    pub max_jobs: usize,
    /// Always-on worker count. `None` picks `max_workers / 2`, at least 1.
    pub idle_workers: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 64,
            max_jobs: 4096,
            idle_workers: None,
        }
    }
}

impl PoolConfig {
    fn resolve(&self) -> Result<(usize, usize, usize), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.max_jobs == 0 {
            return Err(ConfigError::ZeroJobs);
        }
        let idle = match self.idle_workers {
            None => (self.max_workers / 2).max(1),
            Some(b) if b == 0 || b > self.max_workers => {
                return Err(ConfigError::BaselineOutOfRange {
                    baseline: b,
                    max: self.max_workers,
                })
            }
            Some(b) => b,
        };
        Ok((self.max_workers, self.max_jobs, idle))
    }
}

/// The three index collections, serialized by one lock.
struct JobTable {
    slots: Box<[Option<Job>]>,
    free: FreeStack,
    ready: ReadyRing,
}

struct Shared {
    jobs: Mutex<JobTable>,
    /// Wakes workers and the grower when a job is queued, and everyone at
    /// shutdown.
    jobs_cond: Condvar,
    /// Hosts the free-slot condition only; never nested with `jobs`.
    slot_lock: Mutex<()>,
    slot_cond: Condvar,
    stop: AtomicBool,
    running: AtomicU32,
    waiting_for_slot: AtomicU32,
    workers: Box<[WorkerSlot]>,
    max_workers: usize,
    idle_workers: usize,
    max_jobs: usize,
}

/// Bounded work queue with a dynamically sized worker pool.
///
/// Dropping the queue performs a full stop and join: workers and the grower
/// are signalled, drained and joined, and jobs still queued at that point
/// are dropped, running their payload destructors.
pub struct WorkQueue {
    shared: Arc<Shared>,
    grower: Mutex<Option<thread::JoinHandle<()>>>,
    started: AtomicBool,
}

impl std::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue").finish_non_exhaustive()
    }
}

impl WorkQueue {
    /// Validate `config` and allocate the job and worker tables.
    ///
    /// No threads are spawned until [`start`](Self::start).
    pub fn new(config: PoolConfig) -> Result<Self, ConfigError> {
        let (max_workers, max_jobs, idle_workers) = config.resolve()?;

        let mut slots = Vec::with_capacity(max_jobs);
        slots.resize_with(max_jobs, || None);
        let workers: Vec<WorkerSlot> = (0..max_workers).map(WorkerSlot::new).collect();

        let shared = Arc::new(Shared {
            jobs: Mutex::new(JobTable {
                slots: slots.into_boxed_slice(),
                free: FreeStack::full(max_jobs),
                ready: ReadyRing::with_capacity(max_jobs),
            }),
            jobs_cond: Condvar::new(),
            slot_lock: Mutex::new(()),
            slot_cond: Condvar::new(),
            stop: AtomicBool::new(false),
            running: AtomicU32::new(0),
            waiting_for_slot: AtomicU32::new(0),
            workers: workers.into_boxed_slice(),
            max_workers,
            idle_workers,
            max_jobs,
        });

        Ok(Self {
            shared,
            grower: Mutex::new(None),
            started: AtomicBool::new(false),
        })
    }

    /// Spawn the pinned workers and, if the ceiling leaves room for elastic
    /// workers, the grower. Idempotent.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }

        for index in 0..self.shared.idle_workers {
            spawn_worker(&self.shared, index);
        }

        if self.shared.idle_workers < self.shared.max_workers {
            let shared = Arc::clone(&self.shared);
            let handle = thread::Builder::new()
                .name("tgv-wq-grower".into())
                .spawn(move || grower_loop(&shared))
                .expect("failed to spawn grower thread");
            *self.grower.lock().unwrap() = Some(handle);
        }

        info!(
            idle = self.shared.idle_workers,
            max = self.shared.max_workers,
            jobs = self.shared.max_jobs,
            "work queue started"
        );
    }

    /// Queue a job without blocking.
    ///
    /// On success the job occupies one slot and its id is the slot index.
    /// When the table is full the job is handed back inside
    /// [`TryScheduleError::Full`]; when the pool is stopping the job is
    /// dropped and [`TryScheduleError::Stopped`] is returned.
    pub fn try_schedule(&self, job: Job) -> Result<JobId, TryScheduleError> {
        let id;
        {
            let mut table = self.shared.jobs.lock().unwrap();
            if self.shared.stop.load(Ordering::Acquire) {
                drop(table);
                drop(job);
                return Err(TryScheduleError::Stopped);
            }
            let Some(idx) = table.free.pop() else {
                return Err(TryScheduleError::Full(job));
            };
            table.slots[idx as usize] = Some(job);
            table.ready.push(idx);
            id = idx;
        }
        self.shared.jobs_cond.notify_one();
        Ok(id)
    }

    /// Queue a job, blocking while the table is full.
    ///
    /// A blocked producer is woken by workers returning slots; the wait is
    /// timed so a missed wakeup costs at most [`SLOT_WAIT`] before the
    /// retry. Returns [`ScheduleError::Stopped`] (job dropped) once the
    /// pool is shutting down.
    pub fn schedule(&self, mut job: Job) -> Result<JobId, ScheduleError> {
        loop {
            match self.try_schedule(job) {
                Ok(id) => return Ok(id),
                Err(TryScheduleError::Stopped) => return Err(ScheduleError::Stopped),
                Err(TryScheduleError::Full(back)) => {
                    job = back;
                    self.wait_for_free_slot();
                }
            }
        }
    }

    fn wait_for_free_slot(&self) {
        self.shared.waiting_for_slot.fetch_add(1, Ordering::AcqRel);
        let guard = self.shared.slot_lock.lock().unwrap();
        let _ = self.shared.slot_cond.wait_timeout(guard, SLOT_WAIT).unwrap();
        self.shared.waiting_for_slot.fetch_sub(1, Ordering::AcqRel);
    }

    /// Flip the stop flag and wake every waiter. Idempotent; does not wait.
    pub fn shutdown(&self) {
        if self.shared.stop.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("shutting down work queue");
        self.shared.jobs_cond.notify_all();
        self.shared.slot_cond.notify_all();
    }

    /// Join the grower and every worker thread. Call after
    /// [`shutdown`](Self::shutdown); dropping the queue does both.
    pub fn join(&self) {
        if let Some(handle) = self.grower.lock().unwrap().take() {
            let _ = handle.join();
        }
        for slot in self.shared.workers.iter() {
            if let Some(handle) = slot.take_handle() {
                let _ = handle.join();
            }
            slot.set_state(WorkerState::Dead);
        }
    }

    /// Whether the stop flag has been raised.
    pub fn is_stopping(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }

    /// Job slot count.
    pub fn capacity(&self) -> usize {
        self.shared.max_jobs
    }

    /// Worker ceiling.
    pub fn max_workers(&self) -> usize {
        self.shared.max_workers
    }

    /// Always-on worker count.
    pub fn idle_workers(&self) -> usize {
        self.shared.idle_workers
    }

    /// Workers currently inside their loop.
    pub fn running_workers(&self) -> usize {
        self.shared.running.load(Ordering::Acquire) as usize
    }

    /// Jobs queued but not yet claimed by a worker.
    pub fn pending_jobs(&self) -> usize {
        self.shared.jobs.lock().unwrap().ready.len()
    }

    /// Lifecycle state of worker `index`, for diagnostics.
    pub fn worker_state(&self, index: usize) -> Option<WorkerState> {
        self.shared.workers.get(index).map(|w| w.state())
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}

/// Flip the slot to `Running` and spawn its thread. Pinned slots are spawned
/// once by `start`; elastic slots only ever by the grower thread, so no two
/// spawns race on one slot.
fn spawn_worker(shared: &Arc<Shared>, index: usize) {
    let slot = &shared.workers[index];
    slot.set_state(WorkerState::Running);
    let shared2 = Arc::clone(shared);
    let handle = thread::Builder::new()
        .name(format!("tgv-wrk-{index}"))
        .spawn(move || worker_loop(&shared2, index))
        .expect("failed to spawn worker thread");
    slot.store_handle(handle);
}

fn worker_loop(shared: &Shared, index: usize) {
    shared.running.fetch_add(1, Ordering::AcqRel);
    run_worker(shared, index);
    shared.running.fetch_sub(1, Ordering::AcqRel);
    // Zombie is the thread's final store: the grower's join happens-after
    // the loop released the job-table lock.
    shared.workers[index].set_state(WorkerState::Zombie);
    debug!(worker = index, "worker exiting");
}

fn run_worker(shared: &Shared, index: usize) {
    let me = &shared.workers[index];
    let mut idle_strikes = 0u32;

    let mut table = shared.jobs.lock().unwrap();
    me.set_interruptible();

    while !shared.stop.load(Ordering::Acquire) {
        while let Some(idx) = table.ready.pop() {
            let job = table.slots[idx as usize].take();
            drop(table);

            if let Some(job) = job {
                me.set_uninterruptible();
                run_job(shared, index, job);
                me.set_interruptible();
            }

            table = shared.jobs.lock().unwrap();
            table.free.push(idx);
            if shared.waiting_for_slot.load(Ordering::Acquire) > 0 {
                shared.slot_cond.notify_one();
            }
            idle_strikes = 0;
        }

        if shared.stop.load(Ordering::Acquire) {
            break;
        }

        let (guard, timeout) = shared
            .jobs_cond
            .wait_timeout(table, WORKER_WAIT)
            .unwrap();
        table = guard;

        if timeout.timed_out() && index >= shared.idle_workers {
            idle_strikes += 1;
            if idle_strikes > MAX_IDLE_STRIKES {
                debug!(worker = index, "idle too long, retiring");
                break;
            }
        }
    }
}

/// Run one job callback with no lock held. A panicking callback unwinds its
/// own captures; the worker and the pool survive.
fn run_job(shared: &Shared, index: usize, job: Job) {
    let cx = WorkerRef {
        index,
        stop: &shared.stop,
    };
    if panic::catch_unwind(AssertUnwindSafe(|| job.invoke(&cx))).is_err() {
        error!(worker = index, "job callback panicked");
    }
}

fn grower_loop(shared: &Arc<Shared>) {
    let mut table = shared.jobs.lock().unwrap();
    while !shared.stop.load(Ordering::Acquire) {
        let backlog = table.ready.len();
        if backlog > 0 {
            drop(table);
            grow(shared, backlog);
            table = shared.jobs.lock().unwrap();
        }
        let (guard, _) = shared
            .jobs_cond
            .wait_timeout(table, GROWER_WAIT)
            .unwrap();
        table = guard;
    }
    debug!("grower exiting");
}

/// Reap zombies and spawn elastic workers, one per unit of backlog.
fn grow(shared: &Arc<Shared>, mut demand: usize) {
    if shared.running.load(Ordering::Acquire) as usize == shared.max_workers {
        return;
    }

    for index in shared.idle_workers..shared.max_workers {
        let slot = &shared.workers[index];

        if slot.state() == WorkerState::Zombie {
            if let Some(handle) = slot.take_handle() {
                let _ = handle.join();
            }
            slot.set_state(WorkerState::Dead);
        } else if slot.has_handle() {
            continue;
        }

        if demand == 0 {
            break;
        }
        demand -= 1;
        trace!(worker = index, "spawning elastic worker");
        spawn_worker(shared, index);
    }
}
