//! Task scheduler.
//!
//! Runs one-shot and periodic command tasks on its own worker thread,
//! independent of whoever issues commands directly.  Every task is handed
//! to a [`CommandPort`], so the scheduler goes through the same
//! validation and dispatch lock as any other caller.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  schedule() / cancel()          (any thread)                 │
//! │        │                                                     │
//! │        ▼                                                     │
//! │  ┌────────────────────────────────────────────┐  notify      │
//! │  │ BTreeMap<(due, seq), entry>  under Mutex   │─────────┐    │
//! │  └────────────────────────────────────────────┘         │    │
//! │        ▲                     │ earliest due             ▼    │
//! │        │ re-arm periodic     ▼                    ┌─────────┐│
//! │        └──────────── worker: wait_timeout ◀──────│ Condvar ││
//! │                              │                    └─────────┘│
//! │                              ▼                               │
//! │                     CommandPort::command()                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info};

use crate::app::commands::{Command, CommandOutcome};
use crate::app::ports::CommandPort;
use crate::error::Result;

// ═══════════════════════════════════════════════════════════════
//  Task types
// ═══════════════════════════════════════════════════════════════

/// A unit of scheduled work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Runs once, then is discarded.
    Command(Command),
    /// Runs, then re-arms itself `interval` after the run finished.
    Periodic { command: Command, interval: Duration },
}

impl Task {
    pub fn command(&self) -> Command {
        match *self {
            Self::Command(command) | Self::Periodic { command, .. } => command,
        }
    }
}

/// Handle for cancelling a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Shared queue
// ═══════════════════════════════════════════════════════════════

#[derive(Default)]
struct Queue {
    /// Keyed by due time, then insertion sequence so ties run FIFO.
    entries: BTreeMap<(Instant, u64), (TaskId, Task)>,
    next_seq: u64,
    next_id: u64,
    /// Task currently executing on the worker.
    running: Option<TaskId>,
    /// `cancel()` hit the running task; do not re-arm it.
    running_cancelled: bool,
    shutdown: bool,
}

impl Queue {
    fn insert(&mut self, id: TaskId, task: Task, due: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((due, seq), (id, task));
    }
}

#[derive(Default)]
struct Shared {
    queue: Mutex<Queue>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

/// Owns the worker thread.  Dropping the scheduler stops it.
pub struct Scheduler {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawn the `scheduler` worker, dispatching through `port`.
    pub fn start(port: Arc<dyn CommandPort>) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let worker = thread::Builder::new()
            .name("scheduler".into())
            .spawn({
                let shared = shared.clone();
                move || run(&shared, port.as_ref())
            })?;
        info!("SCHED | worker started");
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Queue `task` to first run at `first_due`.
    pub fn schedule(&self, task: Task, first_due: Instant) -> TaskId {
        let mut q = self.shared.lock();
        let id = TaskId(q.next_id);
        q.next_id += 1;
        q.insert(id, task, first_due);
        drop(q);

        debug!("SCHED | queued {} {:?}", id, task);
        // the new task may be earlier than whatever the worker sleeps on
        self.shared.wake.notify_one();
        id
    }

    pub fn schedule_after(&self, task: Task, delay: Duration) -> TaskId {
        self.schedule(task, due_after(delay))
    }

    /// Remove a task.  Returns `false` if it is unknown or already done.
    ///
    /// A periodic task that is executing right now finishes its current
    /// run and is not re-armed.
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut q = self.shared.lock();
        let key = q
            .entries
            .iter()
            .find(|(_, (entry_id, _))| *entry_id == id)
            .map(|(key, _)| *key);

        let found = match key {
            Some(key) => q.entries.remove(&key).is_some(),
            None if q.running == Some(id) => {
                q.running_cancelled = true;
                true
            }
            None => false,
        };
        if found {
            debug!("SCHED | cancelled {}", id);
        }
        found
    }

    /// Tasks waiting to run.
    pub fn pending(&self) -> usize {
        self.shared.lock().entries.len()
    }

    /// Stop the worker after its current task and join it.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.shared.lock().shutdown = true;
        self.shared.wake.notify_all();
        if worker.join().is_err() {
            error!("SCHED | worker panicked");
        }
        info!("SCHED | worker stopped");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Roughly a century; stands in for delays `Instant` cannot represent.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn due_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Worker loop: sleep until the earliest task is due, run it, repeat.
fn run(shared: &Shared, port: &dyn CommandPort) {
    let mut q = shared.lock();
    loop {
        if q.shutdown {
            return;
        }

        let now = Instant::now();
        let next_due = q.entries.first_key_value().map(|((due, _), _)| *due);
        match next_due {
            None => {
                q = shared.wake.wait(q).unwrap_or_else(PoisonError::into_inner);
            }
            Some(due) if due > now => {
                q = shared
                    .wake
                    .wait_timeout(q, due - now)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0;
            }
            Some(_) => {
                let Some((_, (id, task))) = q.entries.pop_first() else {
                    continue;
                };
                q.running = Some(id);
                q.running_cancelled = false;
                drop(q);

                let outcome = port.command(task.command());
                if let CommandOutcome::Failed(e) = &outcome {
                    debug!("SCHED | task {} failed: {}", id, e);
                }

                q = shared.lock();
                q.running = None;
                if let Task::Periodic { interval, .. } = task {
                    if !q.running_cancelled && !q.shutdown {
                        q.insert(id, task, due_after(interval));
                    }
                }
            }
        }
    }
}
