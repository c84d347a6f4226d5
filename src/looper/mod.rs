//! Serialized event queue for HapticPlayer
//!
//! Every lifecycle callback, poll tick and timer in the player runs on one
//! logical queue: a tokio [`LocalSet`] owned by a [`Looper`]. Any number of
//! [`Handler`]s post work onto it. Posted work is a local task that sleeps
//! until its due time and then runs the callback, so ticks never overlap and
//! a task always observes the state left behind by the previous one.
//!
//! Time comes from `tokio::time`. The driver binary runs the set against the
//! wall clock with [`Looper::run_until`]; tests pause the runtime clock and
//! step it with [`Looper::advance`].

use log::trace;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tokio::task::{AbortHandle, LocalSet};
use tokio::time::{sleep_until, Instant};

/// Identifier of a posted task, used to cancel it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Id handed out when the looper is gone; never pending
    const DETACHED: TaskId = TaskId(u64::MAX);
}

struct PendingTask {
    due_ms: u64,
    handle: AbortHandle,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    pending: HashMap<TaskId, PendingTask>,
    executed: usize,
}

struct Shared {
    local: LocalSet,
    registry: RefCell<Registry>,
}

/// Owner of the event queue
pub struct Looper {
    shared: Rc<Shared>,
    clock: Clock,
}

/// Millisecond view of the runtime clock, counted from looper creation
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    /// Current time in milliseconds since the looper was created
    pub fn now_ms(&self) -> u64 {
        Instant::now().saturating_duration_since(self.origin).as_millis() as u64
    }

    fn instant_at(&self, ms: u64) -> Instant {
        self.origin + Duration::from_millis(ms)
    }
}

/// Posting endpoint for a looper
///
/// Posting after the looper has been dropped is silently ignored.
#[derive(Clone)]
pub struct Handler {
    shared: Weak<Shared>,
    clock: Clock,
}

impl Looper {
    /// Create an empty looper with its clock at zero
    ///
    /// Must be called from inside a tokio runtime.
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                local: LocalSet::new(),
                registry: RefCell::new(Registry::default()),
            }),
            clock: Clock { origin: Instant::now() },
        }
    }

    /// Create a handler posting onto this looper
    pub fn handler(&self) -> Handler {
        Handler {
            shared: Rc::downgrade(&self.shared),
            clock: self.clock,
        }
    }

    /// Get a handle on the looper clock
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Current time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Due time of the earliest pending task
    pub fn next_due(&self) -> Option<u64> {
        self.shared.registry.borrow().pending.values().map(|task| task.due_ms).min()
    }

    /// Number of tasks waiting to run
    pub fn pending_count(&self) -> usize {
        self.shared.registry.borrow().pending.len()
    }

    /// Drive the queue until `future` completes
    ///
    /// Tasks run as their timers fire on the runtime clock.
    pub async fn run_until<F: Future>(&self, future: F) -> F::Output {
        self.shared.local.run_until(future).await
    }

    /// Run every task already due, including ones they post for "now"
    ///
    /// # Returns
    ///
    /// The number of tasks executed
    pub async fn run_pending(&self) -> usize {
        let before = self.executed();
        self.shared.local.run_until(self.settle()).await;
        self.executed() - before
    }

    /// Let `delta_ms` pass on the runtime clock, running tasks as they fall due
    pub async fn advance(&self, delta_ms: u64) -> usize {
        self.advance_to(self.now_ms().saturating_add(delta_ms)).await
    }

    /// Let time pass up to `target_ms`, running tasks in due order
    ///
    /// Time never moves backwards; a target in the past only runs the tasks
    /// that are already due. With a paused runtime clock the sleeps below
    /// complete instantly and the clock lands on each due time in turn.
    pub async fn advance_to(&self, target_ms: u64) -> usize {
        let before = self.executed();
        self.shared
            .local
            .run_until(async {
                loop {
                    self.settle().await;
                    match self.next_due() {
                        Some(due) if due <= target_ms => sleep_until(self.clock.instant_at(due)).await,
                        _ => break,
                    }
                }
                if target_ms > self.now_ms() {
                    sleep_until(self.clock.instant_at(target_ms)).await;
                }
            })
            .await;
        self.executed() - before
    }

    /// Yield to the local set until nothing due remains
    async fn settle(&self) {
        while self.next_due().is_some_and(|due| due <= self.now_ms()) {
            tokio::task::yield_now().await;
        }
    }

    fn executed(&self) -> usize {
        self.shared.registry.borrow().executed
    }
}

impl Default for Looper {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler {
    /// Post a task to run on the next turn of the queue
    pub fn post<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() + 'static,
    {
        self.post_delayed(task, 0)
    }

    /// Post a task to run once `delay_ms` have elapsed
    pub fn post_delayed<F>(&self, task: F, delay_ms: u64) -> TaskId
    where
        F: FnOnce() + 'static,
    {
        let Some(shared) = self.shared.upgrade() else {
            return TaskId::DETACHED;
        };

        let due_ms = self.clock.now_ms().saturating_add(delay_ms);
        let deadline = self.clock.instant_at(due_ms);
        let id = {
            let mut registry = shared.registry.borrow_mut();
            let id = TaskId(registry.next_id);
            registry.next_id += 1;
            id
        };

        let weak = Rc::downgrade(&shared);
        let join = shared.local.spawn_local(async move {
            if delay_ms > 0 {
                sleep_until(deadline).await;
            }
            let Some(shared) = weak.upgrade() else {
                return;
            };
            {
                let mut registry = shared.registry.borrow_mut();
                registry.pending.remove(&id);
                registry.executed += 1;
            }
            drop(shared);

            trace!("Running task {:?} due at {}ms", id, due_ms);
            task();
        });

        shared.registry.borrow_mut().pending.insert(
            id,
            PendingTask {
                due_ms,
                handle: join.abort_handle(),
            },
        );
        id
    }

    /// Cancel a pending task; a task that already ran is ignored
    pub fn remove(&self, task: TaskId) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let removed = shared.registry.borrow_mut().pending.remove(&task);
        if let Some(pending) = removed {
            pending.handle.abort();
        }
    }

    /// Whether the task is still waiting to run
    pub fn is_pending(&self, task: TaskId) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.registry.borrow().pending.contains_key(&task))
    }

    /// Current time of the owning looper
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Clock of the owning looper
    pub fn clock(&self) -> Clock {
        self.clock
    }
}
