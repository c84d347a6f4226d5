//! Scheduled callbacks tied to the playback timeline.
//!
//! A registered task fires at most once per playback session. It is only
//! armed on the looper while the media plays: the manager arms the registry
//! on every start and seek and disarms it on every pause, so a task always
//! fires at the intended point of the media rather than of the wall clock.

use crate::looper::{Handler, TaskId};
use log::debug;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Callback run by a [`ScheduledTask`]
pub type TaskCallback = Rc<dyn Fn()>;

/// A callback with the time it should run at
///
/// `at_ms` counts playing time from the start of the session, or, for a
/// `before_end` task, media time backwards from the end.
#[derive(Clone)]
pub struct ScheduledTask {
    callback: TaskCallback,
    before_end: bool,
    at_ms: u64,
}

impl ScheduledTask {
    pub fn new(callback: TaskCallback, before_end: bool, at_ms: u64) -> Self {
        Self {
            callback,
            before_end,
            at_ms,
        }
    }

    pub fn callback(&self) -> &TaskCallback {
        &self.callback
    }

    pub fn is_before_end(&self) -> bool {
        self.before_end
    }

    pub fn at_ms(&self) -> u64 {
        self.at_ms
    }

    /// Delay of a `before_end` task from `position_ms`, or `None` when the
    /// duration is unknown
    pub fn delay_before_end(&self, position_ms: u64, duration_ms: u64) -> Option<u64> {
        if duration_ms == 0 {
            return None;
        }
        Some(duration_ms.saturating_sub(self.at_ms).saturating_sub(position_ms))
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("before_end", &self.before_end)
            .field("at_ms", &self.at_ms)
            .finish()
    }
}

struct Entry {
    task: ScheduledTask,
    fired: Rc<Cell<bool>>,

    /// Playing time still owed to a from-start task
    remaining_ms: u64,

    /// Looper instance and the clock time it was armed at
    armed: Option<(TaskId, u64)>,
}

/// Registered tasks and their armed instances on the looper
pub struct TaskRegistry {
    handler: Handler,
    entries: Vec<Entry>,
}

impl TaskRegistry {
    pub fn new(handler: Handler) -> Self {
        Self {
            handler,
            entries: Vec::new(),
        }
    }

    /// Add a task; it is placed on the looper when the registry is next armed
    pub fn register(&mut self, task: ScheduledTask) {
        self.entries.push(Entry {
            remaining_ms: task.at_ms,
            task,
            fired: Rc::new(Cell::new(false)),
            armed: None,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of armed instances that have not fired yet
    pub fn pending(&self) -> usize {
        self.entries
            .iter()
            .filter_map(|entry| entry.armed)
            .filter(|(task, _)| self.handler.is_pending(*task))
            .count()
    }

    /// Number of tasks that already fired this session
    pub fn fired(&self) -> usize {
        self.entries.iter().filter(|entry| entry.fired.get()).count()
    }

    /// Place every task that has not fired yet, playback being at `position_ms`
    ///
    /// Instances armed earlier are disarmed first.
    pub fn arm(&mut self, position_ms: u64, duration_ms: u64) {
        self.disarm();

        let now = self.handler.now_ms();
        let mut armed = 0;
        for entry in self.entries.iter_mut().filter(|entry| !entry.fired.get()) {
            let delay = if entry.task.before_end {
                match entry.task.delay_before_end(position_ms, duration_ms) {
                    Some(delay) => delay,
                    None => {
                        debug!("Skipping {:?}: duration unknown", entry.task);
                        continue;
                    }
                }
            } else {
                entry.remaining_ms
            };

            let callback = Rc::clone(&entry.task.callback);
            let fired = Rc::clone(&entry.fired);
            let id = self.handler.post_delayed(
                move || {
                    fired.set(true);
                    callback();
                },
                delay,
            );
            entry.armed = Some((id, now));
            armed += 1;
        }

        debug!("Armed {} scheduled task(s) at {}ms", armed, position_ms);
    }

    /// Take every armed instance off the looper
    ///
    /// From-start tasks keep the playing time they have accumulated.
    pub fn disarm(&mut self) {
        let now = self.handler.now_ms();
        for entry in &mut self.entries {
            let Some((id, armed_at)) = entry.armed.take() else {
                continue;
            };
            self.handler.remove(id);
            if !entry.task.before_end && !entry.fired.get() {
                entry.remaining_ms = entry.remaining_ms.saturating_sub(now.saturating_sub(armed_at));
            }
        }
    }

    /// Cancel every armed instance and forget all registered tasks
    pub fn unregister_all(&mut self) {
        self.disarm();
        self.entries.clear();
    }
}
