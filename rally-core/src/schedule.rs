use std::collections::BTreeMap;
use std::time::Instant;

/// Handle to a task queued on a [`Scheduler`]. Whoever owns the affected
/// entity keeps the handle and cancels it when the entity goes away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

/// Single-threaded timer queue. Nothing runs by itself: the owning loop calls
/// [`Scheduler::drain_due`] once per tick and acts on whatever comes back.
pub struct Scheduler<T> {
    next_handle: u64,
    // ordered by due time, ties broken by scheduling order
    pending: BTreeMap<(Instant, TaskHandle), T>,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            next_handle: 0,
            pending: BTreeMap::new(),
        }
    }

    pub fn schedule(&mut self, due: Instant, task: T) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.insert((due, handle), task);
        handle
    }

    /// Returns the task if it had not fired yet.
    pub fn cancel(&mut self, handle: TaskHandle) -> Option<T> {
        let key = self
            .pending
            .keys()
            .find(|(_, pending_handle)| *pending_handle == handle)
            .copied()?;
        self.pending.remove(&key)
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.pending.keys().any(|(_, h)| *h == handle)
    }

    /// Removes and returns every task due at or before `now`, oldest first.
    pub fn drain_due(&mut self, now: Instant) -> Vec<(TaskHandle, T)> {
        let mut due = Vec::new();
        while let Some(&(at, handle)) = self.pending.keys().next() {
            if at > now {
                break;
            }
            if let Some(task) = self.pending.remove(&(at, handle)) {
                due.push((handle, task));
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn drains_only_due_tasks_in_order() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule(start + Duration::from_secs(2), "second");
        scheduler.schedule(start + Duration::from_secs(1), "first");
        scheduler.schedule(start + Duration::from_secs(5), "later");

        let due: Vec<_> = scheduler
            .drain_due(start + Duration::from_secs(3))
            .into_iter()
            .map(|(_, task)| task)
            .collect();
        assert_eq!(due, vec!["first", "second"]);
        assert_eq!(scheduler.len(), 1);
    }

    #[test]
    fn cancelled_tasks_never_fire() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(start, 7);

        assert!(scheduler.is_pending(handle));
        assert_eq!(scheduler.cancel(handle), Some(7));
        assert_eq!(scheduler.cancel(handle), None);
        assert!(scheduler.drain_due(start + Duration::from_secs(1)).is_empty());
    }
}
