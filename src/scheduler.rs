//! Batches state changes so that many updates cost one reconciliation per
//! dirty context.
use crate::errors::ReconcilerError;
use indexmap::IndexSet;
use log::{debug, trace};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Update = Box<dyn FnOnce()>;

#[derive(Default)]
struct Queue {
    updates: Vec<Update>,
    /// Contexts awaiting a rebuild, in request order.
    dirty: IndexSet<String>,
    in_flight: bool,
}

/// Shared handle; clones refer to the same queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<RefCell<Queue>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    /// Queue a state mutation for `context`. It runs at the start of the
    /// next flush, never during a cycle already in progress.
    pub fn set_state(&self, context: &str, update: impl FnOnce() + 'static) {
        let mut queue = self.inner.borrow_mut();
        queue.updates.push(Box::new(update));
        if queue.dirty.insert(context.to_string()) {
            debug!("Scheduler: context '{}' marked dirty", context);
        }
    }

    /// Ask for a rebuild of `context` without a mutation.
    pub fn request_rebuild(&self, context: &str) {
        if self.inner.borrow_mut().dirty.insert(context.to_string()) {
            debug!("Scheduler: rebuild requested for '{}'", context);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.borrow().dirty.is_empty()
    }

    pub fn is_in_flight(&self) -> bool {
        self.inner.borrow().in_flight
    }

    /// Start a batch: apply queued mutations and hand out the dirty contexts.
    /// `Ok(None)` when nothing is pending.
    pub(crate) fn begin(&self) -> Result<Option<Batch>, ReconcilerError> {
        let (updates, dirty) = {
            let mut queue = self.inner.borrow_mut();
            if queue.in_flight {
                return Err(ReconcilerError::InFlight);
            }
            if queue.dirty.is_empty() {
                return Ok(None);
            }
            queue.in_flight = true;
            (std::mem::take(&mut queue.updates), std::mem::take(&mut queue.dirty))
        };

        trace!("Scheduler: applying {} queued updates", updates.len());
        for update in updates {
            update();
        }
        Ok(Some(Batch { scheduler: self.clone(), contexts: dirty.into_iter().collect() }))
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("updates", &queue.updates.len())
            .field("dirty", &queue.dirty)
            .field("in_flight", &queue.in_flight)
            .finish()
    }
}

/// One flush in progress. Dropping it ends the cycle.
pub(crate) struct Batch {
    scheduler: Scheduler,
    pub contexts: Vec<String>,
}

impl Batch {
    /// Put contexts back in the queue, e.g. after a failed cycle.
    pub fn requeue(&self, contexts: &[String]) {
        for context in contexts {
            self.scheduler.request_rebuild(context);
        }
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        self.scheduler.inner.borrow_mut().in_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn updates_coalesce_per_context() {
        let scheduler = Scheduler::new();
        let counter = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let counter = counter.clone();
            scheduler.set_state("main", move || counter.set(counter.get() + 1));
        }
        scheduler.request_rebuild("dialog");
        assert_eq!(counter.get(), 0);

        let batch = scheduler.begin().unwrap().unwrap();
        assert_eq!(counter.get(), 3);
        assert_eq!(batch.contexts, vec!["main".to_string(), "dialog".to_string()]);
        assert!(scheduler.is_in_flight());
        drop(batch);
        assert!(!scheduler.is_in_flight());
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn nested_begin_is_refused() {
        let scheduler = Scheduler::new();
        scheduler.request_rebuild("main");
        let _batch = scheduler.begin().unwrap().unwrap();
        scheduler.request_rebuild("main");
        assert!(matches!(scheduler.begin(), Err(ReconcilerError::InFlight)));
    }

    #[test]
    fn updates_queued_during_a_cycle_wait_for_the_next() {
        let scheduler = Scheduler::new();
        let applied = Rc::new(Cell::new(false));
        scheduler.request_rebuild("main");
        let batch = scheduler.begin().unwrap().unwrap();
        let flag = applied.clone();
        scheduler.set_state("main", move || flag.set(true));
        assert!(!applied.get());
        drop(batch);

        assert!(scheduler.begin().unwrap().is_some());
        assert!(applied.get());
    }

    #[test]
    fn empty_queue_yields_no_batch() {
        assert!(Scheduler::new().begin().unwrap().is_none());
    }
}
