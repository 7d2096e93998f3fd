use std::{
    cell::Cell,
    sync::{Arc, PoisonError, RwLock},
};

use thread_local::ThreadLocal;

use crate::boundary::{NoopScheduler, Scheduler};

/// A scheduler that can be shared process wide.
pub type SharedScheduler = Arc<dyn Scheduler + Send + Sync>;

/// Represents the process wide context this crate consults when the caller did not inject a
/// [Scheduler] directly, namely the C entry points in [crate::ffi]. It also tracks, per thread,
/// how many [crate::boundary::BlockingRegion]s are currently open. It is generally not a good idea
/// to create this manually, instead leverage [super::handle] or [super::scheduler].
pub struct Handle {
    scheduler: RwLock<SharedScheduler>,
    depth: Arc<ThreadLocal<Cell<usize>>>,
}

impl Handle {
    pub(super) fn new() -> Handle {
        Handle {
            scheduler: RwLock::new(Arc::new(NoopScheduler)),
            depth: Arc::new(ThreadLocal::new()),
        }
    }

    /// Return the currently installed scheduler.
    pub fn scheduler(&self) -> SharedScheduler {
        self.scheduler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the installed scheduler, returning the previous one.
    pub fn install(&self, scheduler: SharedScheduler) -> SharedScheduler {
        let mut current = self
            .scheduler
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, scheduler)
    }

    /// Number of blocking regions open on the calling thread, either 0 or 1 since regions never
    /// nest. [crate::boundary::BlockingRegion::enter] checks it in debug builds.
    pub fn depth(&self) -> usize {
        self.counter().get()
    }

    pub(crate) fn enter_region(&self) -> usize {
        let counter = self.counter();
        counter.set(counter.get() + 1);
        counter.get()
    }

    pub(crate) fn exit_region(&self) -> usize {
        let counter = self.counter();
        counter.set(counter.get().saturating_sub(1));
        counter.get()
    }

    fn counter(&self) -> &Cell<usize> {
        self.depth.get_or(|| Cell::new(0))
    }
}
