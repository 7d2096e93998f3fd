use lazy_static::lazy_static;

use super::{Handle, SharedScheduler};

lazy_static! {
    static ref HANDLE: Handle = Handle::new();
}

/// Return a reference to the global [Handle] object, this contains the process wide scheduler and
/// the per thread blocking region bookkeeping.
pub fn handle() -> &'static Handle {
    &HANDLE
}

/// Return the installed process wide scheduler, or a [crate::boundary::NoopScheduler] if nothing
/// has been installed yet.
pub fn scheduler() -> SharedScheduler {
    handle().scheduler()
}

/// Install `scheduler` as the process wide scheduler and return the one it replaces.
pub fn install(scheduler: SharedScheduler) -> SharedScheduler {
    tracing::debug!("installing process wide scheduler");
    handle().install(scheduler)
}
