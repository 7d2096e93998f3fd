//! The context module holds the process wide state this crate needs when a scheduler is not passed
//! in explicitly. It exposes a [Handle] object as an application static global which stores the
//! installed [crate::boundary::Scheduler] along with [thread_local::ThreadLocal] bookkeeping of
//! open blocking regions. Access it through [statics::handle], or use the helpers
//! [statics::scheduler] and [statics::install] directly.
//!
//! Generally speaking you should NOT be creating [Handle] objects directly and instead should
//! leverage the above helpers to do so.

mod handle;
mod statics;

pub use handle::{Handle, SharedScheduler};
pub use statics::{handle, install, scheduler};
