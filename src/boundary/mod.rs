//! The [self] module implements the suspension boundary, the contract this crate follows around
//! every system call that can block for an unbounded amount of time (name resolution, `connect`
//! and `accept`). Before such a call the embedding host is told two things: which of its memory
//! regions are about to be handed to the kernel, so its collector must neither move nor reclaim
//! them, and that the current task is leaving CPU bound execution, so its scheduler is free to run
//! other cooperative tasks. Once the call returns both notifications are undone in the opposite
//! order.
//!
//! This module exposes the following pieces:
//! - The [Scheduler] trait, the four call capability the host injects.
//! - The [Region] type describing a single host owned memory region to pin.
//! - The [BlockingRegion] guard that performs the enter half on creation and the exit half on drop,
//! so early returns can never leave the host yielded or a region pinned.
//! - The [retry_interrupted] helper that transparently restarts calls interrupted by a signal.

mod region;
mod retry;
mod scheduler;

pub use region::{blocking, BlockingRegion, Region};
pub use retry::retry_interrupted;
pub use scheduler::{NoopScheduler, Scheduler};

#[cfg(test)]
pub(crate) use scheduler::testing;
