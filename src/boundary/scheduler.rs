use std::{rc::Rc, sync::Arc};

use super::Region;

/// The capability an embedding host hands to this crate so blocking calls can cooperate with its
/// scheduler and memory manager.
///
/// Calls always nest the same way: every region is pinned before [Scheduler::begin_yield], and
/// every region is unpinned after the matching [Scheduler::end_yield]. Implementations never see
/// an unmatched call.
pub trait Scheduler {
    /// The current execution context is about to block, other cooperative tasks may run.
    fn begin_yield(&self);

    /// The blocking call returned, the current context is CPU bound again.
    fn end_yield(&self);

    /// Prevent the host from relocating or reclaiming the given region.
    fn pin(&self, region: Region);

    /// Allow the host to relocate or reclaim the given region again.
    fn unpin(&self, region: Region);
}

/// A [Scheduler] that does nothing, used when the caller owns all memory involved and there is no
/// cooperative scheduler to inform. This is also what the process wide [crate::context] falls back
/// to when no host scheduler was installed.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopScheduler;

impl Scheduler for NoopScheduler {
    fn begin_yield(&self) {}

    fn end_yield(&self) {}

    fn pin(&self, _: Region) {}

    fn unpin(&self, _: Region) {}
}

impl<S: Scheduler + ?Sized> Scheduler for &S {
    fn begin_yield(&self) {
        (**self).begin_yield()
    }

    fn end_yield(&self) {
        (**self).end_yield()
    }

    fn pin(&self, region: Region) {
        (**self).pin(region)
    }

    fn unpin(&self, region: Region) {
        (**self).unpin(region)
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Box<S> {
    fn begin_yield(&self) {
        (**self).begin_yield()
    }

    fn end_yield(&self) {
        (**self).end_yield()
    }

    fn pin(&self, region: Region) {
        (**self).pin(region)
    }

    fn unpin(&self, region: Region) {
        (**self).unpin(region)
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn begin_yield(&self) {
        (**self).begin_yield()
    }

    fn end_yield(&self) {
        (**self).end_yield()
    }

    fn pin(&self, region: Region) {
        (**self).pin(region)
    }

    fn unpin(&self, region: Region) {
        (**self).unpin(region)
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn begin_yield(&self) {
        (**self).begin_yield()
    }

    fn end_yield(&self) {
        (**self).end_yield()
    }

    fn pin(&self, region: Region) {
        (**self).pin(region)
    }

    fn unpin(&self, region: Region) {
        (**self).unpin(region)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::{Region, Scheduler};

    /// Route crate logs to the test output, safe to call from every test.
    pub(crate) fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .try_init();
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) enum Call {
        Begin,
        End,
        Pin(Region),
        Unpin(Region),
    }

    /// Records every call made against it, in order, so tests can assert on the exact protocol.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingScheduler {
        calls: RefCell<Vec<Call>>,
    }

    impl RecordingScheduler {
        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }

        /// Assert that yields and pins are balanced and properly nested.
        pub(crate) fn assert_balanced(&self) {
            let mut yielded = false;
            let mut pinned = Vec::new();
            for call in self.calls.borrow().iter() {
                match *call {
                    Call::Pin(region) => {
                        assert!(!yielded, "pinned {region:?} while yielded");
                        pinned.push(region);
                    }
                    Call::Begin => {
                        assert!(!yielded, "nested begin_yield");
                        yielded = true;
                    }
                    Call::End => {
                        assert!(yielded, "end_yield without begin_yield");
                        yielded = false;
                    }
                    Call::Unpin(region) => {
                        assert!(!yielded, "unpinned {region:?} while yielded");
                        assert_eq!(pinned.pop(), Some(region), "unpin out of order");
                    }
                }
            }
            assert!(!yielded, "left the host yielded");
            assert!(pinned.is_empty(), "left regions pinned: {pinned:?}");
        }
    }

    impl Scheduler for RecordingScheduler {
        fn begin_yield(&self) {
            self.calls.borrow_mut().push(Call::Begin);
        }

        fn end_yield(&self) {
            self.calls.borrow_mut().push(Call::End);
        }

        fn pin(&self, region: Region) {
            self.calls.borrow_mut().push(Call::Pin(region));
        }

        fn unpin(&self, region: Region) {
            self.calls.borrow_mut().push(Call::Unpin(region));
        }
    }
}
