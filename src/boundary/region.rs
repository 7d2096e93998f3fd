use std::{ffi::c_void, mem::size_of_val};

use crate::context;

use super::Scheduler;

/// A single host owned memory region that must stay put while the kernel may be reading from or
/// writing to it. The [Region] only describes the memory, it never dereferences it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    addr: *const c_void,
    len: usize,
}

impl Region {
    /// Describe `len` bytes starting at `addr`.
    pub fn new(addr: *const c_void, len: usize) -> Region {
        Region { addr, len }
    }

    /// Describe the memory backing `value`.
    pub fn of<T: ?Sized>(value: &T) -> Region {
        Region {
            addr: value as *const T as *const c_void,
            len: size_of_val(value),
        }
    }

    /// The start of the region, this is the object identity handed to the host.
    pub fn addr(&self) -> *const c_void {
        self.addr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// An active suspension boundary. Creating one through [BlockingRegion::enter] pins each region in
/// order and then yields to the host scheduler, dropping it resumes the scheduler and unpins the
/// regions in reverse order. Keep it alive for exactly the duration of the blocking call.
///
/// # Examples
///
/// ```
/// use coopsock::boundary::{BlockingRegion, NoopScheduler, Region};
///
/// let host = String::from("example.org");
/// let regions = [Region::of(host.as_str())];
/// {
///     let _region = BlockingRegion::enter(&NoopScheduler, &regions);
///     // Issue the blocking system call here.
/// }
/// ```
#[must_use = "the host is resumed as soon as the region is dropped"]
pub struct BlockingRegion<'a, S: Scheduler + ?Sized> {
    scheduler: &'a S,
    pinned: &'a [Region],
}

impl<'a, S: Scheduler + ?Sized> BlockingRegion<'a, S> {
    /// Pin `pinned` and declare the current context as blocked.
    ///
    /// Regions do not nest, the host sees exactly one yield per blocking call. Debug builds panic
    /// when a region is entered on a thread that already has one open.
    pub fn enter(scheduler: &'a S, pinned: &'a [Region]) -> BlockingRegion<'a, S> {
        debug_assert_eq!(
            context::handle().depth(),
            0,
            "blocking region entered while another is open on this thread"
        );

        for region in pinned {
            scheduler.pin(*region);
        }
        scheduler.begin_yield();

        let depth = context::handle().enter_region();
        tracing::trace!(regions = pinned.len(), depth, "entered blocking region");

        BlockingRegion { scheduler, pinned }
    }
}

impl<'a, S: Scheduler + ?Sized> Drop for BlockingRegion<'a, S> {
    fn drop(&mut self) {
        let depth = context::handle().exit_region();
        tracing::trace!(regions = self.pinned.len(), depth, "leaving blocking region");

        self.scheduler.end_yield();
        for region in self.pinned.iter().rev() {
            self.scheduler.unpin(*region);
        }
    }
}

/// Run `op` inside a [BlockingRegion] covering `pinned`.
pub fn blocking<S, T, F>(scheduler: &S, pinned: &[Region], op: F) -> T
where
    S: Scheduler + ?Sized,
    F: FnOnce() -> T,
{
    let _region = BlockingRegion::enter(scheduler, pinned);
    op()
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;
    use crate::boundary::testing::{Call, RecordingScheduler};

    #[test]
    fn test_enter_exit_order() {
        let scheduler = RecordingScheduler::default();
        let first = [0u8; 4];
        let second = *b"host\0";
        let regions = [Region::of(&first), Region::of(&second)];

        let value = blocking(&scheduler, &regions, || {
            assert_eq!(context::handle().depth(), 1);
            7
        });

        assert_eq!(value, 7);
        assert_eq!(context::handle().depth(), 0);
        assert_eq!(
            scheduler.calls(),
            vec![
                Call::Pin(regions[0]),
                Call::Pin(regions[1]),
                Call::Begin,
                Call::End,
                Call::Unpin(regions[1]),
                Call::Unpin(regions[0]),
            ]
        );
        scheduler.assert_balanced();
    }

    #[test]
    fn test_exit_runs_on_early_return() {
        fn fails(scheduler: &RecordingScheduler, region: Region) -> Result<(), &'static str> {
            let regions = [region];
            let _region = BlockingRegion::enter(scheduler, &regions);
            let attempt: Result<(), &'static str> = Err("kernel said no");
            attempt?;
            Ok(())
        }

        let scheduler = RecordingScheduler::default();
        let buf = [0u8; 16];
        assert!(fails(&scheduler, Region::of(&buf)).is_err());
        scheduler.assert_balanced();
    }

    #[test]
    fn test_exit_runs_on_unwind() {
        let scheduler = RecordingScheduler::default();
        let buf = [0u8; 16];
        let regions = [Region::of(&buf)];

        let result = catch_unwind(AssertUnwindSafe(|| {
            blocking(&scheduler, &regions, || panic!("boom"));
        }));

        assert!(result.is_err());
        assert_eq!(scheduler.calls().len(), 4);
        scheduler.assert_balanced();
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_nested_region_is_rejected() {
        let scheduler = RecordingScheduler::default();

        let nested = blocking(&scheduler, &[], || {
            catch_unwind(AssertUnwindSafe(|| blocking(&scheduler, &[], || ())))
        });

        assert!(nested.is_err());
        assert_eq!(context::handle().depth(), 0);
        assert_eq!(scheduler.calls(), vec![Call::Begin, Call::End]);
        scheduler.assert_balanced();
    }

    #[test]
    fn test_region_of_slice() {
        let buf = [1u8, 2, 3];
        let region = Region::of(&buf[..]);
        assert_eq!(region.len(), 3);
        assert_eq!(region.addr(), buf.as_ptr() as *const c_void);
        assert!(!region.is_empty());
    }
}
