use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Identity of an allocator instance.
///
/// Handles remember the allocator they were carved from so that a destroy
/// call made with a different allocator can be refused instead of handing
/// foreign memory to the wrong `deallocate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocatorId(usize);

impl AllocatorId {
    /// Identity shared by every [`SystemAllocator`].
    pub const SYSTEM: AllocatorId = AllocatorId(0);

    /// Identity derived from the address of an allocator object.
    pub fn of_address<A: ?Sized>(allocator: &A) -> Self {
        AllocatorId(allocator as *const A as *const () as usize)
    }
}

/// The allocation capability supplied by the caller on every create/destroy.
///
/// The allocator object itself is the allocator "state". This layer never
/// constructs or owns one; it only borrows it for the duration of a call.
///
/// # Safety
/// As with [`GlobalAlloc`](std::alloc::GlobalAlloc), messages are written
/// straight into the blocks this trait hands out, so implementors must
/// uphold:
/// * a block returned by `allocate` is valid for reads and writes of
///   `layout.size()` bytes and is not aliased until it is deallocated;
/// * the block stays valid until `deallocate` is called for it.
///
/// Blocks that miss `layout.align()` are detected and handed back through
/// `deallocate` rather than used.
pub unsafe trait Allocator: Send + Sync {
    /// Allocates a block fitting `layout`. `None` signals allocation failure.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Returns a block to the allocator.
    ///
    /// # Safety
    /// `ptr` must come from `allocate` on this same allocator with the same
    /// `layout`, and must not have been deallocated already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Identity used to match a handle with the allocator that created it.
    ///
    /// Defaults to the address of `self`, so an allocator must not move
    /// between a create and the matching destroy. Zero-sized allocators
    /// should override this with a fixed value.
    fn id(&self) -> AllocatorId {
        AllocatorId::of_address(self)
    }
}

/// Allocator backed by the global heap.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

// SAFETY: blocks come from the global allocator with the requested layout.
unsafe impl Allocator for SystemAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }
        // SAFETY: layout has a non-zero size.
        NonNull::new(unsafe { alloc::alloc(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded from the caller's contract.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }

    fn id(&self) -> AllocatorId {
        AllocatorId::SYSTEM
    }
}

/// Allocator wrapper that counts what goes in and out.
///
/// Used as a test double to prove that handles are released exactly once,
/// and that unsupported paths never touch the allocator at all. It can also
/// be switched into a failing mode to exercise the allocation-failure path.
#[derive(Debug, Default)]
pub struct CountingAllocator<A = SystemAllocator> {
    inner: A,
    outstanding: AtomicUsize,
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    failing: AtomicBool,
}

impl CountingAllocator<SystemAllocator> {
    pub fn new() -> Self {
        Self::wrap(SystemAllocator)
    }

    /// A counting allocator whose every `allocate` call fails.
    pub fn failing() -> Self {
        let allocator = Self::new();
        allocator.set_failing(true);
        allocator
    }
}

impl<A: Allocator> CountingAllocator<A> {
    pub fn wrap(inner: A) -> Self {
        Self {
            inner,
            outstanding: AtomicUsize::new(0),
            allocations: AtomicUsize::new(0),
            deallocations: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Blocks handed out and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Number of `allocate` calls, failed ones included.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    pub fn deallocations(&self) -> usize {
        self.deallocations.load(Ordering::SeqCst)
    }
}

// SAFETY: forwards every block to and from `inner` unchanged.
unsafe impl<A: Allocator> Allocator for CountingAllocator<A> {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return None;
        }
        let ptr = self.inner.allocate(layout)?;
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Some(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.deallocations.fetch_add(1, Ordering::SeqCst);
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        // SAFETY: forwarded from the caller's contract.
        unsafe { self.inner.deallocate(ptr, layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_tracks_outstanding() {
        let allocator = CountingAllocator::new();
        let layout = Layout::new::<u64>();

        let ptr = allocator.allocate(layout).expect("allocation failed");
        assert_eq!(allocator.outstanding(), 1);

        unsafe { allocator.deallocate(ptr, layout) };
        assert_eq!(allocator.outstanding(), 0);
        assert_eq!(allocator.allocations(), 1);
        assert_eq!(allocator.deallocations(), 1);
    }

    #[test]
    fn test_failing_mode() {
        let allocator = CountingAllocator::failing();
        assert!(allocator.allocate(Layout::new::<u32>()).is_none());
        assert_eq!(allocator.allocations(), 1);
        assert_eq!(allocator.outstanding(), 0);

        allocator.set_failing(false);
        let layout = Layout::new::<u32>();
        let ptr = allocator.allocate(layout).expect("allocation failed");
        unsafe { allocator.deallocate(ptr, layout) };
    }

    #[test]
    fn test_identity() {
        let a = CountingAllocator::new();
        let b = CountingAllocator::new();
        assert_eq!(a.id(), a.id());
        assert_ne!(a.id(), b.id());
        assert_eq!(SystemAllocator.id(), AllocatorId::SYSTEM);
    }
}
