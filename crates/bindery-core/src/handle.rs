use std::alloc::Layout;
use std::any::{self, TypeId};
use std::ffi::c_void;
use std::fmt;
use std::mem::ManuallyDrop;
use std::ptr::{self, NonNull};

use tracing::{debug, trace, warn};

use crate::allocator::{Allocator, AllocatorId};
use crate::descriptor::TypeSupportId;
use crate::message::MessageKind;

/// Opaque owner of one message living in allocator-provided memory.
///
/// A handle is the Rust face of the `void*` the transport passes around. It
/// is neither `Clone` nor `Copy`: whoever holds it owns the message, and must
/// hand it back to the matching destroy exactly once. Dropping a handle
/// without destroying it leaks the storage, since the allocator is not known
/// at that point.
pub struct MessageHandle {
    ptr: NonNull<u8>,
    layout: Layout,
    kind: MessageKind,
    origin: TypeSupportId,
    allocator: AllocatorId,
    payload: TypeId,
    payload_name: &'static str,
    drop_payload: unsafe fn(NonNull<u8>),
}

// SAFETY: only payloads that are `Send + Sync` are ever emplaced, and the
// handle is the sole owner of the block.
unsafe impl Send for MessageHandle {}
unsafe impl Sync for MessageHandle {}

unsafe fn drop_payload<T>(ptr: NonNull<u8>) {
    // SAFETY: called once, on a block initialized with a `T`.
    unsafe { ptr::drop_in_place(ptr.cast::<T>().as_ptr()) }
}

impl MessageHandle {
    /// Moves `value` into a block obtained from `allocator`.
    ///
    /// Returns `None` when the allocator fails or hands out a block that is
    /// not aligned for `T`. Zero-sized payloads still get a one-byte block,
    /// so every live handle maps to exactly one allocation.
    pub(crate) fn emplace<T>(
        value: T,
        kind: MessageKind,
        origin: TypeSupportId,
        allocator: &dyn Allocator,
    ) -> Option<Self>
    where
        T: Send + Sync + 'static,
    {
        let natural = Layout::new::<T>();
        let layout = Layout::from_size_align(natural.size().max(1), natural.align()).ok()?;

        let Some(ptr) = allocator.allocate(layout) else {
            debug!(%kind, payload = any::type_name::<T>(), "allocation failed");
            return None;
        };

        if ptr.as_ptr().align_offset(layout.align()) != 0 {
            warn!(
                %kind,
                payload = any::type_name::<T>(),
                align = layout.align(),
                "allocator returned a misaligned block"
            );
            // SAFETY: the block came from this allocator with `layout` and
            // was never written.
            unsafe { allocator.deallocate(ptr, layout) };
            return None;
        }

        // SAFETY: fresh block, sized and aligned for `T`.
        unsafe { ptr.cast::<T>().as_ptr().write(value) };

        trace!(%kind, payload = any::type_name::<T>(), size = layout.size(), "message emplaced");

        Some(Self {
            ptr,
            layout,
            kind,
            origin,
            allocator: allocator.id(),
            payload: TypeId::of::<T>(),
            payload_name: any::type_name::<T>(),
            drop_payload: drop_payload::<T>,
        })
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Identity of the descriptor that created this handle.
    pub fn origin(&self) -> TypeSupportId {
        self.origin
    }

    /// Identity of the allocator the storage came from.
    pub fn allocator_id(&self) -> AllocatorId {
        self.allocator
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn payload_type_name(&self) -> &'static str {
        self.payload_name
    }

    /// The raw, untyped view of the message.
    pub fn as_ptr(&self) -> NonNull<c_void> {
        self.ptr.cast()
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.payload == TypeId::of::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if !self.is::<T>() {
            return None;
        }
        // SAFETY: payload type checked above; the block stays initialized
        // for as long as the handle lives.
        Some(unsafe { &*self.ptr.cast::<T>().as_ptr() })
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        if !self.is::<T>() {
            return None;
        }
        // SAFETY: as above, and `&mut self` guarantees exclusivity.
        Some(unsafe { &mut *self.ptr.cast::<T>().as_ptr() })
    }
}

impl fmt::Debug for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageHandle")
            .field("ptr", &self.ptr)
            .field("kind", &self.kind)
            .field("origin", &self.origin)
            .field("allocator", &self.allocator)
            .field("payload", &self.payload_name)
            .finish()
    }
}

impl Drop for MessageHandle {
    fn drop(&mut self) {
        warn!(
            kind = %self.kind,
            payload = self.payload_name,
            size = self.layout.size(),
            "message handle dropped without destroy, storage leaked"
        );
    }
}

/// Releases the handle in `slot` if every guard passes.
///
/// Refuses, leaving `slot` untouched, when the slot is empty, the allocator
/// is missing, or the handle belongs to another descriptor, kind or
/// allocator. On success the payload is dropped in place, the block goes back
/// to the allocator and `slot` is left empty.
pub(crate) fn release(
    slot: &mut Option<MessageHandle>,
    allocator: Option<&dyn Allocator>,
    origin: TypeSupportId,
    kind: MessageKind,
) -> bool {
    let (Some(handle), Some(allocator)) = (slot.as_ref(), allocator) else {
        trace!(%kind, "destroy refused: missing handle or allocator");
        return false;
    };

    if handle.origin != origin || handle.kind != kind {
        debug!(
            %kind,
            handle_kind = %handle.kind,
            payload = handle.payload_name,
            "destroy refused: handle belongs to another type support"
        );
        return false;
    }

    if handle.allocator != allocator.id() {
        warn!(
            %kind,
            payload = handle.payload_name,
            "destroy refused: allocator differs from the one used at creation"
        );
        return false;
    }

    let Some(handle) = slot.take() else {
        return false;
    };
    let handle = ManuallyDrop::new(handle);

    // SAFETY: the block was initialized by `emplace` with the payload the
    // drop glue was instantiated for, and was allocated by `allocator` with
    // `handle.layout`. The handle is consumed, so this runs once.
    unsafe {
        (handle.drop_payload)(handle.ptr);
        allocator.deallocate(handle.ptr, handle.layout);
    }

    trace!(%kind, payload = handle.payload_name, "message destroyed");
    true
}
