//! The frame value, its backing allocator, and the shared control block.
//!
//! A [`Frame`] is a cheap clonable handle over a pooled slot. The slot's
//! plane pointers either alias the native capture buffer (zero-copy) or the
//! slot's own allocator memory (after a copy or conversion). When the last
//! handle drops, the control block runs the native release hook and hands the
//! slot back to the pool, on whichever thread that last drop happens.

use std::fmt;
use std::mem::ManuallyDrop;
use std::slice;
use std::sync::{Arc, Weak};

use crate::format::PixelFormat;
use crate::pool::PoolShared;

/// Maximum number of planes a frame can carry (I420).
pub const MAX_PLANES: usize = 3;

/// Where row 0 of the image sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Row 0 is the top of the image.
    #[default]
    TopDown,
    /// Row 0 is the bottom of the image.
    BottomUp,
}

/// Backing memory for a frame when zero-copy is not possible.
///
/// Implementations own a resizable byte buffer. The default is a plain heap
/// vector; embedders with pinned or shared memory install their own factory
/// via `CaptureProvider::set_frame_allocator`.
pub trait FrameAllocator: Send {
    /// Grow or shrink the buffer to exactly `len` bytes.
    fn resize(&mut self, len: usize);

    /// Base pointer of the buffer. Only valid until the next `resize`.
    fn data(&mut self) -> *mut u8;

    /// Current buffer size in bytes.
    fn len(&self) -> usize;

    /// Whether the buffer has never been sized.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The default heap-backed allocator.
#[derive(Default)]
pub struct HeapAllocator {
    buf: Vec<u8>,
}

impl FrameAllocator for HeapAllocator {
    fn resize(&mut self, len: usize) {
        self.buf.resize(len, 0);
    }

    fn data(&mut self) -> *mut u8 {
        self.buf.as_mut_ptr()
    }

    fn len(&self) -> usize {
        self.buf.len()
    }
}

/// Factory producing allocators for new pool slots.
pub type AllocatorFactory = Box<dyn Fn() -> Box<dyn FrameAllocator> + Send + Sync>;

/// Deferred cleanup for a native capture buffer.
///
/// Runs exactly once: either explicitly after a copy/conversion detached the
/// frame from the native buffer, or from the frame control block when the
/// last [`Frame`] handle drops. Dropping an un-run hook runs it.
pub struct NativeRelease(Option<Box<dyn FnOnce() + Send>>);

impl NativeRelease {
    /// Wrap a release closure (unlock base address, release the sample, ...).
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    pub(crate) fn run(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl Drop for NativeRelease {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

// Safety: the closure is only ever moved out under exclusive access (run or
// Drop); it is never invoked through a shared reference.
unsafe impl Sync for NativeRelease {}

impl fmt::Debug for NativeRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeRelease")
    }
}

/// One reusable frame slot. Owned by the pool when free, by a frame control
/// block while a capture is alive.
pub(crate) struct FrameSlot {
    pub(crate) allocator: Box<dyn FrameAllocator>,
    pub(crate) planes: [*const u8; MAX_PLANES],
    pub(crate) strides: [usize; MAX_PLANES],
    pub(crate) format: PixelFormat,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) size_in_bytes: usize,
    pub(crate) timestamp_ns: u64,
    pub(crate) frame_index: u64,
    pub(crate) orientation: Orientation,
    /// Plane pointers alias the native buffer rather than `allocator`.
    pub(crate) zero_copy: bool,
}

// Safety: plane pointers refer either to the slot's own allocator buffer or
// to a native buffer pinned by the control block's release hook for at least
// as long as the slot is outstanding.
unsafe impl Send for FrameSlot {}
unsafe impl Sync for FrameSlot {}

impl FrameSlot {
    pub(crate) fn new(allocator: Box<dyn FrameAllocator>) -> Self {
        Self {
            allocator,
            planes: [std::ptr::null(); MAX_PLANES],
            strides: [0; MAX_PLANES],
            format: PixelFormat::UNKNOWN,
            width: 0,
            height: 0,
            size_in_bytes: 0,
            timestamp_ns: 0,
            frame_index: 0,
            orientation: Orientation::TopDown,
            zero_copy: false,
        }
    }

    /// Clear capture state; the allocator keeps its buffer for reuse.
    pub(crate) fn reset(&mut self) {
        self.planes = [std::ptr::null(); MAX_PLANES];
        self.strides = [0; MAX_PLANES];
        self.format = PixelFormat::UNKNOWN;
        self.width = 0;
        self.height = 0;
        self.size_in_bytes = 0;
        self.timestamp_ns = 0;
        self.frame_index = 0;
        self.orientation = Orientation::TopDown;
        self.zero_copy = false;
    }
}

struct FrameGuard {
    slot: ManuallyDrop<FrameSlot>,
    release: Option<NativeRelease>,
    pool: Weak<PoolShared>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        // Unlock the native buffer before the slot can be handed out again.
        if let Some(hook) = self.release.take() {
            hook.run();
        }
        // Safety: taken exactly once, here.
        let mut slot = unsafe { ManuallyDrop::take(&mut self.slot) };
        slot.reset();
        if let Some(pool) = self.pool.upgrade() {
            pool.recycle(slot);
        }
        // Pool already gone: the slot (and its allocator) just drops.
    }
}

/// A captured video frame.
///
/// Clones share the same storage. Plane data stays valid, and any native
/// backing stays pinned, for as long as at least one handle exists, so frames
/// may safely outlive `stop()` and even the provider.
#[derive(Clone)]
pub struct Frame {
    guard: Arc<FrameGuard>,
}

impl Frame {
    pub(crate) fn publish(
        slot: FrameSlot,
        release: Option<NativeRelease>,
        pool: Weak<PoolShared>,
    ) -> Self {
        Self {
            guard: Arc::new(FrameGuard {
                slot: ManuallyDrop::new(slot),
                release,
                pool,
            }),
        }
    }

    fn slot(&self) -> &FrameSlot {
        &self.guard.slot
    }

    /// Frame width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.slot().width
    }

    /// Frame height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.slot().height
    }

    /// Pixel format of the data as delivered.
    #[must_use]
    pub fn pixel_format(&self) -> PixelFormat {
        self.slot().format
    }

    /// Presentation timestamp in nanoseconds, monotonic within a session.
    #[must_use]
    pub fn timestamp_ns(&self) -> u64 {
        self.slot().timestamp_ns
    }

    /// Session-monotonic index, assigned at enqueue time. Gaps in a sequence
    /// of grabbed frames correspond to dropped frames.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.slot().frame_index
    }

    /// Total payload bytes across all planes.
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.slot().size_in_bytes
    }

    /// Where row 0 sits.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.slot().orientation
    }

    /// Row pitch in bytes of the given plane.
    #[must_use]
    pub fn stride(&self, plane: usize) -> usize {
        if plane < MAX_PLANES {
            self.slot().strides[plane]
        } else {
            0
        }
    }

    /// Borrow the given plane, or `None` when the format has no such plane.
    #[must_use]
    pub fn plane(&self, plane: usize) -> Option<&[u8]> {
        let slot = self.slot();
        if plane >= MAX_PLANES || slot.planes[plane].is_null() {
            return None;
        }
        let rows = slot.format.plane_rows(plane, slot.height);
        let row_bytes = slot.format.plane_row_bytes(plane, slot.width);
        if rows == 0 || row_bytes == 0 {
            return None;
        }
        let len = (rows - 1) * slot.strides[plane] + row_bytes;
        // Safety: the slot invariant guarantees `len` bytes behind the plane
        // pointer for as long as the control block is alive.
        Some(unsafe { slice::from_raw_parts(slot.planes[plane], len) })
    }

    /// Whether the plane pointers alias the native capture buffer.
    ///
    /// False after an in-place conversion or a copy into the allocator.
    #[must_use]
    pub fn is_zero_copy(&self) -> bool {
        self.slot().zero_copy
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.slot();
        f.debug_struct("Frame")
            .field("index", &s.frame_index)
            .field("format", &s.format)
            .field("width", &s.width)
            .field("height", &s.height)
            .field("timestamp_ns", &s.timestamp_ns)
            .field("zero_copy", &s.zero_copy)
            .finish()
    }
}
