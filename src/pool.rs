//! Bounded pool of reusable frame slots.
//!
//! The capture thread is the only acquirer; frame control blocks are the
//! only producers of freed slots, returning them from whatever thread
//! dropped the last handle. `acquire` never blocks; when every slot is
//! outstanding the capture path drops the incoming sample instead.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::frame::{AllocatorFactory, FrameSlot};
use crate::log::log_verbose;

/// Default maximum number of cached slots.
pub const DEFAULT_MAX_CACHE: usize = 15;

pub(crate) struct PoolShared {
    free: Mutex<Vec<FrameSlot>>,
    idle: Condvar,
    /// Slots currently in existence (free + outstanding).
    total: AtomicUsize,
    max: AtomicUsize,
}

impl PoolShared {
    /// Return a slot to the free list, or retire it when the cap shrank.
    pub(crate) fn recycle(&self, slot: FrameSlot) {
        let mut free = self.free.lock();
        if self.total.load(Ordering::Relaxed) > self.max.load(Ordering::Relaxed) {
            // Excess above a lowered cap shrinks as frames come home.
            self.total.fetch_sub(1, Ordering::Relaxed);
            drop(free);
            log_verbose!("retiring surplus frame slot");
            return;
        }
        free.push(slot);
        drop(free);
        self.idle.notify_all();
    }
}

pub(crate) struct FramePool {
    shared: Arc<PoolShared>,
    factory: AllocatorFactory,
}

impl FramePool {
    pub(crate) fn new(max: usize, factory: AllocatorFactory) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                free: Mutex::new(Vec::new()),
                idle: Condvar::new(),
                total: AtomicUsize::new(0),
                max: AtomicUsize::new(max.max(1)),
            }),
            factory,
        }
    }

    /// Hand out a free slot, lazily growing up to the cap. Never blocks.
    pub(crate) fn acquire(&self) -> Option<FrameSlot> {
        if let Some(slot) = self.shared.free.lock().pop() {
            return Some(slot);
        }
        if self.shared.total.load(Ordering::Relaxed) >= self.shared.max.load(Ordering::Relaxed) {
            return None;
        }
        self.shared.total.fetch_add(1, Ordering::Relaxed);
        Some(FrameSlot::new((self.factory)()))
    }

    /// Weak handle for frame control blocks.
    pub(crate) fn downgrade(&self) -> Weak<PoolShared> {
        Arc::downgrade(&self.shared)
    }

    /// Return a slot that never made it into a frame (e.g. failed
    /// conversion on the capture path).
    pub(crate) fn recycle(&self, mut slot: FrameSlot) {
        slot.reset();
        self.shared.recycle(slot);
    }

    /// Raise or lower the slot cap. Lowering does not reclaim outstanding
    /// slots; the surplus retires as frames are released.
    pub(crate) fn set_max_cache_size(&self, max: usize) {
        self.shared.max.store(max.max(1), Ordering::Relaxed);
        let mut free = self.shared.free.lock();
        while self.shared.total.load(Ordering::Relaxed) > max.max(1) {
            if free.pop().is_none() {
                break;
            }
            self.shared.total.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn free_count(&self) -> usize {
        self.shared.free.lock().len()
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.shared.total.load(Ordering::Relaxed) - self.free_count()
    }

    /// Wait until every outstanding slot has come home, up to `timeout`.
    /// Used on teardown so release hooks never race provider destruction.
    pub(crate) fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut free = self.shared.free.lock();
        loop {
            if free.len() == self.shared.total.load(Ordering::Relaxed) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if self
                .shared
                .idle
                .wait_for(&mut free, deadline - now)
                .timed_out()
            {
                return free.len() == self.shared.total.load(Ordering::Relaxed);
            }
        }
    }
}
