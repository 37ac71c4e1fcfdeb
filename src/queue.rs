//! Bounded FIFO of ready frames with drop-oldest backpressure.
//!
//! One mutex and one condition variable. The producer is the capture
//! thread; consumers are `grab` waiters and the delivery thread. A stop bit
//! is checked on both wait paths so no waiter hangs past `stop()`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::frame::Frame;
use crate::log::log_verbose;

/// Default maximum number of queued ready frames.
pub const DEFAULT_MAX_AVAILABLE: usize = 3;

struct State {
    frames: VecDeque<Frame>,
    max: usize,
    stopped: bool,
}

pub(crate) struct ReadyQueue {
    state: Mutex<State>,
    ready: Condvar,
}

impl ReadyQueue {
    pub(crate) fn new(max: usize) -> Self {
        Self {
            state: Mutex::new(State {
                frames: VecDeque::new(),
                max: max.max(1),
                stopped: true,
            }),
            ready: Condvar::new(),
        }
    }

    /// Append a frame, evicting the oldest when full. Always signals.
    pub(crate) fn push(&self, frame: Frame) {
        let mut state = self.state.lock();
        if state.frames.len() >= state.max {
            if let Some(dropped) = state.frames.pop_front() {
                log_verbose!(index = dropped.frame_index(), "ready queue full, dropping oldest frame");
            }
        }
        state.frames.push_back(frame);
        drop(state);
        self.ready.notify_all();
    }

    /// Put a frame back at the front (callback declined to consume it).
    pub(crate) fn reinstate(&self, frame: Frame) {
        let mut state = self.state.lock();
        state.frames.push_front(frame);
        drop(state);
        self.ready.notify_all();
    }

    /// Remove and return the front frame.
    ///
    /// `None` timeout blocks until a frame arrives or the queue stops;
    /// `Some(0)` is non-blocking.
    pub(crate) fn pop(&self, timeout: Option<Duration>) -> Option<Frame> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();
        loop {
            if state.stopped {
                return None;
            }
            if let Some(frame) = state.frames.pop_front() {
                return Some(frame);
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    self.ready.wait_for(&mut state, deadline - now);
                }
                None => self.ready.wait(&mut state),
            }
        }
    }

    /// Remove the first frame with index above `last`, leaving earlier
    /// frames (reinstated ones) for `grab`. Blocks until such a frame
    /// arrives or the queue stops.
    pub(crate) fn take_after(&self, last: Option<u64>) -> Option<Frame> {
        let mut state = self.state.lock();
        loop {
            if state.stopped {
                return None;
            }
            let pos = state
                .frames
                .iter()
                .position(|f| last.is_none_or(|l| f.frame_index() > l));
            if let Some(pos) = pos {
                return state.frames.remove(pos);
            }
            self.ready.wait(&mut state);
        }
    }

    /// Drop all queued frames.
    pub(crate) fn flush(&self) {
        self.state.lock().frames.clear();
    }

    /// Resize the bound, trimming oldest entries when shrinking.
    pub(crate) fn set_max_available(&self, max: usize) {
        let mut state = self.state.lock();
        state.max = max.max(1);
        while state.frames.len() > state.max {
            state.frames.pop_front();
        }
    }

    /// Set or clear the stop bit. Setting wakes every waiter.
    pub(crate) fn set_stopped(&self, stopped: bool) {
        self.state.lock().stopped = stopped;
        if stopped {
            self.ready.notify_all();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PixelFormat;
    use crate::frame::{Frame, FrameSlot, HeapAllocator};
    use std::sync::Arc;
    use std::sync::Weak;
    use std::thread;

    fn frame(index: u64) -> Frame {
        let mut slot = FrameSlot::new(Box::<HeapAllocator>::default());
        slot.format = PixelFormat::NV12;
        slot.frame_index = index;
        Frame::publish(slot, None, Weak::new())
    }

    fn running_queue(max: usize) -> ReadyQueue {
        let q = ReadyQueue::new(max);
        q.set_stopped(false);
        q
    }

    #[test]
    fn fifo_order() {
        let q = running_queue(8);
        for i in 0..4 {
            q.push(frame(i));
        }
        for i in 0..4 {
            assert_eq!(q.pop(Some(Duration::ZERO)).expect("frame").frame_index(), i);
        }
        assert!(q.pop(Some(Duration::ZERO)).is_none());
    }

    #[test]
    fn overflow_drops_oldest() {
        let q = running_queue(2);
        for i in 0..5 {
            q.push(frame(i));
        }
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop(Some(Duration::ZERO)).expect("frame").frame_index(), 3);
        assert_eq!(q.pop(Some(Duration::ZERO)).expect("frame").frame_index(), 4);
    }

    #[test]
    fn pop_times_out() {
        let q = running_queue(2);
        let t0 = Instant::now();
        assert!(q.pop(Some(Duration::from_millis(50))).is_none());
        assert!(t0.elapsed() >= Duration::from_millis(45));
    }

    #[test]
    fn stop_unblocks_waiters() {
        let q = Arc::new(running_queue(2));
        let waiter = {
            let q = q.clone();
            thread::spawn(move || q.pop(None))
        };
        thread::sleep(Duration::from_millis(50));
        q.set_stopped(true);
        let popped = waiter.join().expect("join");
        assert!(popped.is_none());
    }

    #[test]
    fn take_after_skips_reinstated_front() {
        let q = running_queue(8);
        q.push(frame(5));
        q.push(frame(6));
        // Delivery already saw 5 and put it back; it must pick 6 next while
        // grab still finds 5 at the front.
        let taken = q.take_after(Some(5)).expect("frame");
        assert_eq!(taken.frame_index(), 6);
        assert_eq!(q.pop(Some(Duration::ZERO)).expect("frame").frame_index(), 5);
    }

    #[test]
    fn shrink_trims_oldest() {
        let q = running_queue(4);
        for i in 0..4 {
            q.push(frame(i));
        }
        q.set_max_available(2);
        assert_eq!(q.pop(Some(Duration::ZERO)).expect("frame").frame_index(), 2);
    }
}
