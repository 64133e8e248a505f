//! Frame batching.
//!
//! Draw requests are queued and flushed together on the next frame callback
//! from the host. Only the first request in a frame window asks the host for
//! a frame.

/// Host hook that arranges for `on_frame` to be called once, later.
pub trait FrameClock {
    fn request_frame(&mut self);

    /// Drop a pending request, if the host supports that.
    fn cancel_frame(&mut self) {}
}

/// Clock that only counts requests. Tests and headless hosts drive frames
/// by hand.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    pub requested: usize,
    pub cancelled: usize,
}

impl FrameClock for ManualClock {
    fn request_frame(&mut self) {
        self.requested += 1;
    }

    fn cancel_frame(&mut self) {
        self.cancelled += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    #[default]
    Idle,
    Scheduled,
    Flushing,
}

/// Queue plus state machine: `Idle -> Scheduled -> Flushing -> Idle`.
#[derive(Debug)]
pub struct FrameScheduler<T> {
    state: FrameState,
    queue: Vec<T>,
}

impl<T> Default for FrameScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FrameScheduler<T> {
    pub fn new() -> Self {
        Self {
            state: FrameState::Idle,
            queue: Vec::new(),
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Append an item, requesting a frame if none is pending.
    pub fn queue<C: FrameClock + ?Sized>(&mut self, item: T, clock: &mut C) {
        self.queue.push(item);
        if self.state == FrameState::Idle {
            self.state = FrameState::Scheduled;
            clock.request_frame();
        }
    }

    /// Take everything queued so far. `None` unless a frame was scheduled.
    pub fn begin_flush(&mut self) -> Option<Vec<T>> {
        if self.state != FrameState::Scheduled {
            return None;
        }
        self.state = FrameState::Flushing;
        Some(std::mem::take(&mut self.queue))
    }

    /// Finish a flush. Items queued while flushing get a new frame.
    pub fn end_flush<C: FrameClock + ?Sized>(&mut self, clock: &mut C) {
        if self.state != FrameState::Flushing {
            return;
        }
        if self.queue.is_empty() {
            self.state = FrameState::Idle;
        } else {
            self.state = FrameState::Scheduled;
            clock.request_frame();
        }
    }

    /// Drop queued items and any pending frame.
    pub fn cancel<C: FrameClock + ?Sized>(&mut self, clock: &mut C) {
        if self.state == FrameState::Scheduled {
            clock.cancel_frame();
        }
        self.queue.clear();
        self.state = FrameState::Idle;
    }
}
