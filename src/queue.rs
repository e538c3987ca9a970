use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::error::{PipeError, Result};
use crate::packet::Packet;

struct State {
    items: VecDeque<Packet>,
    bytes: usize,
    closed: bool,
}

/// A concurrent, byte-capacity-bounded FIFO of [`Packet`]s.
///
/// This is the primitive both the ingress and egress queues of a
/// [`pipe`](crate::pipe) are built from. `push` blocks while admitting the
/// packet would exceed `byte_capacity`; `pop` blocks while empty. Both
/// unblock immediately when [`BoundedQueue::close`] is called, which is
/// idempotent and wakes every current waiter.
///
/// Closing affects the two operations asymmetrically, matching a
/// half-duplex pipe's semantics: a closed queue accepts no further
/// pushes (they fail with [`PipeError::BrokenPipe`]) but continues to
/// drain whatever is already queued to `pop` callers before those start
/// failing with [`PipeError::EndOfStream`].
pub(crate) struct BoundedQueue {
    state: Mutex<State>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl BoundedQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                bytes: 0,
                closed: false,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Push `pkt`, blocking while doing so would exceed `byte_capacity`.
    ///
    /// A packet whose own length exceeds `byte_capacity` would block
    /// forever; callers are responsible for keeping packets at or below
    /// the capacity (the [`Endpoint`](crate::Endpoint) layer enforces
    /// `mtu <= capacity` at construction so this can't happen through the
    /// public API).
    pub(crate) fn push(&self, pkt: Packet) -> Result<()> {
        let len = pkt.len();
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(PipeError::BrokenPipe);
            }
            if state.bytes + len <= self.capacity {
                break;
            }
            self.not_full.wait(&mut state);
        }
        state.bytes += len;
        state.items.push_back(pkt);
        drop(state);
        self.not_empty.notify_all();
        Ok(())
    }

    /// Pop the next packet, blocking while the queue is empty and open.
    ///
    /// Returns [`PipeError::EndOfStream`] once the queue is both empty and
    /// closed, which is how end-of-stream/broken-pipe signals drain
    /// through to the far side once already-queued bytes are exhausted.
    pub(crate) fn pop(&self) -> Result<Packet> {
        let mut state = self.state.lock();
        loop {
            if let Some(pkt) = state.items.pop_front() {
                state.bytes -= pkt.len();
                drop(state);
                self.not_full.notify_all();
                return Ok(pkt);
            }
            if state.closed {
                return Err(PipeError::EndOfStream);
            }
            self.not_empty.wait(&mut state);
        }
    }

    /// Idempotent. Marks the queue closed and wakes every waiter blocked
    /// in [`BoundedQueue::push`] or [`BoundedQueue::pop`].
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        drop(state);
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    #[cfg(test)]
    pub(crate) fn queued_bytes(&self) -> usize {
        self.state.lock().bytes
    }
}
