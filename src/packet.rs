use std::time::Instant;

/// A single framing unit moving through a [`pipe`](crate::pipe) in one
/// direction.
///
/// Created by the writer-side [`Endpoint`](crate::Endpoint) adapter when a
/// `write` call fragments its input to at most `mtu` bytes, carried
/// through the ingress queue, the link task's transit slot, and the
/// egress queue, then consumed (possibly only in part, see
/// [`Endpoint::read`](crate::Endpoint::read)) by the reader side. A packet
/// is never shared between endpoints or mutated once created, other than
/// having bytes drained off its front as a reader partially consumes it.
#[derive(Debug, Clone)]
pub struct Packet {
    payload: Vec<u8>,
    /// How far into `payload` a partial read has already consumed.
    consumed: usize,
    send_time: Instant,
    deliver_time: Instant,
}

impl Packet {
    pub(crate) fn new(payload: Vec<u8>, send_time: Instant, deliver_time: Instant) -> Self {
        Self {
            payload,
            consumed: 0,
            send_time,
            deliver_time,
        }
    }

    /// Total byte length of this packet, including any portion already
    /// consumed by a prior partial read.
    pub(crate) fn len(&self) -> usize {
        self.payload.len()
    }

    /// Bytes not yet delivered to a reader.
    pub(crate) fn remaining(&self) -> &[u8] {
        &self.payload[self.consumed..]
    }

    /// Mark `n` bytes as consumed from the front. `n` must not exceed
    /// `remaining().len()`.
    pub(crate) fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.remaining().len());
        self.consumed += n;
    }

    /// `true` once every byte has been read out.
    pub(crate) fn is_exhausted(&self) -> bool {
        self.consumed >= self.payload.len()
    }

    pub(crate) fn send_time(&self) -> Instant {
        self.send_time
    }

    pub(crate) fn deliver_time(&self) -> Instant {
        self.deliver_time
    }
}
