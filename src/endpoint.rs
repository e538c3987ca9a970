use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::trace;

use crate::clock::Clock;
use crate::error::{PipeError, Result};
use crate::packet::Packet;
use crate::queue::BoundedQueue;

/// One side of a [`pipe`](crate::pipe): a byte-stream reader and writer
/// adapter over a pair of [`BoundedQueue`]s.
///
/// An `Endpoint` has one logical writer and one logical reader; concurrent
/// calls to `write` from multiple callers (or `read` from multiple
/// callers) are not serialized against each other by this type -- callers
/// needing that must serialize externally, exactly as the design assumes.
/// `Endpoint` is `Send + Sync`, so a single instance can still be shared
/// between, say, one thread that only ever writes and one that only ever
/// reads.
pub struct Endpoint {
    ingress: Arc<BoundedQueue>,
    egress: Arc<BoundedQueue>,
    clock: Arc<dyn Clock>,
    mtu: usize,
    latency: Duration,
    byte_delay: Duration,
    last_deliver: Mutex<Option<Instant>>,
    pending_read: Mutex<Option<Packet>>,
    read_closed: AtomicBool,
    direction: &'static str,
}

impl Endpoint {
    pub(crate) fn new(
        direction: &'static str,
        ingress: Arc<BoundedQueue>,
        egress: Arc<BoundedQueue>,
        clock: Arc<dyn Clock>,
        mtu: usize,
        latency: Duration,
        byte_delay: Duration,
    ) -> Self {
        Self {
            ingress,
            egress,
            clock,
            mtu,
            latency,
            byte_delay,
            last_deliver: Mutex::new(None),
            pending_read: Mutex::new(None),
            read_closed: AtomicBool::new(false),
            direction,
        }
    }

    /// Write `buf`, fragmenting it into `mtu`-sized packets as needed.
    ///
    /// Returns `Ok(len)` equal to `buf.len()` on full success. If the
    /// output side was already closed before this call, fails with
    /// [`PipeError::BrokenPipe`] and writes nothing. If the peer's input
    /// closes partway through fragmenting a larger buffer, returns
    /// `Ok(n)` with `n < buf.len()` reflecting exactly the bytes already
    /// handed off to the ingress queue -- a short write, not an error,
    /// since those bytes really were accepted.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        if self.ingress.is_closed() {
            return Err(PipeError::BrokenPipe);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        for chunk in buf.chunks(self.mtu) {
            let send_time = self.clock.now();
            let transit_cost = self
                .byte_delay
                .checked_mul(chunk.len() as u32)
                .unwrap_or(Duration::MAX)
                .checked_add(self.latency)
                .unwrap_or(Duration::MAX);
            let mut deliver_time = send_time.checked_add(transit_cost).unwrap_or(send_time);

            let mut last_deliver = self.last_deliver.lock();
            if let Some(prev) = *last_deliver {
                deliver_time = deliver_time.max(prev);
            }
            *last_deliver = Some(deliver_time);
            drop(last_deliver);

            let pkt = Packet::new(chunk.to_vec(), send_time, deliver_time);
            trace!(direction = self.direction, len = chunk.len(), ?deliver_time, "packet handed to ingress");
            match self.ingress.push(pkt) {
                Ok(()) => written += chunk.len(),
                Err(PipeError::BrokenPipe) if written > 0 => return Ok(written),
                Err(other) => return Err(other),
            }
        }
        Ok(written)
    }

    /// Read up to `buf.len()` bytes, blocking until at least one byte is
    /// available or the stream has ended.
    ///
    /// Packet boundaries are not observable here: if the head packet has
    /// more bytes than `buf`, the remainder stays at the head of the
    /// egress queue for the next call.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if self.read_closed.load(Ordering::SeqCst) {
            return Err(PipeError::EndOfStream);
        }

        let mut pending = self.pending_read.lock();
        if pending.is_none() {
            match self.egress.pop() {
                Ok(pkt) => *pending = Some(pkt),
                Err(err) => return Err(err),
            }
        }

        let pkt = pending.as_mut().expect("just populated above");
        let remaining = pkt.remaining();
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        pkt.consume(n);
        if pkt.is_exhausted() {
            *pending = None;
        }
        trace!(direction = self.direction, n, "bytes delivered to reader");
        Ok(n)
    }

    /// Close the output (writer) half. Idempotent. Any write already
    /// blocked on a full ingress queue, and every write after this call,
    /// fails with [`PipeError::BrokenPipe`]. Already-queued bytes still
    /// drain to the peer in order.
    pub fn close_write(&self) {
        self.ingress.close();
    }

    /// Close the input (reader) half. Idempotent. Pending and future
    /// reads return [`PipeError::EndOfStream`] immediately, discarding any
    /// buffered-but-unread bytes. This also propagates backward: the link
    /// task feeding this egress queue wakes and in turn closes the
    /// ingress queue it reads from, so a peer writer blocked on a full
    /// queue is released with [`PipeError::BrokenPipe`] rather than
    /// hanging behind a reader that will never read again.
    pub fn close_read(&self) {
        self.read_closed.store(true, Ordering::SeqCst);
        self.egress.close();
    }

    /// Close both halves of this endpoint. See [`Endpoint::close_write`]
    /// and [`Endpoint::close_read`].
    pub fn close(&self) {
        self.close_write();
        self.close_read();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clock::SystemClock;

    fn harness(mtu: usize, limit: usize) -> (Endpoint, Arc<BoundedQueue>, Arc<BoundedQueue>) {
        harness_with_delay(mtu, limit, Duration::ZERO)
    }

    fn harness_with_delay(
        mtu: usize,
        limit: usize,
        byte_delay: Duration,
    ) -> (Endpoint, Arc<BoundedQueue>, Arc<BoundedQueue>) {
        let ingress = Arc::new(BoundedQueue::new(limit));
        let egress = Arc::new(BoundedQueue::new(limit));
        let ep = Endpoint::new(
            "test",
            Arc::clone(&ingress),
            Arc::clone(&egress),
            Arc::new(SystemClock),
            mtu,
            Duration::ZERO,
            byte_delay,
        );
        (ep, ingress, egress)
    }

    #[test]
    fn write_fragments_to_mtu() {
        let (ep, ingress, _egress) = harness(4, 100);
        let n = ep.write(b"hello world").unwrap();
        assert_eq!(n, 11);
        // 4 + 4 + 3 bytes => three packets
        let mut total = 0;
        while ingress.queued_bytes() > 0 {
            let pkt = ingress.pop().unwrap();
            total += pkt.len();
            assert!(pkt.len() <= 4);
        }
        assert_eq!(total, 11);
    }

    #[test]
    fn read_splits_across_small_buffers() {
        let (ep, ingress, egress) = harness(100, 100);
        let now = Instant::now();
        egress
            .push(Packet::new(b"hello".to_vec(), now, now))
            .unwrap();
        drop(ingress);

        let mut buf = [0u8; 2];
        assert_eq!(ep.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"he");
        assert_eq!(ep.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf, b"ll");
        assert_eq!(ep.read(&mut buf).unwrap(), 1);
        assert_eq!(&buf[..1], b"o");
    }

    #[test]
    fn write_after_close_is_broken_pipe() {
        let (ep, _ingress, _egress) = harness(100, 100);
        ep.close_write();
        assert_eq!(ep.write(b"x").unwrap_err(), PipeError::BrokenPipe);
    }

    #[test]
    fn deliver_time_is_clamped_to_be_non_decreasing() {
        // A large packet costs much more transit time than a small one. Two
        // back-to-back writes -- big then small -- both fit in a single
        // queue without blocking, so their send-times are nearly identical;
        // without the monotonicity clamp in `write`, the small packet's
        // naively-computed deliver-time would land *before* the big packet
        // still in flight ahead of it, reordering bytes on delivery.
        let byte_delay = Duration::from_millis(1);
        let (ep, ingress, _egress) = harness_with_delay(1000, 10_000, byte_delay);

        ep.write(&vec![0u8; 100]).unwrap();
        ep.write(&[0u8; 1]).unwrap();

        let first = ingress.pop().unwrap();
        let second = ingress.pop().unwrap();
        assert!(
            second.deliver_time() >= first.deliver_time(),
            "second packet's deliver-time must not precede the first's"
        );
    }

    #[test]
    fn read_after_close_is_end_of_stream_even_with_pending_data() {
        let (ep, _ingress, egress) = harness(100, 100);
        let now = Instant::now();
        egress
            .push(Packet::new(b"buffered".to_vec(), now, now))
            .unwrap();
        ep.close_read();
        assert_eq!(ep.read(&mut [0u8; 4]).unwrap_err(), PipeError::EndOfStream);
    }
}
