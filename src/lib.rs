//! In-process simulated network link
//!
//! [`pipe`] returns two connected [`Endpoint`]s, each a byte-stream reader
//! and writer, with a configurable *link simulator* interposed between
//! them. Unlike a plain in-memory pipe, it:
//!
//! - preserves message framing up to a configurable MTU, fragmenting
//!   oversized writes into multiple packets rather than silently
//!   concatenating everything into one unbounded blob;
//! - enforces independent byte-capacity limits at both the writer side
//!   (`out_limit`) and the reader side (`in_limit`), giving real
//!   backpressure instead of an unbounded buffer;
//! - delays delivery by a fixed `latency` to emulate propagation delay;
//! - paces delivery by a per-byte `byte_delay` to emulate finite link
//!   bandwidth;
//! - propagates closure correctly in both directions, including the
//!   subtle case of a reader closing while a packet is still in transit
//!   between it and a blocked writer.
//!
//! This is intended for tests and simulations of networked protocols
//! where deterministic control over framing, queue depth, latency, and
//! throughput actually matters -- which a bare in-memory pipe or a real
//! loopback socket cannot give you.
//!
//! # Quick example
//!
//! ```
//! use linkpipe::{pipe, PipeConfig};
//!
//! let (a, b) = pipe(PipeConfig::new()).unwrap();
//! a.write(b"hello, world").unwrap();
//! let mut buf = [0u8; 100];
//! let n = b.read(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"hello, world");
//! ```
//!
//! # Architecture
//!
//! Each direction is built from three stages: an ingress queue (bounded
//! by `out_limit`), a single-packet transit slot owned by a dedicated
//! link task that paces delivery against `latency` and `byte_delay`, and
//! an egress queue (bounded by `in_limit`). The link task is the only
//! thing that moves packets between queues; [`Endpoint::write`] and
//! [`Endpoint::read`] are thin adapters over the ingress and egress queue
//! of their respective direction.
//!
//! Closing either half of either endpoint is handled explicitly rather
//! than relying on `Drop` alone -- see [`Endpoint::close_write`] and
//! [`Endpoint::close_read`] for the (asymmetric) wake-up guarantees each
//! gives.
//!
//! # Capacity limits
//!
//! Every [`pipe`] must specify (or accept the default) MTU and buffer
//! limits. This is not an incidental restriction:
//!
//! - it gives built-in protection against unbounded memory growth if a
//!   test harness writes faster than it reads;
//! - it is what makes the backpressure and timing properties this crate
//!   exists to test actually deterministic and reproducible;
//! - a capacity of `0` for `in_limit`/`out_limit` is resolved to the
//!   configured `mtu`, never to a literal zero, since a zero-capacity
//!   queue could never admit even a single packet -- see
//!   [`PipeConfig::resolve`].
//!
//! # Concurrency model
//!
//! Each direction's link task runs on its own OS thread, and each queue
//! is guarded by a single `parking_lot` mutex plus a pair of condition
//! variables (one for "not full", one for "not empty"). No lock is held
//! across a pacing sleep. There is no fairness guarantee across multiple
//! concurrent writers on one endpoint, or multiple concurrent readers --
//! each endpoint has exactly one logical writer and one logical reader,
//! matching a real half-duplex stream.
#![forbid(unsafe_code)]

mod clock;
mod config;
mod endpoint;
mod error;
mod link;
mod packet;
mod pipe;
mod queue;

pub use clock::{Clock, SystemClock};
pub use config::{PipeConfig, ResolvedConfig, DEFAULT_MTU};
pub use endpoint::Endpoint;
pub use error::{PipeError, Result};
pub use pipe::{pipe, pipe_with_clock};

#[cfg(any(test, feature = "test-util"))]
pub use clock::VirtualClock;
