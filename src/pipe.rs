use std::sync::Arc;

use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::PipeConfig;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::link;
use crate::queue::BoundedQueue;

/// Construct a simulated link and return its two connected [`Endpoint`]s.
///
/// Validates `config` (see [`PipeConfig::resolve`]), builds the four
/// queues (an ingress/egress pair per direction), spawns the two link
/// tasks, and hands back endpoint `a` and endpoint `b`. Bytes written to
/// `a` are read from `b` and vice versa, each subject to `config`'s MTU,
/// buffer limits, latency, and bandwidth pacing.
///
/// Uses real wall-clock time ([`SystemClock`]). For deterministic tests,
/// see [`pipe_with_clock`].
pub fn pipe(config: PipeConfig) -> Result<(Endpoint, Endpoint)> {
    pipe_with_clock(config, Arc::new(SystemClock))
}

/// As [`pipe`], but with an explicit, injectable [`Clock`].
///
/// This is how a test harness drives latency/bandwidth scenarios without
/// depending on real wall-clock delay: construct a
/// [`VirtualClock`](crate::clock::VirtualClock), pass it here, and advance
/// it from the test thread while the endpoints run on their own link task
/// threads.
pub fn pipe_with_clock(config: PipeConfig, clock: Arc<dyn Clock>) -> Result<(Endpoint, Endpoint)> {
    let resolved = config.resolve()?;
    debug!(
        mtu = resolved.mtu(),
        in_limit = resolved.in_limit(),
        out_limit = resolved.out_limit(),
        latency = ?resolved.latency(),
        byte_delay = ?resolved.byte_delay(),
        "constructing pipe"
    );

    // Four queues: one ingress/egress pair per direction. "a_to_b"'s
    // egress is "b"'s read source; "b_to_a"'s egress is "a"'s read
    // source. `out_limit`/`in_limit` are from the writer's/reader's
    // respective point of view, so they apply symmetrically to both
    // directions.
    let a_to_b_ingress = Arc::new(BoundedQueue::new(resolved.out_limit()));
    let a_to_b_egress = Arc::new(BoundedQueue::new(resolved.in_limit()));
    let b_to_a_ingress = Arc::new(BoundedQueue::new(resolved.out_limit()));
    let b_to_a_egress = Arc::new(BoundedQueue::new(resolved.in_limit()));

    link::spawn(
        "a_to_b",
        Arc::clone(&a_to_b_ingress),
        Arc::clone(&a_to_b_egress),
        Arc::clone(&clock),
    );
    link::spawn(
        "b_to_a",
        Arc::clone(&b_to_a_ingress),
        Arc::clone(&b_to_a_egress),
        Arc::clone(&clock),
    );

    let endpoint_a = Endpoint::new(
        "a",
        a_to_b_ingress,
        b_to_a_egress,
        Arc::clone(&clock),
        resolved.mtu(),
        resolved.latency(),
        resolved.byte_delay(),
    );
    let endpoint_b = Endpoint::new(
        "b",
        b_to_a_ingress,
        a_to_b_egress,
        clock,
        resolved.mtu(),
        resolved.latency(),
        resolved.byte_delay(),
    );

    Ok((endpoint_a, endpoint_b))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trip_with_defaults() {
        let (a, b) = pipe(PipeConfig::new()).unwrap();
        a.write(b"hello, world").unwrap();
        let mut buf = [0u8; 100];
        let n = b.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello, world");
    }

    #[test]
    fn both_directions_are_independent() {
        let (a, b) = pipe(PipeConfig::new()).unwrap();
        a.write(b"ping").unwrap();
        b.write(b"pong").unwrap();

        let mut buf = [0u8; 10];
        let n = b.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ping");
        let n = a.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"pong");
    }

    #[test]
    fn invalid_config_is_rejected_before_any_thread_spawns() {
        let err = pipe(PipeConfig::new().mtu(0)).unwrap_err();
        assert!(err.is_config_invalid());
    }
}
