//! The pacing engine: one task per direction, moving packets from an
//! ingress queue through a single-packet transit slot to an egress queue.
//!
//! See the crate-level docs for the overall shape of a `pipe`; this module
//! is where the latency/bandwidth pacing and the backward close
//! propagation actually happen.

use std::sync::Arc;
use std::thread;

use tracing::{debug, trace, warn};

use crate::clock::Clock;
use crate::error::PipeError;
use crate::queue::BoundedQueue;

/// Spawn the link task for one direction and detach it.
///
/// The task's lifetime is governed entirely by the two queues it holds
/// `Arc`s to: it exits once `ingress` is drained and closed. There is
/// nothing for the caller to join -- by the time both endpoints of a
/// [`pipe`](crate::pipe) have been dropped and closed, this loop runs to
/// completion on its own.
pub(crate) fn spawn(
    direction: &'static str,
    ingress: Arc<BoundedQueue>,
    egress: Arc<BoundedQueue>,
    clock: Arc<dyn Clock>,
) {
    let builder = thread::Builder::new().name(format!("linkpipe-{direction}"));
    builder
        .spawn(move || run(direction, &ingress, &egress, &*clock))
        .expect("failed to spawn link task thread");
}

fn run(direction: &'static str, ingress: &BoundedQueue, egress: &BoundedQueue, clock: &dyn Clock) {
    let _span = tracing::info_span!("link_task", direction).entered();
    loop {
        let pkt = match ingress.pop() {
            Ok(pkt) => pkt,
            Err(PipeError::EndOfStream) => {
                debug!(direction, "ingress drained and closed, closing egress");
                egress.close();
                return;
            }
            Err(other) => unreachable!("ingress.pop() cannot fail with {other:?}"),
        };

        let deliver_time = pkt.deliver_time();
        trace!(direction, len = pkt.len(), ?deliver_time, "packet entered transit");
        clock.sleep_until(deliver_time, &|| egress.is_closed());

        match egress.push(pkt) {
            Ok(()) => {}
            Err(PipeError::BrokenPipe) => {
                warn!(
                    direction,
                    "destination closed while packet was in transit, dropping it"
                );
                // Backward wake-up: close ingress too, so a writer blocked
                // on a full ingress queue wakes with BrokenPipe instead of
                // hanging behind a reader that will never read again.
                ingress.close();
            }
            Err(other) => unreachable!("egress.push() cannot fail with {other:?}"),
        }
    }
}
