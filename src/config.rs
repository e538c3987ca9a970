use std::time::Duration;

use crate::error::{PipeError, Result};

/// Default MTU used when [`PipeConfig::mtu`] is not called: 64 KiB.
pub const DEFAULT_MTU: usize = 65536;

/// Configuration for a [`pipe`](crate::pipe).
///
/// Built up with a small setter-per-field builder, following the same
/// "cheap, validated once at the single entry point" discipline as the
/// pipe-buffer this crate's queueing primitive is descended from. Nothing
/// here does any work until [`PipeConfig::resolve`] (called internally by
/// [`pipe`](crate::pipe)) validates the whole record at once.
#[derive(Clone, Copy, Debug)]
pub struct PipeConfig {
    mtu: usize,
    in_limit: usize,
    out_limit: usize,
    latency: Duration,
    byte_delay: Duration,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            mtu: DEFAULT_MTU,
            in_limit: 0,
            out_limit: 0,
            latency: Duration::ZERO,
            byte_delay: Duration::ZERO,
        }
    }
}

impl PipeConfig {
    /// Start from the all-default configuration (see field docs below for
    /// what each default resolves to).
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum bytes per packet. Writes larger than this are fragmented
    /// into `mtu`-sized packets. Default: [`DEFAULT_MTU`].
    #[inline]
    pub fn mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Byte capacity of the reader-side (egress) queue. `0` (the default)
    /// is resolved to `mtu` at build time -- see [`PipeConfig::resolve`].
    #[inline]
    pub fn in_limit(mut self, in_limit: usize) -> Self {
        self.in_limit = in_limit;
        self
    }

    /// Byte capacity of the writer-side (ingress) queue. `0` (the default)
    /// is resolved to `mtu` at build time -- see [`PipeConfig::resolve`].
    #[inline]
    pub fn out_limit(mut self, out_limit: usize) -> Self {
        self.out_limit = out_limit;
        self
    }

    /// Fixed propagation delay added to every packet. Default: zero.
    #[inline]
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Per-byte transmission cost added to a packet's deliver-time based
    /// on its length, modelling finite link bandwidth. Default: zero.
    #[inline]
    pub fn byte_delay(mut self, byte_delay: Duration) -> Self {
        self.byte_delay = byte_delay;
        self
    }

    /// Validate this configuration and substitute the zero-means-MTU
    /// defaults for `in_limit`/`out_limit`, producing a [`ResolvedConfig`]
    /// that the rest of the crate can use without further special-casing.
    ///
    /// A literal zero capacity would deadlock the very first packet, so
    /// unset (`0`) limits are interpreted as "exactly `mtu` bytes", never
    /// as zero -- this is spelled out explicitly because the behaviour is
    /// not obvious from the field name alone.
    pub fn resolve(self) -> Result<ResolvedConfig> {
        if self.mtu == 0 {
            return Err(PipeError::invalid("mtu must be greater than zero"));
        }
        let in_limit = if self.in_limit == 0 {
            self.mtu
        } else {
            self.in_limit
        };
        let out_limit = if self.out_limit == 0 {
            self.mtu
        } else {
            self.out_limit
        };
        if self.mtu > in_limit.min(out_limit) {
            return Err(PipeError::invalid(format!(
                "mtu ({}) exceeds the smaller of in_limit ({}) and out_limit ({})",
                self.mtu, in_limit, out_limit
            )));
        }
        Ok(ResolvedConfig {
            mtu: self.mtu,
            in_limit,
            out_limit,
            latency: self.latency,
            byte_delay: self.byte_delay,
        })
    }
}

/// A [`PipeConfig`] after validation and zero-limit substitution.
///
/// This is what the queues and link tasks are actually built from; the
/// builder-facing [`PipeConfig`] never leaks its unresolved zero defaults
/// past [`PipeConfig::resolve`].
#[derive(Clone, Copy, Debug)]
pub struct ResolvedConfig {
    pub(crate) mtu: usize,
    pub(crate) in_limit: usize,
    pub(crate) out_limit: usize,
    pub(crate) latency: Duration,
    pub(crate) byte_delay: Duration,
}

impl ResolvedConfig {
    /// The effective MTU used to fragment writes.
    pub fn mtu(&self) -> usize {
        self.mtu
    }

    /// The effective reader-side (egress) queue capacity.
    pub fn in_limit(&self) -> usize {
        self.in_limit
    }

    /// The effective writer-side (ingress) queue capacity.
    pub fn out_limit(&self) -> usize {
        self.out_limit
    }

    /// The configured propagation latency.
    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// The configured per-byte transmission delay.
    pub fn byte_delay(&self) -> Duration {
        self.byte_delay
    }
}
