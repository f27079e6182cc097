//! Pure session bookkeeping: lifecycle states, sequence-number arithmetic
//! modulo 2^15 and the k/w flow-control windows.
//!
//! Nothing in this module does I/O or owns a timer; the session task drives
//! it and the tests exercise it directly.

use std::collections::VecDeque;

use bytes::Bytes;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::types::SEQUENCE_MODULO;

/// Session lifecycle.
///
/// `Stopped` is terminal; reconnecting requires a new session object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport yet
    Closed,
    /// Transport open, STARTDT handshake not complete
    Connecting,
    /// Data transfer active
    Running,
    /// Terminal: transport closed or closing
    Stopped,
}

/// Which side of the connection this session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// Controlling station: connects and sends STARTDT act
    Client,
    /// Controlled station: accepts and answers STARTDT act
    Server,
}

/// Next sequence number modulo 2^15.
#[inline]
pub fn seq_next(value: u16) -> u16 {
    (value + 1) % SEQUENCE_MODULO
}

/// Distance from `from` to `to` on the 15-bit circle.
#[inline]
pub fn seq_distance(from: u16, to: u16) -> u16 {
    (to.wrapping_sub(from)) % SEQUENCE_MODULO
}

/// Whether `x` lies within `[start, end]` on the circle (inclusive).
#[inline]
pub fn seq_in_range(start: u16, end: u16, x: u16) -> bool {
    seq_distance(start, x) <= seq_distance(start, end)
}

/// One unacknowledged outbound I-frame.
#[derive(Debug, Clone)]
pub struct UnackedFrame {
    /// Send sequence number the frame carried
    pub ns: u16,
    /// T1 deadline for its acknowledgement
    pub deadline: Instant,
    /// Encoded frame bytes
    pub bytes: Bytes,
}

/// Outbound window: at most `k` unacknowledged I-frames.
///
/// Invariant: `v_s == v_a + unacked.len() (mod 2^15)`.
#[derive(Debug, Default)]
pub struct SendWindow {
    v_s: u16,
    v_a: u16,
    unacked: VecDeque<UnackedFrame>,
}

impl SendWindow {
    /// Fresh window with both counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next send sequence number V(S).
    #[inline]
    pub fn v_s(&self) -> u16 {
        self.v_s
    }

    /// Oldest unacknowledged sequence number V(A).
    #[inline]
    pub fn v_a(&self) -> u16 {
        self.v_a
    }

    /// Number of unacknowledged frames in flight.
    #[inline]
    pub fn len(&self) -> u16 {
        self.unacked.len() as u16
    }

    /// Whether no frames await acknowledgement.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.unacked.is_empty()
    }

    /// Whether another I-frame may be admitted under window size `k`.
    #[inline]
    pub fn has_capacity(&self, k: u16) -> bool {
        self.len() < k
    }

    /// Admit a frame: assign it V(S), record its T1 deadline, advance V(S).
    ///
    /// The caller gates on [`SendWindow::has_capacity`]; admitting past `k`
    /// is a window overflow.
    pub fn admit(&mut self, k: u16, bytes: Bytes, deadline: Instant) -> Result<u16> {
        if !self.has_capacity(k) {
            return Err(Error::WindowOverflow(k));
        }
        let ns = self.v_s;
        self.unacked.push_back(UnackedFrame { ns, deadline, bytes });
        self.v_s = seq_next(self.v_s);
        Ok(ns)
    }

    /// Apply a cumulative acknowledgement N(R).
    ///
    /// Valid iff `nr` lies within `[v_a, v_s]`; discards exactly the entries
    /// with `ns` modularly below `nr` and returns how many were released.
    pub fn acknowledge(&mut self, nr: u16) -> Result<usize> {
        if !seq_in_range(self.v_a, self.v_s, nr) {
            return Err(Error::NrOutOfRange { nr, v_a: self.v_a, v_s: self.v_s });
        }
        // unacked entries carry consecutive ns from v_a, so the modular
        // distance is exactly the number of frames nr releases
        let released = seq_distance(self.v_a, nr) as usize;
        for _ in 0..released {
            self.unacked.pop_front();
        }
        self.v_a = nr;
        Ok(released)
    }

    /// T1 deadline of the oldest unacknowledged frame, if any.
    pub fn oldest_deadline(&self) -> Option<Instant> {
        self.unacked.front().map(|frame| frame.deadline)
    }
}

/// Inbound window: V(R) plus the count of received-but-unacknowledged
/// I-frames, bounded by `w`.
#[derive(Debug, Default)]
pub struct ReceiveWindow {
    v_r: u16,
    unacked_rx: u16,
}

impl ReceiveWindow {
    /// Fresh window at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next expected receive sequence number V(R).
    #[inline]
    pub fn v_r(&self) -> u16 {
        self.v_r
    }

    /// Received I-frames not yet acknowledged.
    #[inline]
    pub fn unacked_rx(&self) -> u16 {
        self.unacked_rx
    }

    /// Accept an incoming I-frame carrying N(S).
    ///
    /// TCP preserves order, so anything other than V(R) is a protocol
    /// violation.
    pub fn accept(&mut self, ns: u16) -> Result<()> {
        if ns != self.v_r {
            return Err(Error::protocol(format!(
                "unexpected send sequence {ns}, expected {}",
                self.v_r
            )));
        }
        self.v_r = seq_next(self.v_r);
        self.unacked_rx += 1;
        Ok(())
    }

    /// Whether the acknowledgement threshold `w` has been reached.
    #[inline]
    pub fn at_threshold(&self, w: u16) -> bool {
        self.unacked_rx >= w
    }

    /// Record that V(R) was acknowledged (S-frame sent or piggybacked).
    #[inline]
    pub fn mark_acknowledged(&mut self) {
        self.unacked_rx = 0;
    }
}
