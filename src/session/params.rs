//! Session parameters: the k/w windows, the T0–T3 timer regime and the
//! acknowledgement policy.

use std::time::Duration;

use crate::codec::DEFAULT_MAX_BUFFER;
use crate::error::{Error, Result};
use crate::types::SEQUENCE_MODULO;

/// Default k: maximum unacknowledged outbound I-frames.
pub const DEFAULT_K: u16 = 12;

/// Default w: inbound acknowledgement threshold.
pub const DEFAULT_W: u16 = 8;

/// Default T0: connection establishment timeout.
pub const DEFAULT_T0: Duration = Duration::from_secs(30);

/// Default T1: acknowledgement timeout.
pub const DEFAULT_T1: Duration = Duration::from_secs(15);

/// Default T2: acknowledgement delay.
pub const DEFAULT_T2: Duration = Duration::from_secs(10);

/// Default T3: idle test-frame interval.
pub const DEFAULT_T3: Duration = Duration::from_secs(20);

/// When inbound I-frames are acknowledged.
///
/// The protocol allows delaying the S-frame up to T2 or `w` frames; this
/// stack acknowledges immediately by default and only honours T2 when asked
/// explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckPolicy {
    /// Acknowledge every received I-frame straight away
    #[default]
    Immediate,
    /// Delay the S-frame until `w` frames are pending or T2 expires
    Delayed,
}

/// Configurable protocol parameters of one session.
#[derive(Debug, Clone)]
pub struct SessionParameters {
    /// Maximum unacknowledged outbound I-frames, in [1, 32767]
    pub k: u16,
    /// Inbound ack threshold, in [1, k-1]
    pub w: u16,
    /// Connection establishment timeout
    pub t0: Duration,
    /// Send/test acknowledgement timeout
    pub t1: Duration,
    /// Acknowledgement delay (≤ t1), used by [`AckPolicy::Delayed`]
    pub t2: Duration,
    /// Idle interval before a TESTFR probe
    pub t3: Duration,
    /// Acknowledgement scheduling
    pub ack_policy: AckPolicy,
    /// Receive buffer bound in bytes
    pub max_buffer: usize,
}

impl Default for SessionParameters {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            w: DEFAULT_W,
            t0: DEFAULT_T0,
            t1: DEFAULT_T1,
            t2: DEFAULT_T2,
            t3: DEFAULT_T3,
            ack_policy: AckPolicy::default(),
            max_buffer: DEFAULT_MAX_BUFFER,
        }
    }
}

impl SessionParameters {
    /// Parameters with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the k window.
    pub fn k(mut self, k: u16) -> Self {
        self.k = k;
        self
    }

    /// Set the w threshold.
    pub fn w(mut self, w: u16) -> Self {
        self.w = w;
        self
    }

    /// Set T0.
    pub fn t0(mut self, t0: Duration) -> Self {
        self.t0 = t0;
        self
    }

    /// Set T1.
    pub fn t1(mut self, t1: Duration) -> Self {
        self.t1 = t1;
        self
    }

    /// Set T2.
    pub fn t2(mut self, t2: Duration) -> Self {
        self.t2 = t2;
        self
    }

    /// Set T3.
    pub fn t3(mut self, t3: Duration) -> Self {
        self.t3 = t3;
        self
    }

    /// Set the acknowledgement policy.
    pub fn ack_policy(mut self, policy: AckPolicy) -> Self {
        self.ack_policy = policy;
        self
    }

    /// Set the receive buffer bound.
    pub fn max_buffer(mut self, max_buffer: usize) -> Self {
        self.max_buffer = max_buffer;
        self
    }

    /// Validate all ranges and relations.
    ///
    /// `k` in [1, 32767], `w` in [1, k-1], `t2 ≤ t1`, timers non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 || self.k >= SEQUENCE_MODULO {
            return Err(Error::parameter_static("k must be in [1, 32767]"));
        }
        if self.w == 0 || self.w >= self.k {
            return Err(Error::parameter_static("w must be in [1, k-1]"));
        }
        if self.t0.is_zero() || self.t1.is_zero() || self.t3.is_zero() {
            return Err(Error::parameter_static("timers must be positive"));
        }
        if self.t2 > self.t1 {
            return Err(Error::parameter_static("t2 must not exceed t1"));
        }
        if self.max_buffer < 2 + crate::types::MAX_APDU_LENGTH {
            return Err(Error::parameter_static("receive buffer below one full frame"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let params = SessionParameters::default();
        assert_eq!(params.k, 12);
        assert_eq!(params.w, 8);
        assert_eq!(params.t0, Duration::from_secs(30));
        assert_eq!(params.t1, Duration::from_secs(15));
        assert_eq!(params.t2, Duration::from_secs(10));
        assert_eq!(params.t3, Duration::from_secs(20));
        assert_eq!(params.ack_policy, AckPolicy::Immediate);
        params.validate().unwrap();
    }

    #[test]
    fn test_builder() {
        let params = SessionParameters::new()
            .k(2)
            .w(1)
            .t1(Duration::from_secs(1))
            .t2(Duration::from_millis(500))
            .ack_policy(AckPolicy::Delayed);
        assert_eq!(params.k, 2);
        assert_eq!(params.w, 1);
        params.validate().unwrap();
    }

    #[test]
    fn test_k_range() {
        assert!(SessionParameters::new().k(0).validate().is_err());
        assert!(SessionParameters::new().k(32768).validate().is_err());
        assert!(SessionParameters::new().k(32767).w(8).validate().is_ok());
    }

    #[test]
    fn test_w_below_k() {
        assert!(SessionParameters::new().k(8).w(8).validate().is_err());
        assert!(SessionParameters::new().k(8).w(0).validate().is_err());
        assert!(SessionParameters::new().k(8).w(7).validate().is_ok());
    }

    #[test]
    fn test_t2_bounded_by_t1() {
        let params = SessionParameters::new()
            .t1(Duration::from_secs(5))
            .t2(Duration::from_secs(6));
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_buffer_bound() {
        assert!(SessionParameters::new().max_buffer(100).validate().is_err());
        assert!(SessionParameters::new().max_buffer(255).validate().is_ok());
    }
}
