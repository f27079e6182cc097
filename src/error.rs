//! Error types for the IEC 60870-5-104 stack.

use std::borrow::Cow;

use bytes::Bytes;
use thiserror::Error;

/// Result type alias for IEC 104 operations.
pub type Result<T> = std::result::Result<T, Error>;

/// IEC 60870-5-104 protocol error taxonomy.
///
/// Most kinds are session-fatal: the session transitions to `Stopped`, the
/// transport is closed and the kind is surfaced to the caller once.
/// [`Error::UnhandledType`] is the exception; it is delivered inline and the
/// session continues.
///
/// Uses `Cow<'static, str>` to avoid allocations for static error messages.
#[derive(Debug, Error)]
pub enum Error {
    /// A byte other than the start octet 0x68 arrived where a frame must begin
    #[error("framing violation: expected start octet 0x68, got 0x{0:02X}")]
    FramingViolation(u8),

    /// APDU length field outside [4, 253]
    #[error("malformed APDU length: {0}")]
    MalformedLength(u8),

    /// Frame or handshake violates the protocol
    #[error("protocol violation: {0}")]
    ProtocolViolation(Cow<'static, str>),

    /// No handler registered for the type identifier.
    ///
    /// Carries the raw ASDU bytes (header included) so the caller can log or
    /// forward the payload. Recoverable; the session continues.
    #[error("unhandled ASDU type {type_id}")]
    UnhandledType {
        /// Raw type identifier from the ASDU header
        type_id: u8,
        /// Complete raw ASDU bytes
        body: Bytes,
    },

    /// ASDU body ended before the declared objects were decoded
    #[error("truncated ASDU: {0}")]
    Truncated(Cow<'static, str>),

    /// ASDU body longer than the declared objects
    #[error("trailing bytes after {consumed} declared ASDU bytes ({remaining} left)")]
    TrailingBytes {
        /// Bytes consumed by the declared objects
        consumed: usize,
        /// Residue left in the body
        remaining: usize,
    },

    /// ASDU declared zero information objects
    #[error("ASDU carries no information objects")]
    EmptyAsdu,

    /// Received receive-sequence number outside the [v_a, v_s] window
    #[error("receive sequence {nr} outside window [{v_a}, {v_s}]")]
    NrOutOfRange {
        /// The offending acknowledgement
        nr: u16,
        /// Oldest unacknowledged send sequence
        v_a: u16,
        /// Next send sequence
        v_s: u16,
    },

    /// Send window already holds k unacknowledged frames
    #[error("send window overflow (k={0})")]
    WindowOverflow(u16),

    /// Connection establishment exceeded T0
    #[error("t0 timeout: connection not established")]
    T0Timeout,

    /// No acknowledgement within T1
    #[error("t1 timeout: peer did not acknowledge")]
    T1Timeout,

    /// Idle test probe failed within the T3 regime
    #[error("t3 timeout: connection test failed")]
    T3Timeout,

    /// Security policy rejected the connection or a frame
    #[error("policy violation: {0}")]
    PolicyViolation(Cow<'static, str>),

    /// Receive buffer filled without a complete frame
    #[error("receive buffer exceeded {limit} bytes without a complete frame")]
    BufferExceeded {
        /// Configured buffer limit
        limit: usize,
    },

    /// Transport closed by the peer
    #[error("transport closed")]
    TransportClosed,

    /// Session aborted by the caller
    #[error("session aborted")]
    Aborted,

    /// Invalid session parameters
    #[error("parameter error: {0}")]
    Parameter(Cow<'static, str>),

    /// Operation on a session whose task has terminated
    #[error("session closed")]
    SessionClosed,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a protocol violation with a static message (zero allocation).
    #[inline]
    pub const fn protocol_static(msg: &'static str) -> Self {
        Self::ProtocolViolation(Cow::Borrowed(msg))
    }

    /// Create a protocol violation with a dynamic message.
    #[inline]
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(Cow::Owned(msg.into()))
    }

    /// Create a truncation error with a static message (zero allocation).
    #[inline]
    pub const fn truncated_static(msg: &'static str) -> Self {
        Self::Truncated(Cow::Borrowed(msg))
    }

    /// Create a parameter error with a static message (zero allocation).
    #[inline]
    pub const fn parameter_static(msg: &'static str) -> Self {
        Self::Parameter(Cow::Borrowed(msg))
    }

    /// Create a policy violation with a static message (zero allocation).
    #[inline]
    pub const fn policy_static(msg: &'static str) -> Self {
        Self::PolicyViolation(Cow::Borrowed(msg))
    }

    /// Whether this error terminates the session.
    ///
    /// Everything except [`Error::UnhandledType`] drives the session to
    /// `Stopped`.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::UnhandledType { .. })
    }

    /// Duplicate this error for delivery to a second consumer.
    ///
    /// A terminal error reaches both the pending completion that caused the
    /// shutdown and the event stream. The I/O variant is flattened to its
    /// kind and message; every other variant copies losslessly.
    pub(crate) fn duplicate(&self) -> Self {
        match self {
            Self::FramingViolation(byte) => Self::FramingViolation(*byte),
            Self::MalformedLength(length) => Self::MalformedLength(*length),
            Self::ProtocolViolation(msg) => Self::ProtocolViolation(msg.clone()),
            Self::UnhandledType { type_id, body } => {
                Self::UnhandledType { type_id: *type_id, body: body.clone() }
            }
            Self::Truncated(msg) => Self::Truncated(msg.clone()),
            Self::TrailingBytes { consumed, remaining } => {
                Self::TrailingBytes { consumed: *consumed, remaining: *remaining }
            }
            Self::EmptyAsdu => Self::EmptyAsdu,
            Self::NrOutOfRange { nr, v_a, v_s } => {
                Self::NrOutOfRange { nr: *nr, v_a: *v_a, v_s: *v_s }
            }
            Self::WindowOverflow(k) => Self::WindowOverflow(*k),
            Self::T0Timeout => Self::T0Timeout,
            Self::T1Timeout => Self::T1Timeout,
            Self::T3Timeout => Self::T3Timeout,
            Self::PolicyViolation(msg) => Self::PolicyViolation(msg.clone()),
            Self::BufferExceeded { limit } => Self::BufferExceeded { limit: *limit },
            Self::TransportClosed => Self::TransportClosed,
            Self::Aborted => Self::Aborted,
            Self::Parameter(msg) => Self::Parameter(msg.clone()),
            Self::SessionClosed => Self::SessionClosed,
            Self::Io(err) => Self::Io(std::io::Error::new(err.kind(), err.to_string())),
        }
    }

    /// Whether this error was caused by a protocol timer expiring.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::T0Timeout | Self::T1Timeout | Self::T3Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::FramingViolation(0xFF).to_string(),
            "framing violation: expected start octet 0x68, got 0xFF"
        );
        assert_eq!(Error::MalformedLength(3).to_string(), "malformed APDU length: 3");
        assert_eq!(
            Error::NrOutOfRange { nr: 5, v_a: 10, v_s: 12 }.to_string(),
            "receive sequence 5 outside window [10, 12]"
        );
        assert_eq!(Error::T1Timeout.to_string(), "t1 timeout: peer did not acknowledge");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::FramingViolation(0).is_fatal());
        assert!(Error::MalformedLength(0).is_fatal());
        assert!(Error::EmptyAsdu.is_fatal());
        assert!(Error::T1Timeout.is_fatal());
        assert!(Error::Aborted.is_fatal());
        assert!(!Error::UnhandledType { type_id: 77, body: Bytes::new() }.is_fatal());
    }

    #[test]
    fn test_timeout_classification() {
        assert!(Error::T0Timeout.is_timeout());
        assert!(Error::T1Timeout.is_timeout());
        assert!(Error::T3Timeout.is_timeout());
        assert!(!Error::TransportClosed.is_timeout());
        assert!(!Error::protocol_static("x").is_timeout());
    }

    #[test]
    fn test_duplicate_preserves_kind() {
        assert!(matches!(Error::T1Timeout.duplicate(), Error::T1Timeout));
        assert!(matches!(
            Error::NrOutOfRange { nr: 3, v_a: 7, v_s: 9 }.duplicate(),
            Error::NrOutOfRange { nr: 3, v_a: 7, v_s: 9 }
        ));
        assert!(matches!(
            Error::protocol_static("bad frame").duplicate(),
            Error::ProtocolViolation(msg) if msg == "bad frame"
        ));

        use std::io::{Error as IoError, ErrorKind};
        let original: Error = IoError::new(ErrorKind::BrokenPipe, "pipe gone").into();
        match original.duplicate() {
            Error::Io(err) => {
                assert_eq!(err.kind(), ErrorKind::BrokenPipe);
                assert!(err.to_string().contains("pipe gone"));
            }
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn test_io_conversion() {
        use std::io::{Error as IoError, ErrorKind};
        let err: Error = IoError::new(ErrorKind::ConnectionReset, "reset").into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_unhandled_carries_body() {
        let body = Bytes::from_static(&[0x4D, 0x01, 0x03, 0x00, 0x01, 0x00]);
        let err = Error::UnhandledType { type_id: 0x4D, body: body.clone() };
        if let Error::UnhandledType { type_id, body: raw } = err {
            assert_eq!(type_id, 0x4D);
            assert_eq!(raw, body);
        } else {
            panic!("expected UnhandledType");
        }
    }
}
