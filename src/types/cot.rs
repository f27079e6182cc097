//! Cause of Transmission (CoT) for IEC 60870-5-104.
//!
//! The cause is a 6-bit code stating why an ASDU is being sent. The stack
//! names the causes it emits or matches on; other codes in [1, 63] are kept
//! verbatim so reserved or vendor causes survive a round trip.

use crate::error::{Error, Result};

/// Cause of Transmission.
///
/// Wraps the 6-bit cause code. Code 0 is not used by the protocol and is
/// rejected on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cot(u8);

impl Cot {
    /// Periodic, cyclic (1)
    pub const PERIODIC: Cot = Cot(1);
    /// Background scan (2)
    pub const BACKGROUND: Cot = Cot(2);
    /// Spontaneous (3)
    pub const SPONTANEOUS: Cot = Cot(3);
    /// Initialized (4)
    pub const INITIALIZED: Cot = Cot(4);
    /// Request or requested (5)
    pub const REQUEST: Cot = Cot(5);
    /// Activation (6)
    pub const ACTIVATION: Cot = Cot(6);
    /// Activation confirmation (7)
    pub const ACTIVATION_CON: Cot = Cot(7);
    /// Deactivation (8)
    pub const DEACTIVATION: Cot = Cot(8);
    /// Deactivation confirmation (9)
    pub const DEACTIVATION_CON: Cot = Cot(9);
    /// Activation termination (10)
    pub const ACTIVATION_TERM: Cot = Cot(10);
    /// Return information caused by a remote command (11)
    pub const RETURN_REMOTE: Cot = Cot(11);
    /// Return information caused by a local command (12)
    pub const RETURN_LOCAL: Cot = Cot(12);
    /// Interrogated by station interrogation (20)
    pub const INTERROGATED_BY_STATION: Cot = Cot(20);
    /// Unknown type identification (44)
    pub const UNKNOWN_TYPE_ID: Cot = Cot(44);
    /// Unknown cause of transmission (45)
    pub const UNKNOWN_COT: Cot = Cot(45);
    /// Unknown common address (46)
    pub const UNKNOWN_COMMON_ADDRESS: Cot = Cot(46);
    /// Unknown information object address (47)
    pub const UNKNOWN_IOA: Cot = Cot(47);

    /// Create a cause from a code in [1, 63].
    pub fn new(code: u8) -> Result<Self> {
        if code == 0 || code > 0x3F {
            return Err(Error::protocol(format!("cause of transmission {code} out of range")));
        }
        Ok(Self(code))
    }

    /// Parse the cause from the low 6 bits of the CoT octet.
    pub fn from_u8(byte: u8) -> Result<Self> {
        Self::new(byte & 0x3F)
    }

    /// Interrogated-by-group-N cause (N in 1..=16, codes 21..=36).
    pub fn interrogated_by_group(group: u8) -> Result<Self> {
        if !(1..=16).contains(&group) {
            return Err(Error::protocol_static("interrogation group out of range"));
        }
        Ok(Self(20 + group))
    }

    /// Raw 6-bit code.
    #[inline]
    pub const fn code(self) -> u8 {
        self.0
    }

    /// Whether this cause is a positive confirmation.
    #[inline]
    pub fn is_confirmation(self) -> bool {
        matches!(self, Self::ACTIVATION_CON | Self::DEACTIVATION_CON | Self::ACTIVATION_TERM)
    }

    /// Whether this cause signals a peer-side rejection.
    #[inline]
    pub fn is_negative(self) -> bool {
        matches!(
            self,
            Self::UNKNOWN_TYPE_ID | Self::UNKNOWN_COT | Self::UNKNOWN_COMMON_ADDRESS | Self::UNKNOWN_IOA
        )
    }

    /// Whether this cause is an interrogation response (codes 20..=36).
    #[inline]
    pub fn is_interrogation_response(self) -> bool {
        (20..=36).contains(&self.0)
    }
}

impl std::fmt::Display for Cot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match *self {
            Self::PERIODIC => "Periodic",
            Self::BACKGROUND => "Background",
            Self::SPONTANEOUS => "Spontaneous",
            Self::INITIALIZED => "Initialized",
            Self::REQUEST => "Request",
            Self::ACTIVATION => "Activation",
            Self::ACTIVATION_CON => "ActivationCon",
            Self::DEACTIVATION => "Deactivation",
            Self::DEACTIVATION_CON => "DeactivationCon",
            Self::ACTIVATION_TERM => "ActivationTerm",
            Self::RETURN_REMOTE => "ReturnRemote",
            Self::RETURN_LOCAL => "ReturnLocal",
            Self::INTERROGATED_BY_STATION => "InterrogatedByStation",
            Self::UNKNOWN_TYPE_ID => "UnknownTypeId",
            Self::UNKNOWN_COT => "UnknownCot",
            Self::UNKNOWN_COMMON_ADDRESS => "UnknownCommonAddress",
            Self::UNKNOWN_IOA => "UnknownIoa",
            Cot(code) => return write!(f, "Cot({code})"),
        };
        f.write_str(name)
    }
}
