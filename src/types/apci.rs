//! APCI (Application Protocol Control Information) for IEC 60870-5-104.
//!
//! The APCI is the 6-byte frame header: start octet, length octet and a
//! 4-byte control field that selects the frame format (I, S or U).

use crate::error::{Error, Result};

/// Start octet for IEC 104 frames.
pub const START_BYTE: u8 = 0x68;

/// Minimum APDU length (control field only, no ASDU).
pub const MIN_APDU_LENGTH: usize = 4;

/// Maximum APDU length.
pub const MAX_APDU_LENGTH: usize = 253;

/// Maximum ASDU body length inside an I-frame.
pub const MAX_ASDU_LENGTH: usize = MAX_APDU_LENGTH - MIN_APDU_LENGTH;

/// Sequence numbers live in a 15-bit space.
pub const SEQUENCE_MODULO: u16 = 1 << 15;

/// U-frame control functions.
///
/// Exactly one function is set per U-frame; the six patterns are mutually
/// exclusive bit assignments in the first control octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UFunction {
    /// STARTDT act (start data transfer activation)
    StartDtAct,
    /// STARTDT con (start data transfer confirmation)
    StartDtCon,
    /// STOPDT act (stop data transfer activation)
    StopDtAct,
    /// STOPDT con (stop data transfer confirmation)
    StopDtCon,
    /// TESTFR act (test frame activation)
    TestFrAct,
    /// TESTFR con (test frame confirmation)
    TestFrCon,
}

impl UFunction {
    /// Control-field byte for this function.
    pub const fn control_byte(self) -> u8 {
        match self {
            Self::StartDtAct => 0x07,
            Self::StartDtCon => 0x0B,
            Self::StopDtAct => 0x13,
            Self::StopDtCon => 0x23,
            Self::TestFrAct => 0x43,
            Self::TestFrCon => 0x83,
        }
    }

    /// Parse a U-function from the first control octet.
    ///
    /// Rejects combinations with more or less than one function bit set.
    pub fn from_control_byte(byte: u8) -> Result<Self> {
        match byte {
            0x07 => Ok(Self::StartDtAct),
            0x0B => Ok(Self::StartDtCon),
            0x13 => Ok(Self::StopDtAct),
            0x23 => Ok(Self::StopDtCon),
            0x43 => Ok(Self::TestFrAct),
            0x83 => Ok(Self::TestFrCon),
            _ => Err(Error::protocol(format!("invalid U-frame control byte 0x{byte:02X}"))),
        }
    }

    /// The confirmation matching an activation, if this is one.
    pub const fn confirmation(self) -> Option<Self> {
        match self {
            Self::StartDtAct => Some(Self::StartDtCon),
            Self::StopDtAct => Some(Self::StopDtCon),
            Self::TestFrAct => Some(Self::TestFrCon),
            _ => None,
        }
    }
}

/// Parsed APCI control field.
///
/// ```text
/// +--------+--------+--------+--------+--------+--------+
/// | 0x68   | Length | CF1    | CF2    | CF3    | CF4    |
/// +--------+--------+--------+--------+--------+--------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apci {
    /// I-frame: information transfer with both sequence numbers.
    IFrame {
        /// Send sequence number N(S), 0..32768
        send_seq: u16,
        /// Receive sequence number N(R), 0..32768
        recv_seq: u16,
    },
    /// S-frame: supervisory acknowledgement.
    SFrame {
        /// Receive sequence number N(R), 0..32768
        recv_seq: u16,
    },
    /// U-frame: unnumbered control function.
    UFrame {
        /// Control function
        function: UFunction,
    },
}

impl Apci {
    /// Create an I-frame control field.
    pub fn i_frame(send_seq: u16, recv_seq: u16) -> Self {
        debug_assert!(send_seq < SEQUENCE_MODULO && recv_seq < SEQUENCE_MODULO);
        Self::IFrame { send_seq, recv_seq }
    }

    /// Create an S-frame control field.
    pub fn s_frame(recv_seq: u16) -> Self {
        debug_assert!(recv_seq < SEQUENCE_MODULO);
        Self::SFrame { recv_seq }
    }

    /// Create a U-frame control field.
    pub fn u_frame(function: UFunction) -> Self {
        Self::UFrame { function }
    }

    /// Parse a 4-byte control field.
    ///
    /// `asdu_len` is the number of ASDU bytes that follow in the same APDU;
    /// S- and U-frames must not carry any. Reserved octets of S- and U-frames
    /// are strict: non-zero values are rejected.
    pub fn parse(control: [u8; 4], asdu_len: usize) -> Result<Self> {
        let [c1, c2, c3, c4] = control;

        if c1 & 0x01 == 0 {
            // I-frame: CF3 low bit must be clear as well
            if c3 & 0x01 != 0 {
                return Err(Error::protocol_static("I-frame receive field low bit set"));
            }
            let send_seq = (c1 as u16 | (c2 as u16) << 8) >> 1;
            let recv_seq = (c3 as u16 | (c4 as u16) << 8) >> 1;
            Ok(Self::IFrame { send_seq, recv_seq })
        } else if c1 & 0x03 == 0x01 {
            if asdu_len != 0 {
                return Err(Error::protocol_static("S-frame with non-empty body"));
            }
            if c2 != 0 || c3 & 0x01 != 0 {
                return Err(Error::protocol_static("S-frame reserved bits set"));
            }
            let recv_seq = (c3 as u16 | (c4 as u16) << 8) >> 1;
            Ok(Self::SFrame { recv_seq })
        } else {
            if asdu_len != 0 {
                return Err(Error::protocol_static("U-frame with non-empty body"));
            }
            if c2 != 0 || c3 != 0 || c4 != 0 {
                return Err(Error::protocol_static("U-frame reserved bytes must be zero"));
            }
            let function = UFunction::from_control_byte(c1)?;
            Ok(Self::UFrame { function })
        }
    }

    /// Encode to the 4-byte control field.
    pub fn encode(&self) -> [u8; 4] {
        match *self {
            Self::IFrame { send_seq, recv_seq } => {
                let s = send_seq << 1;
                let r = recv_seq << 1;
                [s as u8, (s >> 8) as u8, r as u8, (r >> 8) as u8]
            }
            Self::SFrame { recv_seq } => {
                let r = recv_seq << 1;
                [0x01, 0x00, r as u8, (r >> 8) as u8]
            }
            Self::UFrame { function } => [function.control_byte(), 0x00, 0x00, 0x00],
        }
    }

    /// Check if this is an I-frame.
    pub fn is_i_frame(&self) -> bool {
        matches!(self, Self::IFrame { .. })
    }

    /// Check if this is an S-frame.
    pub fn is_s_frame(&self) -> bool {
        matches!(self, Self::SFrame { .. })
    }

    /// Check if this is a U-frame.
    pub fn is_u_frame(&self) -> bool {
        matches!(self, Self::UFrame { .. })
    }

    /// Send sequence number (I-frames only).
    pub fn send_seq(&self) -> Option<u16> {
        match self {
            Self::IFrame { send_seq, .. } => Some(*send_seq),
            _ => None,
        }
    }

    /// Receive sequence number (I- and S-frames).
    pub fn recv_seq(&self) -> Option<u16> {
        match self {
            Self::IFrame { recv_seq, .. } | Self::SFrame { recv_seq } => Some(*recv_seq),
            _ => None,
        }
    }
}

impl std::fmt::Display for Apci {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IFrame { send_seq, recv_seq } => write!(f, "I(S={send_seq}, R={recv_seq})"),
            Self::SFrame { recv_seq } => write!(f, "S(R={recv_seq})"),
            Self::UFrame { function } => {
                let name = match function {
                    UFunction::StartDtAct => "STARTDT act",
                    UFunction::StartDtCon => "STARTDT con",
                    UFunction::StopDtAct => "STOPDT act",
                    UFunction::StopDtCon => "STOPDT con",
                    UFunction::TestFrAct => "TESTFR act",
                    UFunction::TestFrCon => "TESTFR con",
                };
                write!(f, "U({name})")
            }
        }
    }
}
