//! Type identification for IEC 60870-5-104 ASDUs.

/// ASDU type identifier.
///
/// Covers the monitoring, control and system types of the 104 profile this
/// stack knows about. Decoding an ASDU only requires the type to be present
/// in the [`TypeRegistry`](crate::registry::TypeRegistry); identifiers
/// outside this enum surface as recoverable unhandled-type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeId {
    /// Single-point information (M_SP_NA_1)
    SinglePoint = 1,

    /// Double-point information (M_DP_NA_1)
    DoublePoint = 3,

    /// Step position information (M_ST_NA_1)
    StepPosition = 5,

    /// Bitstring of 32 bit (M_BO_NA_1)
    Bitstring32 = 7,

    /// Measured value, normalized (M_ME_NA_1)
    MeasuredNormalized = 9,

    /// Measured value, scaled (M_ME_NB_1)
    MeasuredScaled = 11,

    /// Measured value, short floating point (M_ME_NC_1)
    MeasuredFloat = 13,

    /// Integrated totals (M_IT_NA_1)
    IntegratedTotals = 15,

    /// Single-point information with time tag CP56Time2a (M_SP_TB_1)
    SinglePointTime56 = 30,

    /// Double-point information with time tag CP56Time2a (M_DP_TB_1)
    DoublePointTime56 = 31,

    /// Measured value, short floating point with time tag CP56Time2a (M_ME_TF_1)
    MeasuredFloatTime56 = 36,

    /// Single command (C_SC_NA_1)
    SingleCommand = 45,

    /// Double command (C_DC_NA_1)
    DoubleCommand = 46,

    /// Regulating step command (C_RC_NA_1)
    RegulatingStep = 47,

    /// Set-point command, short floating point (C_SE_NC_1)
    SetpointFloat = 50,

    /// End of initialization (M_EI_NA_1)
    EndOfInit = 70,

    /// Interrogation command (C_IC_NA_1)
    InterrogationCommand = 100,

    /// Counter interrogation command (C_CI_NA_1)
    CounterInterrogation = 101,

    /// Read command (C_RD_NA_1)
    ReadCommand = 102,

    /// Clock synchronization command (C_CS_NA_1)
    ClockSync = 103,

    /// Test command (C_TS_NA_1)
    TestCommand = 104,

    /// Reset process command (C_RP_NA_1)
    ResetProcess = 105,
}

impl TypeId {
    /// Look up a type identifier by its raw value.
    ///
    /// Returns `None` for identifiers this profile does not name; the ASDU
    /// decoder turns those into recoverable unhandled-type errors.
    #[inline]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::SinglePoint),
            3 => Some(Self::DoublePoint),
            5 => Some(Self::StepPosition),
            7 => Some(Self::Bitstring32),
            9 => Some(Self::MeasuredNormalized),
            11 => Some(Self::MeasuredScaled),
            13 => Some(Self::MeasuredFloat),
            15 => Some(Self::IntegratedTotals),
            30 => Some(Self::SinglePointTime56),
            31 => Some(Self::DoublePointTime56),
            36 => Some(Self::MeasuredFloatTime56),
            45 => Some(Self::SingleCommand),
            46 => Some(Self::DoubleCommand),
            47 => Some(Self::RegulatingStep),
            50 => Some(Self::SetpointFloat),
            70 => Some(Self::EndOfInit),
            100 => Some(Self::InterrogationCommand),
            101 => Some(Self::CounterInterrogation),
            102 => Some(Self::ReadCommand),
            103 => Some(Self::ClockSync),
            104 => Some(Self::TestCommand),
            105 => Some(Self::ResetProcess),
            _ => None,
        }
    }

    /// Raw identifier value.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether this type flows in the monitoring direction (station → master).
    #[inline]
    pub const fn is_monitoring(self) -> bool {
        matches!(self.as_u8(), 1..=44 | 70)
    }

    /// Whether this type flows in the control direction (master → station).
    #[inline]
    pub const fn is_control(self) -> bool {
        matches!(self.as_u8(), 45..=69 | 100..=109)
    }

    /// IEC standard designation, e.g. `M_SP_NA_1`.
    #[inline]
    pub const fn standard_name(self) -> &'static str {
        match self {
            Self::SinglePoint => "M_SP_NA_1",
            Self::DoublePoint => "M_DP_NA_1",
            Self::StepPosition => "M_ST_NA_1",
            Self::Bitstring32 => "M_BO_NA_1",
            Self::MeasuredNormalized => "M_ME_NA_1",
            Self::MeasuredScaled => "M_ME_NB_1",
            Self::MeasuredFloat => "M_ME_NC_1",
            Self::IntegratedTotals => "M_IT_NA_1",
            Self::SinglePointTime56 => "M_SP_TB_1",
            Self::DoublePointTime56 => "M_DP_TB_1",
            Self::MeasuredFloatTime56 => "M_ME_TF_1",
            Self::SingleCommand => "C_SC_NA_1",
            Self::DoubleCommand => "C_DC_NA_1",
            Self::RegulatingStep => "C_RC_NA_1",
            Self::SetpointFloat => "C_SE_NC_1",
            Self::EndOfInit => "M_EI_NA_1",
            Self::InterrogationCommand => "C_IC_NA_1",
            Self::CounterInterrogation => "C_CI_NA_1",
            Self::ReadCommand => "C_RD_NA_1",
            Self::ClockSync => "C_CS_NA_1",
            Self::TestCommand => "C_TS_NA_1",
            Self::ResetProcess => "C_RP_NA_1",
        }
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.standard_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8_roundtrip() {
        let known = [
            1u8, 3, 5, 7, 9, 11, 13, 15, 30, 31, 36, 45, 46, 47, 50, 70, 100, 101, 102, 103, 104,
            105,
        ];
        for value in known {
            let type_id = TypeId::from_u8(value).unwrap();
            assert_eq!(type_id.as_u8(), value);
        }
    }

    #[test]
    fn test_unknown_values() {
        for value in [0u8, 2, 44, 77, 110, 120, 127, 255] {
            assert!(TypeId::from_u8(value).is_none(), "value {value} should be unknown");
        }
    }

    #[test]
    fn test_direction() {
        assert!(TypeId::SinglePoint.is_monitoring());
        assert!(TypeId::EndOfInit.is_monitoring());
        assert!(!TypeId::SinglePoint.is_control());

        assert!(TypeId::SingleCommand.is_control());
        assert!(TypeId::InterrogationCommand.is_control());
        assert!(!TypeId::InterrogationCommand.is_monitoring());
    }

    #[test]
    fn test_standard_names() {
        assert_eq!(TypeId::SinglePoint.standard_name(), "M_SP_NA_1");
        assert_eq!(TypeId::MeasuredFloat.standard_name(), "M_ME_NC_1");
        assert_eq!(TypeId::SingleCommand.to_string(), "C_SC_NA_1");
        assert_eq!(TypeId::ClockSync.to_string(), "C_CS_NA_1");
    }
}
