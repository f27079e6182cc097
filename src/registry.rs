//! ASDU type registry: element codecs keyed by type identifier.
//!
//! Each registered type contributes a pair of pure functions plus its fixed
//! element size; the registry owns the shared object walker that implements
//! the sq=0 / sq=1 layouts and the exact-consumption discipline. The registry
//! is populated at startup and shared read-only (`Arc`) between sessions.

use std::collections::HashMap;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::types::{
    Asdu, AsduHeader, Cot, Cp56Time2a, DoublePointValue, InformationObject, Ioa, MeasuredQuality,
    ObjectValue, Quality, TypeId, Vsq, ASDU_HEADER_SIZE, MAX_ASDU_LENGTH,
};

/// Size of an encoded IOA.
const IOA_SIZE: usize = 3;

/// Element codec for one ASDU type.
///
/// `decode_element` receives exactly `element_size` bytes; `encode_element`
/// must append exactly `element_size` bytes or fail.
#[derive(Clone, Copy)]
pub struct TypeHandler {
    /// Fixed element size in bytes (value without the IOA)
    pub element_size: usize,
    /// Decode one element into a typed value
    pub decode_element: fn(&[u8]) -> Result<ObjectValue>,
    /// Encode one typed value
    pub encode_element: fn(&ObjectValue, &mut BytesMut) -> Result<()>,
}

impl std::fmt::Debug for TypeHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeHandler").field("element_size", &self.element_size).finish()
    }
}

/// Registry mapping type identifiers to element codecs.
#[derive(Debug)]
pub struct TypeRegistry {
    handlers: HashMap<u8, TypeHandler>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TypeRegistry {
    /// Empty registry without any handlers.
    pub fn empty() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Registry with the mandatory built-in handlers: types 1, 3, 9, 13, 30,
    /// 45, 46, 100 and 103.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(
            TypeId::SinglePoint,
            TypeHandler {
                element_size: 1,
                decode_element: decode_single_point,
                encode_element: encode_single_point,
            },
        );
        registry.register(
            TypeId::DoublePoint,
            TypeHandler {
                element_size: 1,
                decode_element: decode_double_point,
                encode_element: encode_double_point,
            },
        );
        registry.register(
            TypeId::MeasuredNormalized,
            TypeHandler {
                element_size: 3,
                decode_element: decode_normalized,
                encode_element: encode_normalized,
            },
        );
        registry.register(
            TypeId::MeasuredFloat,
            TypeHandler {
                element_size: 5,
                decode_element: decode_float,
                encode_element: encode_float,
            },
        );
        registry.register(
            TypeId::SinglePointTime56,
            TypeHandler {
                element_size: 1 + Cp56Time2a::SIZE,
                decode_element: decode_single_point_time,
                encode_element: encode_single_point_time,
            },
        );
        registry.register(
            TypeId::SingleCommand,
            TypeHandler {
                element_size: 1,
                decode_element: decode_single_command,
                encode_element: encode_single_command,
            },
        );
        registry.register(
            TypeId::DoubleCommand,
            TypeHandler {
                element_size: 1,
                decode_element: decode_double_command,
                encode_element: encode_double_command,
            },
        );
        registry.register(
            TypeId::InterrogationCommand,
            TypeHandler {
                element_size: 1,
                decode_element: decode_interrogation,
                encode_element: encode_interrogation,
            },
        );
        registry.register(
            TypeId::ClockSync,
            TypeHandler {
                element_size: Cp56Time2a::SIZE,
                decode_element: decode_clock_sync,
                encode_element: encode_clock_sync,
            },
        );
        registry
    }

    /// Register (or replace) the handler for a type identifier.
    pub fn register(&mut self, type_id: TypeId, handler: TypeHandler) {
        self.handlers.insert(type_id.as_u8(), handler);
    }

    /// Handler registered for the raw type identifier, if any.
    pub fn handler(&self, type_id: u8) -> Option<&TypeHandler> {
        self.handlers.get(&type_id)
    }

    /// Decode a complete ASDU body (header included).
    ///
    /// Unknown or unregistered type identifiers return
    /// [`Error::UnhandledType`] carrying the raw bytes; all other failures
    /// are session-fatal.
    pub fn decode_asdu(&self, body: &[u8]) -> Result<Asdu> {
        if body.len() < ASDU_HEADER_SIZE {
            return Err(Error::truncated_static("ASDU shorter than its header"));
        }
        let raw_type = body[0];
        let vsq = Vsq::from_u8(body[1]);
        if vsq.count == 0 {
            return Err(Error::EmptyAsdu);
        }
        let cot = Cot::from_u8(body[2])?;
        let negative = body[2] & 0x40 != 0;
        let test = body[2] & 0x80 != 0;
        let originator = body[3];
        let common_address = body[4] as u16 | (body[5] as u16) << 8;

        let (type_id, handler) = match TypeId::from_u8(raw_type).and_then(|t| {
            self.handler(raw_type).map(|h| (t, h))
        }) {
            Some(pair) => pair,
            None => {
                return Err(Error::UnhandledType {
                    type_id: raw_type,
                    body: Bytes::copy_from_slice(body),
                })
            }
        };

        let payload = &body[ASDU_HEADER_SIZE..];
        let count = vsq.count as usize;
        let expected = if vsq.sequence {
            IOA_SIZE + count * handler.element_size
        } else {
            count * (IOA_SIZE + handler.element_size)
        };
        if payload.len() < expected {
            return Err(Error::truncated_static("ASDU body shorter than declared objects"));
        }
        if payload.len() > expected {
            return Err(Error::TrailingBytes {
                consumed: expected,
                remaining: payload.len() - expected,
            });
        }

        let mut objects = Vec::with_capacity(count);
        let mut offset = 0;
        if vsq.sequence {
            let base = Ioa::from_bytes(&payload[..IOA_SIZE])?;
            offset += IOA_SIZE;
            for i in 0..count {
                let ioa = base.checked_offset(i as u32).ok_or(Error::protocol_static(
                    "sequential ASDU overruns the 24-bit address space",
                ))?;
                let element = &payload[offset..offset + handler.element_size];
                objects.push(InformationObject::new(ioa, (handler.decode_element)(element)?));
                offset += handler.element_size;
            }
        } else {
            for _ in 0..count {
                let ioa = Ioa::from_bytes(&payload[offset..offset + IOA_SIZE])?;
                offset += IOA_SIZE;
                let element = &payload[offset..offset + handler.element_size];
                objects.push(InformationObject::new(ioa, (handler.decode_element)(element)?));
                offset += handler.element_size;
            }
        }

        Ok(Asdu {
            header: AsduHeader {
                type_id,
                vsq,
                cot,
                test,
                negative,
                originator,
                common_address,
            },
            objects,
        })
    }

    /// Encode an ASDU (header plus objects) into a fresh buffer.
    ///
    /// The VSQ count is derived from the object list; sequential ASDUs must
    /// carry consecutive addresses.
    pub fn encode_asdu(&self, asdu: &Asdu) -> Result<BytesMut> {
        let count = asdu.objects.len();
        if count == 0 {
            return Err(Error::EmptyAsdu);
        }
        if count > 127 {
            return Err(Error::protocol_static("ASDU carries more than 127 objects"));
        }
        let raw_type = asdu.header.type_id.as_u8();
        let handler = self.handler(raw_type).ok_or(Error::UnhandledType {
            type_id: raw_type,
            body: Bytes::new(),
        })?;

        let sequence = asdu.header.vsq.sequence;
        let payload_len = if sequence {
            IOA_SIZE + count * handler.element_size
        } else {
            count * (IOA_SIZE + handler.element_size)
        };
        if ASDU_HEADER_SIZE + payload_len > MAX_ASDU_LENGTH {
            return Err(Error::protocol_static("ASDU exceeds maximum APDU length"));
        }

        let mut buf = BytesMut::with_capacity(ASDU_HEADER_SIZE + payload_len);
        let mut header = asdu.header;
        header.vsq = Vsq::new(count as u8, sequence);
        header.encode(&mut buf);

        if sequence {
            let base = asdu.objects[0].ioa;
            for (i, obj) in asdu.objects.iter().enumerate() {
                let expected = base.checked_offset(i as u32).ok_or(Error::protocol_static(
                    "sequential ASDU overruns the 24-bit address space",
                ))?;
                if obj.ioa != expected {
                    return Err(Error::protocol_static(
                        "sequential ASDU requires consecutive addresses",
                    ));
                }
            }
            buf.put_slice(&base.to_bytes());
            for obj in &asdu.objects {
                (handler.encode_element)(&obj.value, &mut buf)?;
            }
        } else {
            for obj in &asdu.objects {
                buf.put_slice(&obj.ioa.to_bytes());
                (handler.encode_element)(&obj.value, &mut buf)?;
            }
        }
        Ok(buf)
    }
}

fn decode_single_point(bytes: &[u8]) -> Result<ObjectValue> {
    let siq = bytes[0];
    Ok(ObjectValue::SinglePoint { value: siq & 0x01 != 0, quality: Quality::from_flags(siq) })
}

fn encode_single_point(value: &ObjectValue, buf: &mut BytesMut) -> Result<()> {
    match value {
        ObjectValue::SinglePoint { value, quality } => {
            buf.put_u8(*value as u8 | quality.to_flags());
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

fn decode_double_point(bytes: &[u8]) -> Result<ObjectValue> {
    let diq = bytes[0];
    Ok(ObjectValue::DoublePoint {
        value: DoublePointValue::from_u8(diq),
        quality: Quality::from_flags(diq),
    })
}

fn encode_double_point(value: &ObjectValue, buf: &mut BytesMut) -> Result<()> {
    match value {
        ObjectValue::DoublePoint { value, quality } => {
            buf.put_u8(value.as_u8() | quality.to_flags());
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

fn decode_normalized(bytes: &[u8]) -> Result<ObjectValue> {
    Ok(ObjectValue::Normalized {
        raw: i16::from_le_bytes([bytes[0], bytes[1]]),
        quality: MeasuredQuality::from_u8(bytes[2]),
    })
}

fn encode_normalized(value: &ObjectValue, buf: &mut BytesMut) -> Result<()> {
    match value {
        ObjectValue::Normalized { raw, quality } => {
            buf.put_i16_le(*raw);
            buf.put_u8(quality.as_u8());
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

fn decode_float(bytes: &[u8]) -> Result<ObjectValue> {
    Ok(ObjectValue::Float {
        value: f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        quality: MeasuredQuality::from_u8(bytes[4]),
    })
}

fn encode_float(value: &ObjectValue, buf: &mut BytesMut) -> Result<()> {
    match value {
        ObjectValue::Float { value, quality } => {
            buf.put_f32_le(*value);
            buf.put_u8(quality.as_u8());
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

fn decode_single_point_time(bytes: &[u8]) -> Result<ObjectValue> {
    let siq = bytes[0];
    Ok(ObjectValue::SinglePointTime {
        value: siq & 0x01 != 0,
        quality: Quality::from_flags(siq),
        timestamp: Cp56Time2a::from_bytes(&bytes[1..])?,
    })
}

fn encode_single_point_time(value: &ObjectValue, buf: &mut BytesMut) -> Result<()> {
    match value {
        ObjectValue::SinglePointTime { value, quality, timestamp } => {
            timestamp.validate()?;
            buf.put_u8(*value as u8 | quality.to_flags());
            buf.put_slice(&timestamp.to_bytes());
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

fn decode_single_command(bytes: &[u8]) -> Result<ObjectValue> {
    let sco = bytes[0];
    Ok(ObjectValue::SingleCommand {
        state: sco & 0x01 != 0,
        qualifier: (sco >> 1) & 0x3F,
        select: sco & 0x80 != 0,
    })
}

fn encode_single_command(value: &ObjectValue, buf: &mut BytesMut) -> Result<()> {
    match value {
        ObjectValue::SingleCommand { state, qualifier, select } => {
            buf.put_u8(*state as u8 | (qualifier & 0x3F) << 1 | (*select as u8) << 7);
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

fn decode_double_command(bytes: &[u8]) -> Result<ObjectValue> {
    let dco = bytes[0];
    Ok(ObjectValue::DoubleCommand {
        state: DoublePointValue::from_u8(dco),
        qualifier: (dco >> 2) & 0x1F,
        select: dco & 0x80 != 0,
    })
}

fn encode_double_command(value: &ObjectValue, buf: &mut BytesMut) -> Result<()> {
    match value {
        ObjectValue::DoubleCommand { state, qualifier, select } => {
            buf.put_u8(state.as_u8() | (qualifier & 0x1F) << 2 | (*select as u8) << 7);
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

fn decode_interrogation(bytes: &[u8]) -> Result<ObjectValue> {
    Ok(ObjectValue::Interrogation { qualifier: bytes[0] })
}

fn encode_interrogation(value: &ObjectValue, buf: &mut BytesMut) -> Result<()> {
    match value {
        ObjectValue::Interrogation { qualifier } => {
            buf.put_u8(*qualifier);
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

fn decode_clock_sync(bytes: &[u8]) -> Result<ObjectValue> {
    Ok(ObjectValue::ClockSync(Cp56Time2a::from_bytes(bytes)?))
}

fn encode_clock_sync(value: &ObjectValue, buf: &mut BytesMut) -> Result<()> {
    match value {
        ObjectValue::ClockSync(time) => {
            time.validate()?;
            buf.put_slice(&time.to_bytes());
            Ok(())
        }
        _ => Err(mismatch()),
    }
}

fn mismatch() -> Error {
    Error::protocol_static("object value does not match the ASDU type")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::with_builtins()
    }

    fn sample_time() -> Cp56Time2a {
        Cp56Time2a {
            milliseconds: 1500,
            minute: 42,
            hour: 9,
            day_of_month: 2,
            day_of_week: 1,
            month: 8,
            year: 26,
            invalid: false,
            summer_time: false,
        }
    }

    #[test]
    fn test_single_point_wire_format() {
        // type 1, one object, spontaneous, CA 1, IOA 100, value ON
        let asdu = Asdu::single_point(0x0001, Ioa::new(0x64), true);
        let encoded = registry().encode_asdu(&asdu).unwrap();
        assert_eq!(&encoded[..], &[0x01, 0x01, 0x03, 0x00, 0x01, 0x00, 0x64, 0x00, 0x00, 0x01]);

        let decoded = registry().decode_asdu(&encoded).unwrap();
        assert_eq!(decoded, asdu_with_count(asdu, 1));
    }

    // encode rewrites the VSQ count; mirror that for equality checks
    fn asdu_with_count(mut asdu: Asdu, count: u8) -> Asdu {
        asdu.header.vsq = Vsq::new(count, asdu.header.vsq.sequence);
        asdu
    }

    #[test]
    fn test_roundtrip_all_builtins_addressed() {
        let time = sample_time();
        let cases = vec![
            Asdu::single_point(1, Ioa::new(1001), true),
            Asdu::new(AsduHeader::new(TypeId::DoublePoint, Cot::SPONTANEOUS, 2)).with_object(
                Ioa::new(2000),
                ObjectValue::DoublePoint { value: DoublePointValue::On, quality: Quality::GOOD },
            ),
            Asdu::new(AsduHeader::new(TypeId::MeasuredNormalized, Cot::PERIODIC, 3)).with_object(
                Ioa::new(3000),
                ObjectValue::Normalized { raw: -1234, quality: MeasuredQuality::GOOD },
            ),
            Asdu::measured_float(4, Ioa::new(4000), 230.5),
            Asdu::new(AsduHeader::new(TypeId::SinglePointTime56, Cot::SPONTANEOUS, 5)).with_object(
                Ioa::new(5000),
                ObjectValue::SinglePointTime { value: false, quality: Quality::GOOD, timestamp: time },
            ),
            Asdu::single_command(6, Ioa::new(6000), true, true),
            Asdu::double_command(7, Ioa::new(7000), DoublePointValue::Off, false),
            Asdu::interrogation_command(8, 20),
            Asdu::clock_sync_command(9, time),
        ];

        for asdu in cases {
            let encoded = registry().encode_asdu(&asdu).unwrap();
            let decoded = registry().decode_asdu(&encoded).unwrap();
            let expected = asdu_with_count(asdu.clone(), asdu.objects.len() as u8);
            assert_eq!(decoded, expected, "roundtrip failed for {}", asdu.header.type_id);
        }
    }

    #[test]
    fn test_roundtrip_sequential() {
        let asdu = Asdu::new(AsduHeader::new(TypeId::SinglePoint, Cot::INTERROGATED_BY_STATION, 1))
            .with_object(Ioa::new(100), ObjectValue::SinglePoint { value: false, quality: Quality::GOOD })
            .with_object(Ioa::new(101), ObjectValue::SinglePoint { value: true, quality: Quality::GOOD })
            .with_object(
                Ioa::new(102),
                ObjectValue::SinglePoint { value: false, quality: Quality::from_flags(0x80) },
            )
            .sequential();

        let encoded = registry().encode_asdu(&asdu).unwrap();
        // one IOA, then three SIQ octets
        assert_eq!(encoded.len(), ASDU_HEADER_SIZE + 3 + 3);
        assert_eq!(encoded[1], 0x83);

        let decoded = registry().decode_asdu(&encoded).unwrap();
        assert_eq!(decoded.objects.len(), 3);
        assert_eq!(decoded.objects[0].ioa, Ioa::new(100));
        assert_eq!(decoded.objects[2].ioa, Ioa::new(102));
        assert_eq!(
            decoded.objects[2].value,
            ObjectValue::SinglePoint { value: false, quality: Quality::from_flags(0x80) }
        );
    }

    #[test]
    fn test_sequential_rejects_address_overflow() {
        // decode: base 0xFFFFFE with three objects runs past 24 bits
        let body = [
            0x01, 0x83, 0x14, 0x00, 0x01, 0x00, // type 1, SQ=1 n=3, interrogated
            0xFE, 0xFF, 0xFF, // base IOA 0xFFFFFE
            0x01, 0x00, 0x01, // three SIQ octets
        ];
        assert!(matches!(registry().decode_asdu(&body), Err(Error::ProtocolViolation(_))));

        // encode: the aliased third address is rejected, not wrapped to 0
        let point = ObjectValue::SinglePoint { value: true, quality: Quality::GOOD };
        let asdu = Asdu::new(AsduHeader::new(TypeId::SinglePoint, Cot::SPONTANEOUS, 1))
            .with_object(Ioa::new(0x00FF_FFFE), point.clone())
            .with_object(Ioa::new(0x00FF_FFFF), point.clone())
            .with_object(Ioa::new(0), point)
            .sequential();
        assert!(matches!(registry().encode_asdu(&asdu), Err(Error::ProtocolViolation(_))));
    }

    #[test]
    fn test_sequential_accepts_top_of_address_space() {
        let point = ObjectValue::SinglePoint { value: false, quality: Quality::GOOD };
        let asdu = Asdu::new(AsduHeader::new(TypeId::SinglePoint, Cot::SPONTANEOUS, 1))
            .with_object(Ioa::new(0x00FF_FFFE), point.clone())
            .with_object(Ioa::new(0x00FF_FFFF), point)
            .sequential();
        let encoded = registry().encode_asdu(&asdu).unwrap();
        let decoded = registry().decode_asdu(&encoded).unwrap();
        assert_eq!(decoded.objects.len(), 2);
        assert_eq!(decoded.objects[1].ioa, Ioa::new(0x00FF_FFFF));
    }

    #[test]
    fn test_sequential_requires_consecutive_ioas() {
        let asdu = Asdu::new(AsduHeader::new(TypeId::SinglePoint, Cot::SPONTANEOUS, 1))
            .with_object(Ioa::new(100), ObjectValue::SinglePoint { value: false, quality: Quality::GOOD })
            .with_object(Ioa::new(105), ObjectValue::SinglePoint { value: true, quality: Quality::GOOD })
            .sequential();
        assert!(registry().encode_asdu(&asdu).is_err());
    }

    #[test]
    fn test_float_wire_format() {
        let asdu = Asdu::measured_float(1, Ioa::new(0x10), 3.14);
        let encoded = registry().encode_asdu(&asdu).unwrap();
        let float_bytes = 3.14f32.to_le_bytes();
        assert_eq!(encoded[0], 13);
        assert_eq!(&encoded[9..13], &float_bytes);
        assert_eq!(encoded[13], 0x00);

        let decoded = registry().decode_asdu(&encoded).unwrap();
        match decoded.objects[0].value {
            ObjectValue::Float { value, quality } => {
                assert_eq!(value.to_le_bytes(), float_bytes);
                assert!(quality.is_good());
            }
            ref other => panic!("expected Float, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_asdu() {
        // count 0 in the VSQ octet
        let body = [0x01, 0x00, 0x03, 0x00, 0x01, 0x00];
        assert!(matches!(registry().decode_asdu(&body), Err(Error::EmptyAsdu)));

        let asdu = Asdu::new(AsduHeader::new(TypeId::SinglePoint, Cot::SPONTANEOUS, 1));
        assert!(matches!(registry().encode_asdu(&asdu), Err(Error::EmptyAsdu)));
    }

    #[test]
    fn test_truncated() {
        // declares one object but carries no payload
        let body = [0x01, 0x01, 0x03, 0x00, 0x01, 0x00];
        assert!(matches!(registry().decode_asdu(&body), Err(Error::Truncated(_))));

        // header itself cut short
        assert!(matches!(registry().decode_asdu(&[0x01, 0x01, 0x03]), Err(Error::Truncated(_))));
    }

    #[test]
    fn test_trailing_bytes() {
        let body = [0x01, 0x01, 0x03, 0x00, 0x01, 0x00, 0x64, 0x00, 0x00, 0x01, 0xAA];
        match registry().decode_asdu(&body) {
            Err(Error::TrailingBytes { consumed, remaining }) => {
                assert_eq!(consumed, 4);
                assert_eq!(remaining, 1);
            }
            other => panic!("expected TrailingBytes, got {other:?}"),
        }
    }

    #[test]
    fn test_unhandled_type_carries_body() {
        // type 61 is not in the profile
        let body = [0x3D, 0x01, 0x03, 0x00, 0x01, 0x00, 0x64, 0x00, 0x00, 0x01];
        match registry().decode_asdu(&body) {
            Err(Error::UnhandledType { type_id, body: raw }) => {
                assert_eq!(type_id, 0x3D);
                assert_eq!(&raw[..], &body);
            }
            other => panic!("expected UnhandledType, got {other:?}"),
        }
    }

    #[test]
    fn test_known_type_without_handler_is_unhandled() {
        // M_ME_NB_1 is in the profile but has no built-in handler
        let body = [0x0B, 0x01, 0x03, 0x00, 0x01, 0x00, 0x64, 0x00, 0x00, 0xE8, 0x03, 0x00];
        assert!(matches!(
            registry().decode_asdu(&body),
            Err(Error::UnhandledType { type_id: 0x0B, .. })
        ));
    }

    #[test]
    fn test_caller_registered_handler() {
        fn decode_scaled(bytes: &[u8]) -> Result<ObjectValue> {
            Ok(ObjectValue::Raw(Bytes::copy_from_slice(bytes)))
        }
        fn encode_scaled(value: &ObjectValue, buf: &mut BytesMut) -> Result<()> {
            match value {
                ObjectValue::Raw(raw) => {
                    buf.put_slice(raw);
                    Ok(())
                }
                _ => Err(Error::protocol_static("expected raw element")),
            }
        }

        let mut registry = TypeRegistry::with_builtins();
        registry.register(
            TypeId::MeasuredScaled,
            TypeHandler { element_size: 3, decode_element: decode_scaled, encode_element: encode_scaled },
        );

        let body = [0x0B, 0x01, 0x03, 0x00, 0x01, 0x00, 0x64, 0x00, 0x00, 0xE8, 0x03, 0x00];
        let decoded = registry.decode_asdu(&body).unwrap();
        assert_eq!(decoded.header.type_id, TypeId::MeasuredScaled);
        assert_eq!(decoded.objects[0].value, ObjectValue::Raw(Bytes::from_static(&[0xE8, 0x03, 0x00])));

        let encoded = registry.encode_asdu(&decoded).unwrap();
        assert_eq!(&encoded[..], &body);
    }

    #[test]
    fn test_command_select_execute_bits() {
        let select = Asdu::single_command(1, Ioa::new(42), true, true);
        let encoded = registry().encode_asdu(&select).unwrap();
        assert_eq!(encoded[9], 0x81);

        let execute = Asdu::single_command(1, Ioa::new(42), false, false);
        let encoded = registry().encode_asdu(&execute).unwrap();
        assert_eq!(encoded[9], 0x00);
    }

    #[test]
    fn test_mismatched_value_rejected() {
        let asdu = Asdu::new(AsduHeader::new(TypeId::SinglePoint, Cot::SPONTANEOUS, 1))
            .with_object(Ioa::new(1), ObjectValue::Interrogation { qualifier: 20 });
        assert!(registry().encode_asdu(&asdu).is_err());
    }

    #[test]
    fn test_oversized_asdu_rejected() {
        let mut asdu = Asdu::new(AsduHeader::new(TypeId::MeasuredFloat, Cot::SPONTANEOUS, 1));
        // 31 objects * 8 bytes = 248 > 243 available for objects
        for i in 0..31 {
            asdu.objects.push(InformationObject::new(
                Ioa::new(i),
                ObjectValue::Float { value: 0.0, quality: MeasuredQuality::GOOD },
            ));
        }
        assert!(registry().encode_asdu(&asdu).is_err());
    }
}
