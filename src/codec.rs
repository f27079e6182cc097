//! APCI framing codec for tokio.
//!
//! Implements the tokio-util [`Decoder`]/[`Encoder`] pair for IEC 104 APDUs.
//! The decoder is strict: it never resynchronises. A stray byte where a start
//! octet must be, a length outside [4, 253] or a malformed control field all
//! fail the stream and with it the session.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Error;
use crate::types::{Apci, UFunction, MAX_APDU_LENGTH, MAX_ASDU_LENGTH, MIN_APDU_LENGTH, START_BYTE};

/// Default receive buffer bound.
pub const DEFAULT_MAX_BUFFER: usize = 64 * 1024;

/// An APDU: control information plus, for I-frames, the raw ASDU body.
///
/// The body stays undecoded at this layer; the frame codec is stateless and
/// the [`TypeRegistry`](crate::registry::TypeRegistry) interprets it.
#[derive(Debug, Clone, PartialEq)]
pub struct Apdu {
    /// Control field
    pub apci: Apci,
    /// Raw ASDU bytes (I-frames only)
    pub asdu: Option<Bytes>,
}

impl Apdu {
    /// Create an I-frame APDU.
    pub fn i_frame(send_seq: u16, recv_seq: u16, asdu: Bytes) -> Self {
        Self { apci: Apci::i_frame(send_seq, recv_seq), asdu: Some(asdu) }
    }

    /// Create an S-frame APDU.
    pub fn s_frame(recv_seq: u16) -> Self {
        Self { apci: Apci::s_frame(recv_seq), asdu: None }
    }

    /// Create a U-frame APDU.
    pub fn u_frame(function: UFunction) -> Self {
        Self { apci: Apci::u_frame(function), asdu: None }
    }
}

impl std::fmt::Display for Apdu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.apci)?;
        if let Some(asdu) = &self.asdu {
            write!(f, " +{}B", asdu.len())?;
        }
        Ok(())
    }
}

/// Strict IEC 104 frame codec.
#[derive(Debug, Clone)]
pub struct ApduCodec {
    max_buffer: usize,
}

impl Default for ApduCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ApduCodec {
    /// Codec with the default receive buffer bound.
    pub fn new() -> Self {
        Self { max_buffer: DEFAULT_MAX_BUFFER }
    }

    /// Codec with a custom receive buffer bound.
    pub fn with_max_buffer(max_buffer: usize) -> Self {
        Self { max_buffer }
    }
}

impl Decoder for ApduCodec {
    type Item = Apdu;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Apdu>, Error> {
        if src.is_empty() {
            return Ok(None);
        }
        if src[0] != START_BYTE {
            return Err(Error::FramingViolation(src[0]));
        }
        if src.len() < 2 {
            return Ok(None);
        }
        let length = src[1] as usize;
        if !(MIN_APDU_LENGTH..=MAX_APDU_LENGTH).contains(&length) {
            return Err(Error::MalformedLength(src[1]));
        }
        let total = 2 + length;
        if src.len() < total {
            if src.len() > self.max_buffer {
                return Err(Error::BufferExceeded { limit: self.max_buffer });
            }
            // reserve so the transport can complete the frame in one read
            src.reserve(total - src.len());
            return Ok(None);
        }

        let frame = src.split_to(total).freeze();
        let control = [frame[2], frame[3], frame[4], frame[5]];
        let asdu_len = length - MIN_APDU_LENGTH;
        let apci = Apci::parse(control, asdu_len)?;

        let asdu = if apci.is_i_frame() {
            if asdu_len == 0 {
                return Err(Error::protocol_static("I-frame without ASDU body"));
            }
            Some(frame.slice(6..))
        } else {
            None
        };

        Ok(Some(Apdu { apci, asdu }))
    }
}

impl Encoder<Apdu> for ApduCodec {
    type Error = Error;

    fn encode(&mut self, item: Apdu, dst: &mut BytesMut) -> Result<(), Error> {
        let asdu_len = item.asdu.as_ref().map_or(0, Bytes::len);
        // constructing an oversized ASDU is prevented at registry level
        if asdu_len > MAX_ASDU_LENGTH {
            return Err(Error::protocol_static("ASDU exceeds maximum APDU length"));
        }

        dst.reserve(6 + asdu_len);
        dst.put_u8(START_BYTE);
        dst.put_u8((MIN_APDU_LENGTH + asdu_len) as u8);
        dst.put_slice(&item.apci.encode());
        if let Some(asdu) = &item.asdu {
            dst.put_slice(asdu);
        }
        Ok(())
    }
}
