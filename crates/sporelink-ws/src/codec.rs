//! Stateless frame encoding and decoding.
//!
//! The decoder never consumes bytes until a whole frame is present: headers
//! are parsed from a borrowed slice, and a short buffer yields
//! [`FrameError::Incomplete`] with the buffer left untouched. Declared
//! lengths are checked against the configured limit before any payload
//! storage is reserved.
//!
//! ```text
//! byte0: FIN(1) RSV(3, must be 0) OPCODE(4)
//! byte1: MASK(1) LEN7(7)
//!   LEN7 == 126 -> next 2 bytes = LEN16 (big-endian)
//!   LEN7 == 127 -> next 8 bytes = LEN64 (big-endian)
//! if MASK: next 4 bytes = mask key
//! payload: LEN bytes, XORed with mask key (index mod 4) if masked
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::config::Role;
use crate::frame::{Frame, OpCode};
use crate::mask;

/// Largest possible header: 2 fixed + 8 extended length + 4 mask.
pub const MAX_HEADER_LEN: usize = 14;

/// Largest payload a control frame may carry.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

const FIN_BIT: u8 = 0b1000_0000;
const RSV_BITS: u8 = 0b0111_0000;
const OPCODE_BITS: u8 = 0b0000_1111;
const MASK_BIT: u8 = 0b1000_0000;
const LEN7_BITS: u8 = 0b0111_1111;

/// Errors produced while decoding a frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// More bytes are needed before the frame can be decoded.
    #[error("incomplete frame: {needed} more bytes needed")]
    Incomplete {
        /// Minimum number of additional bytes required.
        needed: usize,
    },

    /// The opcode nibble is not one RFC 6455 defines.
    #[error("invalid opcode {0:#x}")]
    InvalidOpCode(u8),

    /// One of the RSV1-3 bits was set; no extensions are negotiated.
    #[error("reserved bits set: {0:#05b}")]
    ReservedBits(u8),

    /// FIN was clear; fragmented messages are not supported.
    #[error("fragmented frames are not supported")]
    Fragmented,

    /// A continuation frame arrived; fragmented messages are not supported.
    #[error("continuation frames are not supported")]
    UnexpectedContinuation,

    /// A control frame declared more than 125 payload bytes.
    #[error("control frame payload of {0} bytes exceeds 125")]
    ControlTooLong(u64),

    /// The declared payload length exceeds the configured maximum.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLarge {
        /// Declared payload length.
        len: u64,
        /// Configured maximum.
        max: usize,
    },
}

impl FrameError {
    /// `true` for [`FrameError::Incomplete`].
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Incomplete { .. })
    }
}

/// A parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Final fragment flag.
    pub fin: bool,
    /// Operation code.
    pub opcode: OpCode,
    /// Masking key, when the MASK bit was set.
    pub mask: Option<[u8; 4]>,
    /// Declared payload length.
    pub payload_len: u64,
    /// Number of bytes the header occupies on the wire.
    pub header_len: usize,
}

impl FrameHeader {
    /// Parse a header from the front of `src` without consuming anything.
    ///
    /// Masking is detected from the MASK bit alone, so frames from either
    /// role decode the same way.
    pub fn parse(src: &[u8]) -> Result<Self, FrameError> {
        if src.len() < 2 {
            return Err(FrameError::Incomplete {
                needed: 2 - src.len(),
            });
        }

        let (b0, b1) = (src[0], src[1]);
        if b0 & RSV_BITS != 0 {
            return Err(FrameError::ReservedBits((b0 & RSV_BITS) >> 4));
        }

        let fin = b0 & FIN_BIT != 0;
        let opcode = OpCode::try_from(b0 & OPCODE_BITS)?;
        if opcode == OpCode::Continuation {
            return Err(FrameError::UnexpectedContinuation);
        }
        if !fin {
            return Err(FrameError::Fragmented);
        }

        let masked = b1 & MASK_BIT != 0;
        let len7 = b1 & LEN7_BITS;
        let extra = match len7 {
            126 => 2,
            127 => 8,
            _ => 0,
        };
        let header_len = 2 + extra + if masked { 4 } else { 0 };
        if src.len() < header_len {
            return Err(FrameError::Incomplete {
                needed: header_len - src.len(),
            });
        }

        let mut rest = &src[2..header_len];
        let payload_len = match extra {
            2 => u64::from(rest.get_u16()),
            8 => rest.get_u64(),
            _ => u64::from(len7),
        };

        if opcode.is_control() && payload_len > MAX_CONTROL_PAYLOAD as u64 {
            return Err(FrameError::ControlTooLong(payload_len));
        }

        let mask = masked.then(|| {
            let mut key = [0u8; 4];
            rest.copy_to_slice(&mut key);
            key
        });

        Ok(Self {
            fin,
            opcode,
            mask,
            payload_len,
            header_len,
        })
    }

    /// Payload length as `usize`, rejected when above `max`.
    ///
    /// Only the declared length is inspected, so an oversized frame never
    /// causes an allocation of its size.
    pub fn check_limit(&self, max: Option<usize>) -> Result<usize, FrameError> {
        let too_large = || FrameError::TooLarge {
            len: self.payload_len,
            max: max.unwrap_or(usize::MAX),
        };
        let len = usize::try_from(self.payload_len).map_err(|_| too_large())?;
        match max {
            Some(max) if len > max => Err(too_large()),
            _ => Ok(len),
        }
    }

    /// Total bytes of header plus payload, when that fits in memory.
    pub fn frame_len(&self, max: Option<usize>) -> Result<usize, FrameError> {
        let payload_len = self.check_limit(max)?;
        self.header_len
            .checked_add(payload_len)
            .ok_or(FrameError::TooLarge {
                len: self.payload_len,
                max: max.unwrap_or(usize::MAX),
            })
    }

    /// Build the frame from its raw wire bytes (header included), unmasking
    /// the payload when needed.
    pub fn into_frame(self, mut raw: BytesMut) -> Frame {
        raw.advance(self.header_len);
        if let Some(key) = self.mask {
            mask::apply_mask(&mut raw, key);
        }
        Frame {
            fin: self.fin,
            opcode: self.opcode,
            payload: raw.freeze(),
        }
    }
}

/// Decode one frame from the front of `src`.
///
/// On success exactly the frame's bytes are removed from `src`. On any error
/// `src` is left as it was.
pub fn decode(src: &mut BytesMut, max_payload: Option<usize>) -> Result<Frame, FrameError> {
    let header = FrameHeader::parse(&src[..])?;
    let total = header.frame_len(max_payload)?;
    if src.len() < total {
        return Err(FrameError::Incomplete {
            needed: total - src.len(),
        });
    }
    Ok(header.into_frame(src.split_to(total)))
}

/// Encode a final frame.
///
/// Clients mask every frame with a fresh random key; servers never mask.
pub fn encode(opcode: OpCode, payload: &[u8], role: Role) -> Bytes {
    let mut dst = BytesMut::with_capacity(MAX_HEADER_LEN + payload.len());
    encode_into(&mut dst, opcode, payload, role);
    dst.freeze()
}

/// Encode a final frame into `dst`.
pub fn encode_into(dst: &mut BytesMut, opcode: OpCode, payload: &[u8], role: Role) {
    let key = match role {
        Role::Client => Some(mask::random_key()),
        Role::Server => None,
    };
    encode_with_key(dst, opcode, payload, key);
}

/// Encode with an explicit masking key (or none).
pub fn encode_with_key(dst: &mut BytesMut, opcode: OpCode, payload: &[u8], key: Option<[u8; 4]>) {
    let len = payload.len();
    dst.reserve(MAX_HEADER_LEN + len);

    dst.put_u8(FIN_BIT | u8::from(opcode));
    let mask_bit = if key.is_some() { MASK_BIT } else { 0 };
    if len < 126 {
        // Fits in the 7-bit field.
        dst.put_u8(mask_bit | len as u8);
    } else if let Ok(len16) = u16::try_from(len) {
        dst.put_u8(mask_bit | 126);
        dst.put_u16(len16);
    } else {
        dst.put_u8(mask_bit | 127);
        dst.put_u64(len as u64);
    }

    if let Some(key) = key {
        dst.put_slice(&key);
    }
    let start = dst.len();
    dst.put_slice(payload);
    if let Some(key) = key {
        mask::apply_mask(&mut dst[start..], key);
    }
}
