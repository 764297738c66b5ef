/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Tokio codec for FIX message framing.
//!
//! Splits a TCP byte stream into complete messages using the BeginString and
//! BodyLength fields, optionally validating the trailing CheckSum.

use crate::checksum::{calculate_checksum, parse_checksum};
use crate::error::SessionError;
use crate::message::{Message, SOH};
use bytes::{BufMut, BytesMut};
use memchr::memchr;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Default upper bound for a single framed message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Smallest frame worth inspecting: `8=FIX.4.x|9=N|35=X|10=NNN|`.
const MIN_FRAME_LEN: usize = 20;

/// Length of the trailer `10=NNN|`.
const TRAILER_LEN: usize = 7;

/// Errors that can occur during codec operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Stream does not start with `8=`.
    #[error("invalid begin string: message must start with 8=")]
    InvalidBeginString,

    /// Second field is not BodyLength.
    #[error("missing body length field (tag 9)")]
    MissingBodyLength,

    /// BodyLength is not a number.
    #[error("invalid body length value")]
    InvalidBodyLength,

    /// Trailer is not a well formed `10=NNN` field.
    #[error("invalid checksum field")]
    InvalidChecksumField,

    /// Checksum mismatch.
    #[error("checksum mismatch: calculated {calculated}, declared {declared}")]
    ChecksumMismatch {
        /// Calculated checksum.
        calculated: u8,
        /// Declared checksum in message.
        declared: u8,
    },

    /// Message exceeds maximum size.
    #[error("message too large: {size} bytes exceeds maximum {max_size}")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max_size: usize,
    },

    /// I/O error.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<CodecError> for SessionError {
    fn from(err: CodecError) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Tokio codec for FIX message framing.
#[derive(Debug, Clone)]
pub struct FixCodec {
    /// Maximum message size in bytes.
    max_message_size: usize,
    /// Whether to validate checksums.
    validate_checksum: bool,
}

impl FixCodec {
    /// Creates a new codec with checksum validation enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            validate_checksum: true,
        }
    }

    /// Sets the maximum message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Sets whether to validate checksums.
    #[must_use]
    pub const fn with_checksum_validation(mut self, validate: bool) -> Self {
        self.validate_checksum = validate;
        self
    }
}

impl Default for FixCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FixCodec {
    type Item = BytesMut;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < MIN_FRAME_LEN {
            return Ok(None);
        }
        if &src[0..2] != b"8=" {
            return Err(CodecError::InvalidBeginString);
        }

        let Some(first_soh) = memchr(SOH, src) else {
            return Ok(None);
        };
        let body_len_start = first_soh + 1;
        if src.len() < body_len_start + 3 {
            return Ok(None);
        }
        if &src[body_len_start..body_len_start + 2] != b"9=" {
            return Err(CodecError::MissingBodyLength);
        }
        let Some(offset) = memchr(SOH, &src[body_len_start..]) else {
            return Ok(None);
        };
        let body_len_soh = body_len_start + offset;

        let body_length: usize = std::str::from_utf8(&src[body_len_start + 2..body_len_soh])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(CodecError::InvalidBodyLength)?;

        // BodyLength counts from after `9=N|` up to the `10=` field.
        let total_length = (body_len_soh + 1 + TRAILER_LEN)
            .checked_add(body_length)
            .ok_or(CodecError::InvalidBodyLength)?;
        if total_length > self.max_message_size {
            return Err(CodecError::MessageTooLarge {
                size: total_length,
                max_size: self.max_message_size,
            });
        }
        if src.len() < total_length {
            src.reserve(total_length - src.len());
            return Ok(None);
        }

        let trailer = &src[total_length - TRAILER_LEN..total_length];
        if &trailer[..3] != b"10=" || trailer[6] != SOH {
            return Err(CodecError::InvalidChecksumField);
        }
        if self.validate_checksum {
            let declared = parse_checksum(&trailer[3..6]).ok_or(CodecError::InvalidChecksumField)?;
            let calculated = calculate_checksum(&src[..total_length - TRAILER_LEN]);
            if calculated != declared {
                return Err(CodecError::ChecksumMismatch {
                    calculated,
                    declared,
                });
            }
        }

        Ok(Some(src.split_to(total_length)))
    }
}

impl Encoder<&Message> for FixCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let encoded = item.encode();
        if encoded.len() > self.max_message_size {
            return Err(CodecError::MessageTooLarge {
                size: encoded.len(),
                max_size: self.max_message_size,
            });
        }
        dst.reserve(encoded.len());
        dst.put_slice(&encoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MsgType;

    fn make_fix_message(body: &str) -> Vec<u8> {
        let header = format!("8=FIX.4.4\x019={}\x01", body.len());
        let without_checksum = format!("{header}{body}");
        let checksum = calculate_checksum(without_checksum.as_bytes());
        format!("{without_checksum}10={checksum:03}\x01").into_bytes()
    }

    #[test]
    fn test_decode_complete_message() {
        let mut codec = FixCodec::new();
        let msg = make_fix_message("35=0\x01");
        let mut buf = BytesMut::from(&msg[..]);

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(&frame[..], &msg[..]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_two_frames_back_to_back() {
        let mut codec = FixCodec::new();
        let mut bytes = make_fix_message("35=0\x01");
        bytes.extend(make_fix_message("35=1\x01112=T1\x01"));
        let mut buf = BytesMut::from(&bytes[..]);

        assert!(codec.decode(&mut buf).unwrap().is_some());
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert!(second.ends_with(b"\x01") && Message::parse(&second).is_ok());
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_rejects_overflowing_body_length() {
        let mut codec = FixCodec::new();
        let mut buf = BytesMut::from(&b"8=FIX.4.4\x019=18446744073709551615\x0135=0\x0110=000\x01"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::InvalidBodyLength)
        ));
    }

    #[test]
    fn test_decode_incomplete() {
        let mut codec = FixCodec::new();
        let msg = make_fix_message("35=0\x01");
        let mut buf = BytesMut::from(&msg[..msg.len() - 5]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_invalid_begin_string() {
        let mut codec = FixCodec::new();
        let mut buf = BytesMut::from(&b"9=FIX.4.4\x019=5\x0135=0\x0110=000\x01"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::InvalidBeginString)
        ));
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        let mut codec = FixCodec::new();
        let mut buf = BytesMut::from(&b"8=FIX.4.4\x019=5\x0135=0\x0110=000\x01"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::ChecksumMismatch { .. })
        ));

        let mut lenient = FixCodec::new().with_checksum_validation(false);
        let mut buf = BytesMut::from(&b"8=FIX.4.4\x019=5\x0135=0\x0110=000\x01"[..]);
        assert!(lenient.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn test_decode_too_large() {
        let mut codec = FixCodec::new().with_max_message_size(16);
        let msg = make_fix_message("35=0\x01");
        let mut buf = BytesMut::from(&msg[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_encode_message() {
        let mut codec = FixCodec::new();
        let msg = Message::new("FIX.4.4", MsgType::Heartbeat);
        let mut dst = BytesMut::new();
        codec.encode(&msg, &mut dst).unwrap();
        assert_eq!(&dst[..], &msg.encode()[..]);
        assert!(codec.decode(&mut dst).unwrap().is_some());
    }
}
