/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Owned tag=value FIX messages.
//!
//! This module provides:
//! - [`MsgType`]: the session-level message types plus a catch-all
//! - [`Message`]: an ordered, owned list of fields that can be parsed from
//!   and encoded to the wire format

use crate::checksum::{calculate_checksum, format_checksum};
use crate::error::SessionError;
use bytes::{BufMut, BytesMut};
use std::fmt;

/// SOH (Start of Header) field delimiter.
pub const SOH: u8 = 0x01;

/// Tag numbers used by the session layer.
pub mod tags {
    /// BeginSeqNo.
    pub const BEGIN_SEQ_NO: u32 = 7;
    /// BeginString.
    pub const BEGIN_STRING: u32 = 8;
    /// BodyLength.
    pub const BODY_LENGTH: u32 = 9;
    /// CheckSum.
    pub const CHECK_SUM: u32 = 10;
    /// EndSeqNo.
    pub const END_SEQ_NO: u32 = 16;
    /// MsgSeqNum.
    pub const MSG_SEQ_NUM: u32 = 34;
    /// MsgType.
    pub const MSG_TYPE: u32 = 35;
    /// NewSeqNo.
    pub const NEW_SEQ_NO: u32 = 36;
    /// RefSeqNum.
    pub const REF_SEQ_NUM: u32 = 45;
    /// SenderCompID.
    pub const SENDER_COMP_ID: u32 = 49;
    /// SendingTime.
    pub const SENDING_TIME: u32 = 52;
    /// TargetCompID.
    pub const TARGET_COMP_ID: u32 = 56;
    /// Text.
    pub const TEXT: u32 = 58;
    /// EncryptMethod.
    pub const ENCRYPT_METHOD: u32 = 98;
    /// HeartBtInt.
    pub const HEART_BT_INT: u32 = 108;
    /// GapFillFlag.
    pub const GAP_FILL_FLAG: u32 = 123;
    /// TestReqID.
    pub const TEST_REQ_ID: u32 = 112;
    /// ResetSeqNumFlag.
    pub const RESET_SEQ_NUM_FLAG: u32 = 141;
    /// RefTagID.
    pub const REF_TAG_ID: u32 = 371;
    /// RefMsgType.
    pub const REF_MSG_TYPE: u32 = 372;
    /// SessionRejectReason.
    pub const SESSION_REJECT_REASON: u32 = 373;
}

/// FIX message type (tag 35).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MsgType {
    /// Heartbeat (0).
    Heartbeat,
    /// Test Request (1).
    TestRequest,
    /// Resend Request (2).
    ResendRequest,
    /// Reject (3).
    Reject,
    /// Sequence Reset (4).
    SequenceReset,
    /// Logout (5).
    Logout,
    /// Logon (A).
    Logon,
    /// Any application message type.
    App(String),
}

impl MsgType {
    /// Returns the wire value of the message type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Heartbeat => "0",
            Self::TestRequest => "1",
            Self::ResendRequest => "2",
            Self::Reject => "3",
            Self::SequenceReset => "4",
            Self::Logout => "5",
            Self::Logon => "A",
            Self::App(value) => value,
        }
    }

    /// Returns true for session-level (administrative) messages.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        !matches!(self, Self::App(_))
    }
}

impl From<&str> for MsgType {
    fn from(value: &str) -> Self {
        match value {
            "0" => Self::Heartbeat,
            "1" => Self::TestRequest,
            "2" => Self::ResendRequest,
            "3" => Self::Reject,
            "4" => Self::SequenceReset,
            "5" => Self::Logout,
            "A" => Self::Logon,
            other => Self::App(other.to_string()),
        }
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An owned FIX message.
///
/// BeginString, BodyLength, MsgType and CheckSum are managed by the message
/// itself; every other field is kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    begin_string: String,
    msg_type: MsgType,
    fields: Vec<(u32, String)>,
}

impl Message {
    /// Creates an empty message of the given type.
    #[must_use]
    pub fn new(begin_string: impl Into<String>, msg_type: MsgType) -> Self {
        Self {
            begin_string: begin_string.into(),
            msg_type,
            fields: Vec::new(),
        }
    }

    /// Parses a complete, framed message.
    ///
    /// The message must start with BeginString, BodyLength and MsgType in
    /// that order and end with CheckSum. Framing and checksum validation are
    /// the codec's job; this only checks structure.
    ///
    /// # Errors
    /// Returns [`SessionError::Malformed`] when the layout is invalid.
    pub fn parse(bytes: &[u8]) -> Result<Self, SessionError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| SessionError::Malformed("message is not valid utf-8".to_string()))?;
        let body = text
            .strip_suffix(SOH as char)
            .ok_or_else(|| SessionError::Malformed("missing trailing SOH".to_string()))?;

        let mut parsed = Vec::new();
        for pair in body.split(SOH as char) {
            let (tag, value) = pair
                .split_once('=')
                .ok_or_else(|| SessionError::Malformed(format!("field '{pair}' has no '='")))?;
            let tag: u32 = tag
                .parse()
                .map_err(|_| SessionError::Malformed(format!("invalid tag '{tag}'")))?;
            parsed.push((tag, value));
        }

        let begin_string = expect_tag(&parsed, 0, tags::BEGIN_STRING)?.to_string();
        expect_tag(&parsed, 1, tags::BODY_LENGTH)?
            .parse::<usize>()
            .map_err(|_| SessionError::Malformed("invalid body length".to_string()))?;
        let msg_type = MsgType::from(expect_tag(&parsed, 2, tags::MSG_TYPE)?);
        match parsed.last() {
            Some((tags::CHECK_SUM, _)) => {}
            _ => return Err(SessionError::Malformed("checksum must be last".to_string())),
        }

        let fields = parsed[3..parsed.len() - 1]
            .iter()
            .map(|(tag, value)| (*tag, (*value).to_string()))
            .collect();

        Ok(Self {
            begin_string,
            msg_type,
            fields,
        })
    }

    /// Returns the BeginString.
    #[must_use]
    pub fn begin_string(&self) -> &str {
        &self.begin_string
    }

    /// Returns the message type.
    #[must_use]
    pub const fn msg_type(&self) -> &MsgType {
        &self.msg_type
    }

    /// Returns the value of the first occurrence of `tag`.
    #[must_use]
    pub fn get(&self, tag: u32) -> Option<&str> {
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value of `tag` parsed as an unsigned integer.
    #[must_use]
    pub fn get_u64(&self, tag: u32) -> Option<u64> {
        self.get(tag).and_then(|v| v.parse().ok())
    }

    /// Sets `tag`, replacing an existing value in place.
    pub fn set(&mut self, tag: u32, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(t, _)| *t == tag) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((tag, value)),
        }
    }

    /// Sets `tag` to an unsigned integer value.
    pub fn set_u64(&mut self, tag: u32, value: u64) {
        let mut buf = itoa::Buffer::new();
        self.set(tag, buf.format(value));
    }

    /// Removes every occurrence of `tag`, returning the first value.
    pub fn remove(&mut self, tag: u32) -> Option<String> {
        let first = self
            .fields
            .iter()
            .position(|(t, _)| *t == tag)
            .map(|i| self.fields[i].1.clone());
        self.fields.retain(|(t, _)| *t != tag);
        first
    }

    /// Writes the standard header fields ahead of any body fields.
    pub fn stamp_header(
        &mut self,
        sender_comp_id: &str,
        target_comp_id: &str,
        seq_num: u64,
        sending_time: &str,
    ) {
        for tag in [
            tags::SENDER_COMP_ID,
            tags::TARGET_COMP_ID,
            tags::MSG_SEQ_NUM,
            tags::SENDING_TIME,
        ] {
            self.remove(tag);
        }
        let mut seq = itoa::Buffer::new();
        let header = [
            (tags::SENDER_COMP_ID, sender_comp_id.to_string()),
            (tags::TARGET_COMP_ID, target_comp_id.to_string()),
            (tags::MSG_SEQ_NUM, seq.format(seq_num).to_string()),
            (tags::SENDING_TIME, sending_time.to_string()),
        ];
        let body = std::mem::take(&mut self.fields);
        self.fields = header.into_iter().chain(body).collect();
    }

    /// Iterates over the fields between MsgType and CheckSum.
    pub fn fields(&self) -> impl Iterator<Item = (u32, &str)> {
        self.fields.iter().map(|(t, v)| (*t, v.as_str()))
    }

    /// Encodes the message, computing BodyLength and CheckSum.
    #[must_use]
    pub fn encode(&self) -> BytesMut {
        let mut body = BytesMut::with_capacity(128);
        put_field(&mut body, tags::MSG_TYPE, self.msg_type.as_str().as_bytes());
        for (tag, value) in &self.fields {
            put_field(&mut body, *tag, value.as_bytes());
        }

        let mut out = BytesMut::with_capacity(body.len() + 32);
        put_field(&mut out, tags::BEGIN_STRING, self.begin_string.as_bytes());
        let mut len = itoa::Buffer::new();
        put_field(&mut out, tags::BODY_LENGTH, len.format(body.len()).as_bytes());
        out.put_slice(&body);

        let checksum = calculate_checksum(&out);
        put_field(&mut out, tags::CHECK_SUM, &format_checksum(checksum));
        out
    }
}

impl fmt::Display for Message {
    /// Renders the wire form with `|` in place of SOH.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.encode();
        let text = String::from_utf8_lossy(&encoded).replace(SOH as char, "|");
        f.write_str(&text)
    }
}

fn expect_tag<'a>(
    parsed: &[(u32, &'a str)],
    index: usize,
    tag: u32,
) -> Result<&'a str, SessionError> {
    match parsed.get(index) {
        Some((found, value)) if *found == tag => Ok(value),
        _ => Err(SessionError::Malformed(format!(
            "tag {tag} expected at position {}",
            index + 1
        ))),
    }
}

fn put_field(buf: &mut BytesMut, tag: u32, value: &[u8]) {
    let mut tag_buf = itoa::Buffer::new();
    buf.put_slice(tag_buf.format(tag).as_bytes());
    buf.put_u8(b'=');
    buf.put_slice(value);
    buf.put_u8(SOH);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_type_mapping() {
        assert_eq!(MsgType::from("A"), MsgType::Logon);
        assert_eq!(MsgType::from("D"), MsgType::App("D".to_string()));
        assert!(MsgType::Logout.is_admin());
        assert!(!MsgType::App("8".to_string()).is_admin());
        assert_eq!(MsgType::TestRequest.as_str(), "1");
    }

    #[test]
    fn test_encode_computes_length_and_checksum() {
        let msg = Message::new("FIX.4.4", MsgType::Heartbeat);
        let encoded = msg.encode();
        let expected_prefix = b"8=FIX.4.4\x019=5\x0135=0\x0110=";
        assert!(encoded.starts_with(expected_prefix));

        let checksum = calculate_checksum(&encoded[..encoded.len() - 7]);
        assert_eq!(&encoded[encoded.len() - 4..encoded.len() - 1], &format_checksum(checksum));
    }

    #[test]
    fn test_parse_encoded_message() {
        let mut msg = Message::new("FIX.4.2", MsgType::App("D".to_string()));
        msg.set(11, "ORD-1");
        msg.set(55, "EUR/USD");
        msg.stamp_header("CLIENT", "SERVER", 7, "20260127-10:00:00.000");

        let parsed = Message::parse(&msg.encode()).unwrap();
        assert_eq!(parsed.begin_string(), "FIX.4.2");
        assert_eq!(parsed.msg_type(), &MsgType::App("D".to_string()));
        assert_eq!(parsed.get(tags::SENDER_COMP_ID), Some("CLIENT"));
        assert_eq!(parsed.get_u64(tags::MSG_SEQ_NUM), Some(7));
        assert_eq!(parsed.get(55), Some("EUR/USD"));

        let order: Vec<u32> = parsed.fields().map(|(t, _)| t).collect();
        assert_eq!(order, vec![49, 56, 34, 52, 11, 55]);
    }

    #[test]
    fn test_parse_rejects_bad_layout() {
        assert!(Message::parse(b"9=5\x018=FIX.4.4\x0135=0\x0110=000\x01").is_err());
        assert!(Message::parse(b"8=FIX.4.4\x019=5\x0135=0\x01").is_err());
        assert!(Message::parse(b"8=FIX.4.4\x019=5\x0135=0\x0110=000").is_err());
        assert!(Message::parse(b"8=FIX.4.4\x019=x\x0135=0\x0110=000\x01").is_err());
    }

    #[test]
    fn test_set_replaces_and_remove() {
        let mut msg = Message::new("FIX.4.4", MsgType::Logon);
        msg.set_u64(tags::HEART_BT_INT, 30);
        msg.set_u64(tags::HEART_BT_INT, 45);
        assert_eq!(msg.get_u64(tags::HEART_BT_INT), Some(45));
        assert_eq!(msg.fields().count(), 1);
        assert_eq!(msg.remove(tags::HEART_BT_INT), Some("45".to_string()));
        assert_eq!(msg.get(tags::HEART_BT_INT), None);
    }

    #[test]
    fn test_display_replaces_soh() {
        let msg = Message::new("FIX.4.4", MsgType::Heartbeat);
        assert!(msg.to_string().starts_with("8=FIX.4.4|9=5|35=0|10="));
    }
}
