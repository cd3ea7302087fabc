//! Wire encoding of [`Message`] values: body length, checksum, framing.

use crate::message::{FieldValue, Message};
use bytes::Bytes;
use std::io::{self, Write};

pub const SOH: u8 = 0x01;

/// FIX MsgType (tag 35) values this harness understands natively; anything
/// else round-trips as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixMsgType {
    Logon,
    Heartbeat,
    TestRequest,
    Logout,
    ResendRequest,
    SequenceReset,
    ExecutionReport,
    NewOrderSingle,
    Unknown(String),
}

impl FixMsgType {
    pub fn as_str(&self) -> &str {
        match self {
            FixMsgType::Logon => "A",
            FixMsgType::Heartbeat => "0",
            FixMsgType::TestRequest => "1",
            FixMsgType::Logout => "5",
            FixMsgType::ResendRequest => "2",
            FixMsgType::SequenceReset => "4",
            FixMsgType::ExecutionReport => "8",
            FixMsgType::NewOrderSingle => "D",
            FixMsgType::Unknown(s) => s.as_str(),
        }
    }

    pub fn parse(s: &str) -> FixMsgType {
        match s {
            "A" => FixMsgType::Logon,
            "0" => FixMsgType::Heartbeat,
            "1" => FixMsgType::TestRequest,
            "5" => FixMsgType::Logout,
            "2" => FixMsgType::ResendRequest,
            "4" => FixMsgType::SequenceReset,
            "8" => FixMsgType::ExecutionReport,
            "D" => FixMsgType::NewOrderSingle,
            other => FixMsgType::Unknown(other.to_string()),
        }
    }
}

/// `(running_checksum + bytes) mod 256`, the same accumulator used by both
/// the encoder and the parser so they always agree.
pub fn checksum(bytes: &[u8], start: u32) -> u32 {
    bytes.iter().fold(start, |acc, &b| (acc + b as u32) % 256)
}

fn write_field<W: Write>(writer: &mut W, tag: u32, value: &FieldValue) -> io::Result<()> {
    match value {
        FieldValue::Scalar(v) => {
            write!(writer, "{tag}=")?;
            writer.write_all(v)?;
            writer.write_all(&[SOH])?;
        }
        FieldValue::Group(groups) => {
            write!(writer, "{tag}={}", groups.len())?;
            writer.write_all(&[SOH])?;
            for g in groups {
                for (member_tag, member_value) in g.iter() {
                    write_field(writer, member_tag, member_value)?;
                }
            }
        }
    }
    Ok(())
}

/// Encode `message` to wire bytes, writing the computed BodyLength (tag 9)
/// and CheckSum (tag 10) back into `message` as a side effect.
///
/// `include`/`exclude`, if given, restrict which non-header tags are
/// emitted; tags 8, 9, 10 are always governed by the framer, never by the
/// message's own stored values for those tags (other than tag 8's value,
/// which supplies BeginString).
pub fn encode(
    message: &mut Message,
    include: Option<&[u32]>,
    exclude: Option<&[u32]>,
) -> io::Result<Bytes> {
    let begin_string = message
        .get_str(8)
        .unwrap_or("FIX.4.2")
        .to_string();

    let mut body = Vec::new();
    for (tag, value) in message.iter() {
        if tag == 8 || tag == 9 || tag == 10 {
            continue;
        }
        if let Some(incl) = include {
            if !incl.contains(&tag) {
                continue;
            }
        }
        if let Some(excl) = exclude {
            if excl.contains(&tag) {
                continue;
            }
        }
        write_field(&mut body, tag, value)?;
    }

    let mut out = Vec::with_capacity(body.len() + 32);
    write!(out, "8={begin_string}")?;
    out.push(SOH);
    write!(out, "9={}", body.len())?;
    out.push(SOH);
    out.extend_from_slice(&body);

    let check = checksum(&out, 0);
    write!(out, "10={check:03}")?;
    out.push(SOH);

    message.set(9u32, body.len().to_string());
    message.set(10u32, format!("{check:03}"));

    Ok(Bytes::from(out))
}

pub fn build_logon(heart_bt_int_secs: u32, sender_comp_id: &str, target_comp_id: &str) -> Message {
    let mut msg = Message::with_header_fields(&[8, 9, 35, 49, 56]);
    msg.set(35u32, FixMsgType::Logon.as_str());
    msg.set(49u32, sender_comp_id);
    msg.set(56u32, target_comp_id);
    msg.set(108u32, heart_bt_int_secs.to_string());
    msg
}

pub fn build_heartbeat(test_req_id: Option<&str>, sender_comp_id: &str, target_comp_id: &str) -> Message {
    let mut msg = Message::with_header_fields(&[8, 9, 35, 49, 56]);
    msg.set(35u32, FixMsgType::Heartbeat.as_str());
    msg.set(49u32, sender_comp_id);
    msg.set(56u32, target_comp_id);
    if let Some(id) = test_req_id {
        msg.set(112u32, id);
    }
    msg
}

pub fn build_test_request(id: &str, sender_comp_id: &str, target_comp_id: &str) -> Message {
    let mut msg = Message::with_header_fields(&[8, 9, 35, 49, 56]);
    msg.set(35u32, FixMsgType::TestRequest.as_str());
    msg.set(49u32, sender_comp_id);
    msg.set(56u32, target_comp_id);
    msg.set(112u32, id);
    msg
}

pub fn build_logout(text: Option<&str>, sender_comp_id: &str, target_comp_id: &str) -> Message {
    let mut msg = Message::with_header_fields(&[8, 9, 35, 49, 56]);
    msg.set(35u32, FixMsgType::Logout.as_str());
    msg.set(49u32, sender_comp_id);
    msg.set(56u32, target_comp_id);
    if let Some(t) = text {
        msg.set(58u32, t);
    }
    msg
}

pub fn build_resend_request(begin_seq_no: u32, end_seq_no: u32, sender_comp_id: &str, target_comp_id: &str) -> Message {
    let mut msg = Message::with_header_fields(&[8, 9, 35, 49, 56]);
    msg.set(35u32, FixMsgType::ResendRequest.as_str());
    msg.set(49u32, sender_comp_id);
    msg.set(56u32, target_comp_id);
    msg.set(7u32, begin_seq_no.to_string());
    msg.set(16u32, end_seq_no.to_string());
    msg
}

pub fn build_sequence_reset(new_seq_no: u32, gap_fill: bool, sender_comp_id: &str, target_comp_id: &str) -> Message {
    let mut msg = Message::with_header_fields(&[8, 9, 35, 49, 56]);
    msg.set(35u32, FixMsgType::SequenceReset.as_str());
    msg.set(49u32, sender_comp_id);
    msg.set(56u32, target_comp_id);
    msg.set(36u32, new_seq_no.to_string());
    if gap_fill {
        msg.set(123u32, "Y");
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Parser, ParserConfig, ParserEvent};

    #[test]
    fn checksum_and_body_length_laws_hold() {
        let mut msg = Message::with_header_fields(&[8, 9, 35]);
        msg.set(8u32, "FIX.4.2");
        msg.set(35u32, "0");
        let bytes = encode(&mut msg, None, None).unwrap();

        let body_len: usize = msg.get_str(9).unwrap().parse().unwrap();
        let tag9_field = format!("9={body_len}\u{1}");
        let body_start = bytes.windows(tag9_field.len()).position(|w| w == tag9_field.as_bytes()).unwrap() + tag9_field.len();
        let body = &bytes[body_start..bytes.len() - 7];
        assert_eq!(body.len(), body_len);

        let check: u32 = msg.get_str(10).unwrap().parse().unwrap();
        let up_to_checksum = &bytes[..bytes.len() - 7];
        assert_eq!(checksum(up_to_checksum, 0), check);
    }

    #[test]
    fn encode_decode_round_trip() {
        let mut msg = Message::with_header_fields(&[8, 9, 35, 49, 56]);
        msg.set(8u32, "FIX.4.2");
        msg.set(35u32, "A");
        msg.set(49u32, "SERVER");
        msg.set(56u32, "CLIENT");
        let bytes = encode(&mut msg, None, None).unwrap();

        let mut parser = Parser::new(ParserConfig::default());
        let events = parser.on_data_received(&bytes);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ParserEvent::Message { message, .. } => {
                assert_eq!(message.get_str(35), Some("A"));
                assert_eq!(message.get_str(49), Some("SERVER"));
                assert_eq!(message.get_str(56), Some("CLIENT"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
