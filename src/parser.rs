//! Streaming FIX message parser: a byte-stream state machine that emits
//! decoded messages and structured parse errors as data arrives in
//! arbitrary chunk sizes.

use crate::codec::checksum;
use crate::error::FixError;
use crate::message::{FieldValue, Message};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub header_fields: Vec<u32>,
    pub binary_fields: HashSet<u32>,
    pub group_fields: HashMap<u32, HashSet<u32>>,
    pub max_length: usize,
    pub debug: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            header_fields: vec![8, 9, 35, 49, 56],
            binary_fields: HashSet::new(),
            group_fields: HashMap::new(),
            max_length: 2048,
            debug: false,
        }
    }
}

#[derive(Debug)]
pub enum ParserEvent {
    Message {
        message: Message,
        body_length: usize,
        checksum: u32,
    },
    Error(FixError),
}

/// One level of an open repeating group: the lead tag, the records
/// assembled so far, and which record is currently being filled in.
#[derive(Debug)]
struct Level {
    tag_id: u32,
    list: Vec<Message>,
    current: Option<usize>,
}

pub struct Parser {
    config: ParserConfig,
    buffer: Vec<u8>,
    message: Message,
    message_length: usize,
    checksum_tally: u32,
    level_stack: Vec<Level>,
    is_parsing: bool,
    is_receiving_data: bool,
    pending_binary_len: Option<usize>,
    expected_binary_tag: Option<u32>,
    expected_binary_payload_len: Option<usize>,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        let message = Message::with_header_fields(&config.header_fields);
        Self {
            config,
            buffer: Vec::new(),
            message,
            message_length: 0,
            checksum_tally: 0,
            level_stack: Vec::new(),
            is_parsing: false,
            is_receiving_data: false,
            pending_binary_len: None,
            expected_binary_tag: None,
            expected_binary_payload_len: None,
        }
    }

    pub fn is_parsing(&self) -> bool {
        self.is_parsing
    }

    /// Reset to a fresh state. If `flush_buffer` is set, any unconsumed
    /// bytes (the remainder of a message abandoned due to an error) are
    /// discarded as well.
    pub fn reset(&mut self, flush_buffer: bool) {
        self.message = Message::with_header_fields(&self.config.header_fields);
        self.message_length = 0;
        self.checksum_tally = 0;
        self.level_stack.clear();
        self.is_parsing = false;
        self.pending_binary_len = None;
        self.expected_binary_tag = None;
        self.expected_binary_payload_len = None;
        if flush_buffer {
            self.buffer.clear();
        }
    }

    /// Feed newly-arrived bytes. Returns, in order, every message decoded
    /// and every error encountered while processing `data`.
    pub fn on_data_received(&mut self, data: &[u8]) -> Vec<ParserEvent> {
        let mut events = Vec::new();
        if self.is_receiving_data {
            return events;
        }
        self.is_receiving_data = true;
        self.buffer.extend_from_slice(data);

        loop {
            let search_start = self.pending_binary_len.unwrap_or(0);
            if self.buffer.len() <= search_start {
                break;
            }
            let delim_offset = match memchr::memchr(crate::codec::SOH, &self.buffer[search_start..]) {
                Some(p) => search_start + p,
                None => break,
            };

            let field: Vec<u8> = self.buffer[..delim_offset].to_vec();
            self.buffer.drain(..=delim_offset);
            let was_binary_wait = self.pending_binary_len.take();

            match self.process_field(&field, was_binary_wait.is_some()) {
                Ok(Some(event)) => {
                    events.push(event);
                }
                Ok(None) => {}
                Err(err) => {
                    events.push(ParserEvent::Error(err));
                    self.reset(true);
                    break;
                }
            }
        }

        self.is_receiving_data = false;
        events
    }

    fn process_field(&mut self, field: &[u8], was_binary_payload: bool) -> Result<Option<ParserEvent>, FixError> {
        let (tag, value) = parse_field(field)?;

        if was_binary_payload {
            let expected_tag = self.expected_binary_tag.take();
            let expected_len = self.expected_binary_payload_len.take();
            if expected_tag != Some(tag) {
                return Err(FixError::parse(format!("expected binary companion tag {expected_tag:?}, got {tag}")));
            }
            if expected_len != Some(value.len()) {
                return Err(FixError::parse(format!(
                    "binary field {tag}: expected {expected_len:?} bytes, got {}",
                    value.len()
                )));
            }
        } else {
            if tag == 8 {
                if self.is_parsing {
                    return Err(FixError::parse("unexpected tag: 8"));
                }
                self.is_parsing = true;
            } else if !self.is_parsing {
                return Err(FixError::parse("message must start with tag 8"));
            }
        }

        if tag != 8 && tag != 9 && tag != 10 {
            self.message_length += field.len() + 1;
            if self.message_length >= self.config.max_length {
                return Err(FixError::LengthExceeded);
            }
        }

        if tag != 10 {
            self.checksum_tally = checksum(field, self.checksum_tally);
            self.checksum_tally = checksum(&[crate::codec::SOH], self.checksum_tally);
        }

        if !was_binary_payload && self.config.binary_fields.contains(&tag) {
            let n: usize = std::str::from_utf8(&value)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| FixError::parse(format!("binary field {tag}: non-numeric length")))?;
            if n > self.config.max_length {
                return Err(FixError::BinaryLengthExceeded);
            }
            let companion = tag + 1;
            let total_len = companion.to_string().len() + 1 + n;
            self.pending_binary_len = Some(total_len);
            self.expected_binary_tag = Some(companion);
            self.expected_binary_payload_len = Some(n);
        }

        self.update_field(tag, value);

        if tag == 10 {
            let message = std::mem::replace(&mut self.message, Message::with_header_fields(&self.config.header_fields));
            let body_length = self.message_length;
            let check = self.checksum_tally;
            self.reset(false);
            return Ok(Some(ParserEvent::Message {
                message,
                body_length,
                checksum: check,
            }));
        }

        Ok(None)
    }

    fn update_field(&mut self, tag: u32, value: Vec<u8>) {
        if self.config.group_fields.contains_key(&tag) {
            self.level_stack.push(Level {
                tag_id: tag,
                list: Vec::new(),
                current: None,
            });
            return;
        }

        if self.level_stack.is_empty() {
            self.message.set(tag, FieldValue::Scalar(value));
            return;
        }

        let top_tag = self.level_stack.last().unwrap().tag_id;
        let is_member = self
            .config
            .group_fields
            .get(&top_tag)
            .map_or(false, |members| members.contains(&tag));

        if is_member {
            let level = self.level_stack.last_mut().unwrap();
            let need_new = match level.current {
                None => true,
                Some(idx) => level.list[idx].contains(tag),
            };
            if need_new {
                level.list.push(Message::new());
                level.current = Some(level.list.len() - 1);
            }
            let idx = level.current.unwrap();
            level.list[idx].set(tag, FieldValue::Scalar(value));
            return;
        }

        let mut popped = self.level_stack.pop().unwrap();
        loop {
            match self.level_stack.last_mut() {
                Some(parent) => {
                    let idx = parent
                        .current
                        .expect("group level must have a current record to attach into");
                    parent.list[idx].set(popped.tag_id, FieldValue::Group(popped.list));
                    let parent_tag = parent.tag_id;
                    let parent_claims = self
                        .config
                        .group_fields
                        .get(&parent_tag)
                        .map_or(false, |members| members.contains(&tag));
                    if parent_claims {
                        break;
                    }
                    popped = self.level_stack.pop().unwrap();
                }
                None => {
                    self.message.set(popped.tag_id, FieldValue::Group(popped.list));
                    break;
                }
            }
        }

        self.update_field(tag, value);
    }
}

fn parse_field(field: &[u8]) -> Result<(u32, Vec<u8>), FixError> {
    let eq_pos = field
        .iter()
        .position(|&b| b == b'=')
        .ok_or_else(|| FixError::parse("missing '=' in field"))?;
    let tag_bytes = &field[..eq_pos];
    if tag_bytes.is_empty() || !tag_bytes.iter().all(|b| b.is_ascii_digit()) {
        return Err(FixError::parse(format!(
            "non-numeric tag: {:?}",
            String::from_utf8_lossy(tag_bytes)
        )));
    }
    let tag: u32 = std::str::from_utf8(tag_bytes)
        .unwrap()
        .parse()
        .map_err(|_| FixError::parse("tag out of range"))?;
    let value = field[eq_pos + 1..].to_vec();
    Ok((tag, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soh_join(fields: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for f in fields {
            out.extend_from_slice(f.as_bytes());
            out.push(crate::codec::SOH);
        }
        out
    }

    #[test]
    fn simple_message_decodes_with_expected_checksum() {
        let bytes = soh_join(&[
            "8=FIX.4.2", "9=65", "35=A", "49=SERVER", "56=CLIENT", "34=177",
            "52=20090107-18:15:16", "98=0", "108=30", "10=062",
        ]);
        let mut parser = Parser::new(ParserConfig::default());
        let events = parser.on_data_received(&bytes);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ParserEvent::Message { message, checksum, .. } => {
                assert_eq!(message.len(), 9);
                assert_eq!(*checksum, 62);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn byte_at_a_time_still_yields_exactly_one_message() {
        let bytes = soh_join(&["8=FIX.4.2", "9=5", "35=0", "10=161"]);
        let mut parser = Parser::new(ParserConfig::default());
        let mut events_total = Vec::new();
        for b in &bytes {
            events_total.extend(parser.on_data_received(&[*b]));
        }
        assert_eq!(events_total.len(), 1);
        assert!(!parser.is_parsing());
    }

    #[test]
    fn binary_field_with_embedded_soh_and_equals_decodes() {
        let mut config = ParserConfig::default();
        config.binary_fields.insert(99);
        let mut parser = Parser::new(config);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"8=FIX.4.2\x019=22\x0135=A\x0199=7\x01100=1\x012\x013\x014\x01");
        bytes.extend_from_slice(b"10=000\x01");
        let events = parser.on_data_received(&bytes);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ParserEvent::Message { message, .. } => {
                assert_eq!(message.get(100u32).unwrap().as_scalar().unwrap(), b"1\x012\x013\x014");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn nested_groups_build_expected_tree() {
        let mut group_fields = HashMap::new();
        group_fields.insert(100, HashSet::from([101, 102, 200]));
        group_fields.insert(200, HashSet::from([201, 202]));
        let config = ParserConfig {
            group_fields,
            ..ParserConfig::default()
        };
        let mut parser = Parser::new(config);

        let bytes = soh_join(&[
            "8=FIX.4.2", "9=40", "100=1", "101=a", "102=b", "200=1", "201=abc", "202=def", "10=087",
        ]);
        let events = parser.on_data_received(&bytes);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ParserEvent::Message { message, .. } => {
                let outer = message.get(100u32).unwrap().as_group().unwrap();
                assert_eq!(outer.len(), 1);
                assert_eq!(outer[0].get_str(101), Some("a"));
                let inner = outer[0].get(200u32).unwrap().as_group().unwrap();
                assert_eq!(inner.len(), 1);
                assert_eq!(inner[0].get_str(201), Some("abc"));
                assert_eq!(inner[0].get_str(202), Some("def"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn multiple_groups_record_boundary_on_tag_repeat() {
        let mut group_fields = HashMap::new();
        group_fields.insert(390, HashSet::from([391, 392]));
        let config = ParserConfig {
            group_fields,
            ..ParserConfig::default()
        };
        let mut parser = Parser::new(config);

        let bytes = soh_join(&[
            "8=FIX.4.2", "9=10", "390=2", "391=x", "392=1", "391=y", "392=2", "10=001",
        ]);
        let events = parser.on_data_received(&bytes);
        match &events[0] {
            ParserEvent::Message { message, .. } => {
                let groups = message.get(390u32).unwrap().as_group().unwrap();
                assert_eq!(groups.len(), 2);
                assert_eq!(groups[0].get_str(391), Some("x"));
                assert_eq!(groups[1].get_str(391), Some("y"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unexpected_leading_tag_is_a_parse_error() {
        let bytes = soh_join(&["18=x", "8=FIX.4.2", "10=000"]);
        let mut parser = Parser::new(ParserConfig::default());
        let events = parser.on_data_received(&bytes);
        assert!(matches!(events[0], ParserEvent::Error(FixError::Parse(_))));
    }

    #[test]
    fn message_too_large_raises_length_exceeded() {
        let config = ParserConfig {
            max_length: 20,
            ..ParserConfig::default()
        };
        let mut parser = Parser::new(config);
        let bytes = soh_join(&["8=FIX.4.2", "9=999", "35=AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"]);
        let events = parser.on_data_received(&bytes);
        assert!(matches!(events.last(), Some(ParserEvent::Error(FixError::LengthExceeded))));
    }

    #[test]
    fn declared_binary_length_over_max_rejected_immediately() {
        let mut config = ParserConfig {
            max_length: 100,
            ..ParserConfig::default()
        };
        config.binary_fields.insert(1000);
        let mut parser = Parser::new(config);
        let bytes = soh_join(&["8=FIX.4.2", "9=10", "1000=128"]);
        let events = parser.on_data_received(&bytes);
        assert!(matches!(events.last(), Some(ParserEvent::Error(FixError::BinaryLengthExceeded))));
    }

    #[test]
    fn partial_message_leaves_parser_mid_parse() {
        let bytes = soh_join(&["8=FIX.4.2", "9=5", "35=0"]);
        let mut parser = Parser::new(ParserConfig::default());
        let events = parser.on_data_received(&bytes);
        assert!(events.is_empty());
        assert!(parser.is_parsing());
    }
}
