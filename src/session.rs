//! The session protocol engine: sequence numbers, administrative message
//! handling, and the heartbeat / test-request liveness timer.

use crate::codec;
use crate::error::FixError;
use crate::message::Message;
use crate::parser::{Parser, ParserConfig, ParserEvent};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub protocol_version: String,
    pub sender_compid: String,
    pub target_compid: String,
    pub header_fields: Vec<u32>,
    pub required_fields: Vec<u32>,
    pub binary_fields: HashSet<u32>,
    pub group_fields: HashMap<u32, HashSet<u32>>,
    pub max_length: usize,
    pub heartbeat_interval_secs: u64,
    pub filter_heartbeat: bool,
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            protocol_version: "FIX.4.2".to_string(),
            sender_compid: String::new(),
            target_compid: String::new(),
            header_fields: vec![8, 9, 35, 49, 56],
            required_fields: vec![8, 9, 35],
            binary_fields: HashSet::new(),
            group_fields: HashMap::new(),
            max_length: 2048,
            heartbeat_interval_secs: 30,
            filter_heartbeat: true,
        }
    }
}

#[derive(Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn protocol_version(mut self, v: impl Into<String>) -> Self {
        self.config.protocol_version = v.into();
        self
    }
    pub fn sender_compid(mut self, v: impl Into<String>) -> Self {
        self.config.sender_compid = v.into();
        self
    }
    pub fn target_compid(mut self, v: impl Into<String>) -> Self {
        self.config.target_compid = v.into();
        self
    }
    pub fn required_fields(mut self, v: Vec<u32>) -> Self {
        self.config.required_fields = v;
        self
    }
    pub fn header_fields(mut self, v: Vec<u32>) -> Self {
        self.config.header_fields = v;
        self
    }
    pub fn binary_fields(mut self, v: HashSet<u32>) -> Self {
        self.config.binary_fields = v;
        self
    }
    pub fn group_fields(mut self, v: HashMap<u32, HashSet<u32>>) -> Self {
        self.config.group_fields = v;
        self
    }
    pub fn max_length(mut self, v: usize) -> Self {
        self.config.max_length = v;
        self
    }
    pub fn heartbeat_interval_secs(mut self, v: u64) -> Self {
        self.config.heartbeat_interval_secs = v;
        self
    }
    pub fn filter_heartbeat(mut self, v: bool) -> Self {
        self.config.filter_heartbeat = v;
        self
    }
    pub fn build(self) -> SessionConfig {
        self.config
    }
}

/// An event produced while feeding inbound bytes through the session.
#[derive(Debug)]
pub enum SessionEvent {
    /// A message that survived validation and heartbeat filtering and
    /// should be delivered to the test thread.
    Inbound(Message),
    /// A message the session wants sent immediately (e.g. a Heartbeat
    /// reply to a TestRequest).
    Outbound(Message),
    /// A fatal protocol or data error; the connection should be closed.
    Error(FixError),
}

pub struct Session {
    config: SessionConfig,
    parser: Parser,
    send_seqno: u64,
    pub message_sent_count: u64,
    last_send_time: Instant,
    last_receive_time: Instant,
    pending_testrequest_id: Option<String>,
    pending_testrequest_sent_at: Option<Instant>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let parser_config = ParserConfig {
            header_fields: config.header_fields.clone(),
            binary_fields: config.binary_fields.clone(),
            group_fields: config.group_fields.clone(),
            max_length: config.max_length,
            debug: false,
        };
        let now = Instant::now();
        Self {
            config,
            parser: Parser::new(parser_config),
            send_seqno: 0,
            message_sent_count: 0,
            last_send_time: now,
            last_receive_time: now,
            pending_testrequest_id: None,
            pending_testrequest_sent_at: None,
        }
    }

    pub fn send_seqno(&self) -> u64 {
        self.send_seqno
    }

    /// Pre-increment the sequence number, stamp BeginString/MsgSeqNum/
    /// SendingTime, and verify required fields are populated.
    pub fn prepare_send(&mut self, message: &mut Message) -> Result<(), FixError> {
        self.send_seqno += 1;
        message.set(8u32, self.config.protocol_version.clone());
        message.set(34u32, self.send_seqno.to_string());
        message.set(52u32, Utc::now().format("%Y%m%d-%H:%M:%S").to_string());

        for &tag in &self.config.required_fields {
            if tag == 9 || tag == 10 {
                continue;
            }
            match message.get_str(tag) {
                Some(v) if !v.is_empty() => {}
                _ => return Err(FixError::Data(tag)),
            }
        }

        self.last_send_time = Instant::now();
        self.message_sent_count += 1;
        debug!(seqno = self.send_seqno, msg_type = ?message.msg_type(), "prepared outbound message");
        Ok(())
    }

    /// Feed inbound bytes to the parser and run session-level validation
    /// and admin-message handling on every decoded message.
    pub fn on_data_received(&mut self, data: &[u8]) -> Vec<SessionEvent> {
        let parser_events = self.parser.on_data_received(data);
        let mut out = Vec::new();
        for event in parser_events {
            match event {
                ParserEvent::Message {
                    message,
                    body_length,
                    checksum,
                } => match self.validate_and_handle(message, body_length, checksum) {
                    Ok(events) => out.extend(events),
                    Err(err) => {
                        warn!(error = %err, "session validation failed");
                        out.push(SessionEvent::Error(err));
                    }
                },
                ParserEvent::Error(err) => {
                    warn!(error = %err, "parse error");
                    out.push(SessionEvent::Error(err));
                }
            }
        }
        out
    }

    fn validate_and_handle(
        &mut self,
        message: Message,
        body_length: usize,
        checksum: u32,
    ) -> Result<Vec<SessionEvent>, FixError> {
        for &tag in &self.config.required_fields {
            match message.get_str(tag) {
                Some(v) if !v.is_empty() => {}
                _ => return Err(FixError::Data(tag)),
            }
        }
        if message.get_str(8) != Some(self.config.protocol_version.as_str()) {
            return Err(FixError::Data(8));
        }
        let declared_len: usize = message
            .get_str(9)
            .and_then(|v| v.parse().ok())
            .ok_or(FixError::Data(9))?;
        if declared_len != body_length {
            return Err(FixError::Data(9));
        }
        let declared_checksum: u32 = message
            .get_str(10)
            .and_then(|v| v.parse().ok())
            .ok_or(FixError::Data(10))?;
        if declared_checksum != checksum {
            return Err(FixError::Data(10));
        }

        self.last_receive_time = Instant::now();

        let msg_type = message.get_str(35).unwrap_or("").to_string();
        let mut out = Vec::new();

        if msg_type == codec::FixMsgType::Heartbeat.as_str() {
            if let Some(test_req_id) = message.get_str(112) {
                if self.pending_testrequest_id.as_deref() == Some(test_req_id) {
                    self.pending_testrequest_id = None;
                    self.pending_testrequest_sent_at = None;
                }
            }
        } else if msg_type == codec::FixMsgType::TestRequest.as_str() {
            let id = message.get_str(112).unwrap_or("").to_string();
            let reply = codec::build_heartbeat(
                Some(&id),
                &self.config.sender_compid,
                &self.config.target_compid,
            );
            out.push(SessionEvent::Outbound(reply));
        }

        let is_heartbeat_family = matches!(msg_type.as_str(), "0" | "1");
        if !(self.config.filter_heartbeat && is_heartbeat_family) {
            out.push(SessionEvent::Inbound(message));
        }

        Ok(out)
    }

    /// Check liveness and, if warranted, return a Heartbeat or TestRequest
    /// to send. Returns `Err(Timeout)` if an outstanding TestRequest has
    /// gone unanswered for more than twice the heartbeat interval.
    pub fn on_timer_tick(&mut self) -> Result<Option<Message>, FixError> {
        if self.config.heartbeat_interval_secs == 0 {
            return Ok(None);
        }
        let interval = Duration::from_secs(self.config.heartbeat_interval_secs);
        let now = Instant::now();

        if let Some(sent_at) = self.pending_testrequest_sent_at {
            if now.duration_since(sent_at) > interval * 2 {
                return Err(FixError::Timeout("test request unanswered".to_string()));
            }
        }

        if now.duration_since(self.last_send_time) > interval {
            let hb = codec::build_heartbeat(None, &self.config.sender_compid, &self.config.target_compid);
            info!("sending heartbeat");
            return Ok(Some(hb));
        }

        if now.duration_since(self.last_receive_time) > interval {
            let id = format!("TR{}", Utc::now().format("%Y%m%d-%H:%M:%S%.f"));
            let tr = codec::build_test_request(&id, &self.config.sender_compid, &self.config.target_compid);
            self.pending_testrequest_id = Some(id);
            self.pending_testrequest_sent_at = Some(now);
            info!("sending test request");
            return Ok(Some(tr));
        }

        Ok(None)
    }
}
