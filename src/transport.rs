//! Transport adapter: bridges the session engine and a per-connection
//! [`MessageQueue`] to a byte-oriented socket, on the async event-loop side.

use crate::codec::FixMsgType;
use crate::error::FixError;
use crate::message::Message;
use crate::queue::MessageQueue;
use crate::session::{Session, SessionConfig, SessionEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Connection lifecycle state, observed by the controller's polling waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connected,
    Closed,
}

/// Commands accepted from the test thread via a blocking channel send.
pub enum TransportCommand {
    Send(Message),
    Stop,
}

/// The live handle a test body holds for one connection: an outbound
/// command sender and the inbound message queue.
pub struct Transport {
    cmd_tx: mpsc::Sender<TransportCommand>,
    pub inbound: Arc<MessageQueue>,
    state: Arc<std::sync::Mutex<ConnState>>,
    last_error: Arc<std::sync::Mutex<Option<String>>>,
    order_seq: Arc<AtomicU64>,
    conn_name: String,
}

impl Transport {
    pub fn state(&self) -> ConnState {
        *self.state.lock().unwrap()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    /// Post an outbound message from the test thread. Blocks the calling
    /// OS thread until the event loop accepts it onto its queue.
    pub fn send_message(&self, message: Message) -> Result<(), FixError> {
        self.cmd_tx
            .blocking_send(TransportCommand::Send(message))
            .map_err(|_| FixError::ChannelClosed)
    }

    pub fn stop(&self) {
        let _ = self.cmd_tx.blocking_send(TransportCommand::Stop);
    }

    /// Cancel this connection's inbound queue, unblocking any in-progress
    /// `wait_for_message`.
    pub fn cancel(&self) {
        self.inbound.cancel();
    }

    /// `"<conn_name>/<YYYYMMDD>/<counter>"`, monotonically increasing.
    pub fn next_order_id(&self) -> String {
        let n = self.order_seq.fetch_add(1, Ordering::SeqCst);
        let today = chrono::Utc::now().format("%Y%m%d");
        format!("{}/{}/{}", self.conn_name, today, n)
    }
}

/// Drive one accepted/dialed TCP connection: read bytes into the session,
/// forward validated inbound messages to the queue, send outbound
/// messages and heartbeats, and tick the liveness timer.
///
/// Returns a `Transport` handle immediately; the event loop runs on a
/// spawned task for the lifetime of the connection.
pub fn spawn_connection(conn_name: String, stream: TcpStream, session_config: SessionConfig) -> Transport {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<TransportCommand>(256);
    let inbound = Arc::new(MessageQueue::new());
    let state = Arc::new(std::sync::Mutex::new(ConnState::Connected));
    let last_error = Arc::new(std::sync::Mutex::new(None));
    let order_seq = Arc::new(AtomicU64::new(1));

    let transport = Transport {
        cmd_tx,
        inbound: inbound.clone(),
        state: state.clone(),
        last_error: last_error.clone(),
        order_seq,
        conn_name: conn_name.clone(),
    };

    tokio::spawn(async move {
        let mut session = Session::new(session_config);
        let (mut read_half, mut write_half) = stream.into_split();
        let mut read_buf = [0u8; 4096];
        let heartbeat_secs = 1u64;
        let mut ticker = tokio::time::interval(Duration::from_secs(heartbeat_secs));

        loop {
            tokio::select! {
                read_result = read_half.read(&mut read_buf) => {
                    match read_result {
                        Ok(0) => {
                            info!(conn = %conn_name, "peer closed connection");
                            *state.lock().unwrap() = ConnState::Closed;
                            break;
                        }
                        Ok(n) => {
                            for event in session.on_data_received(&read_buf[..n]) {
                                match event {
                                    SessionEvent::Inbound(msg) => {
                                        if is_heartbeat_family(&msg) {
                                            debug!(conn = %conn_name, "suppressing heartbeat-family message at transport layer");
                                        } else {
                                            inbound.add(msg);
                                        }
                                    }
                                    SessionEvent::Outbound(mut msg) => {
                                        if let Err(e) = session.prepare_send(&mut msg) {
                                            warn!(error = %e, "auto-reply prepare_send failed");
                                            continue;
                                        }
                                        if let Err(e) = write_message(&mut write_half, &mut msg).await {
                                            error!(error = %e, "write failed");
                                            *last_error.lock().unwrap() = Some(e.to_string());
                                        }
                                    }
                                    SessionEvent::Error(err) => {
                                        warn!(conn = %conn_name, error = %err, "fatal session error");
                                        *last_error.lock().unwrap() = Some(err.to_string());
                                        *state.lock().unwrap() = ConnState::Closed;
                                        inbound.cancel();
                                        return;
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            error!(conn = %conn_name, error = %e, "read error");
                            *last_error.lock().unwrap() = Some(e.to_string());
                            *state.lock().unwrap() = ConnState::Closed;
                            inbound.cancel();
                            break;
                        }
                    }
                }
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(TransportCommand::Send(mut msg)) => {
                            if let Err(e) = session.prepare_send(&mut msg) {
                                warn!(error = %e, "prepare_send failed");
                                continue;
                            }
                            if let Err(e) = write_message(&mut write_half, &mut msg).await {
                                error!(error = %e, "write failed");
                                *last_error.lock().unwrap() = Some(e.to_string());
                            }
                        }
                        Some(TransportCommand::Stop) | None => {
                            *state.lock().unwrap() = ConnState::Closed;
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    match session.on_timer_tick() {
                        Ok(Some(mut msg)) => {
                            if session.prepare_send(&mut msg).is_ok() {
                                let _ = write_message(&mut write_half, &mut msg).await;
                            }
                        }
                        Ok(None) => {}
                        Err(err) => {
                            warn!(conn = %conn_name, error = %err, "heartbeat timeout");
                            *last_error.lock().unwrap() = Some(err.to_string());
                            *state.lock().unwrap() = ConnState::Closed;
                            inbound.cancel();
                            break;
                        }
                    }
                }
            }
        }
        debug!(conn = %conn_name, "connection loop ended");
    });

    transport
}

async fn write_message(write_half: &mut tokio::net::tcp::OwnedWriteHalf, msg: &mut Message) -> std::io::Result<()> {
    let bytes = crate::codec::encode(msg, None, None)?;
    write_half.write_all(&bytes).await
}

/// Heartbeat and TestRequest are always kept off the test-facing queue,
/// independent of the session's own `filter_heartbeat` setting (which only
/// controls whether they're visible to the session-level event stream).
fn is_heartbeat_family(msg: &Message) -> bool {
    matches!(msg.get_str(35), Some(t) if t == FixMsgType::Heartbeat.as_str() || t == FixMsgType::TestRequest.as_str())
}

/// Accepts inbound TCP connections for a server role and tracks the
/// resulting transports so a controller can wait for them to appear.
pub struct ServerFactory {
    pub connections: Arc<std::sync::Mutex<Vec<Transport>>>,
}

impl ServerFactory {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn server_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    pub fn cancel_all(&self) {
        for t in self.connections.lock().unwrap().iter() {
            t.cancel();
        }
    }
}

impl Default for ServerFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use tokio::net::TcpListener;

    async fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (accept_result, connect_result) = tokio::join!(listener.accept(), TcpStream::connect(addr));
        (accept_result.unwrap().0, connect_result.unwrap())
    }

    fn test_config(filter_heartbeat: bool) -> SessionConfig {
        SessionConfig::builder()
            .protocol_version("FIX.4.2")
            .sender_compid("server")
            .target_compid("client")
            .required_fields(vec![8, 9, 35])
            .header_fields(vec![8, 9, 35])
            .filter_heartbeat(filter_heartbeat)
            .build()
    }

    fn encode_msg(msg_type: &str) -> Vec<u8> {
        let mut msg = Message::with_header_fields(&[8, 9, 35]);
        msg.set(8u32, "FIX.4.2");
        msg.set(35u32, msg_type);
        crate::codec::encode(&mut msg, None, None).unwrap().to_vec()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn heartbeat_is_suppressed_even_when_session_filter_is_disabled() {
        let (server_stream, mut client_stream) = loopback_pair().await;
        let transport = spawn_connection("test-conn".to_string(), server_stream, test_config(false));

        client_stream.write_all(&encode_msg(FixMsgType::Heartbeat.as_str())).await.unwrap();

        let result = transport.inbound.wait_for_message("test", Duration::from_millis(300));
        assert!(matches!(result, Err(FixError::Timeout(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_request_is_suppressed_even_when_session_filter_is_disabled() {
        let (server_stream, mut client_stream) = loopback_pair().await;
        let transport = spawn_connection("test-conn".to_string(), server_stream, test_config(false));

        client_stream.write_all(&encode_msg(FixMsgType::TestRequest.as_str())).await.unwrap();

        let result = transport.inbound.wait_for_message("test", Duration::from_millis(300));
        assert!(matches!(result, Err(FixError::Timeout(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn non_heartbeat_message_still_reaches_the_inbound_queue() {
        let (server_stream, mut client_stream) = loopback_pair().await;
        let transport = spawn_connection("test-conn".to_string(), server_stream, test_config(false));

        client_stream.write_all(&encode_msg(FixMsgType::Logon.as_str())).await.unwrap();

        let msg = transport
            .inbound
            .wait_for_message("test", Duration::from_millis(500))
            .unwrap();
        assert_eq!(msg.get_str(35), Some("A"));
    }
}
