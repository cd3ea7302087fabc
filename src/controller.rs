//! Test controller framework: owns server/client endpoints, drives the test
//! body on a worker thread, and coordinates cancellation and shutdown.

use crate::error::FixError;
use crate::transport::{ServerFactory, Transport};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Why a test body returned without completing normally.
#[derive(Debug)]
pub enum TestFailure {
    AssertFailed(String),
    Interrupted,
    Timeout(String),
    Exception(String),
}

impl From<FixError> for TestFailure {
    fn from(err: FixError) -> Self {
        match err {
            FixError::Interrupted => TestFailure::Interrupted,
            FixError::Timeout(t) => TestFailure::Timeout(t),
            other => TestFailure::Exception(other.to_string()),
        }
    }
}

impl TestFailure {
    /// The `test_status` string form, e.g. `"fail: timeout: test request unanswered"`.
    pub fn status_string(&self) -> String {
        match self {
            TestFailure::AssertFailed(msg) => format!("fail: assert failed: {msg}"),
            TestFailure::Interrupted => "fail: test cancelled".to_string(),
            TestFailure::Timeout(msg) => format!("fail: timeout: {msg}"),
            TestFailure::Exception(msg) => format!("fail: exception: {msg}"),
        }
    }
}

/// A client endpoint's lifecycle bookkeeping, polled by
/// `wait_for_client_connections`.
#[derive(Clone)]
pub struct ClientRecord {
    pub host: String,
    pub port: u16,
    pub connected: Arc<AtomicBool>,
    pub error: Arc<Mutex<Option<String>>>,
    pub transport: Arc<Mutex<Option<Transport>>>,
}

impl ClientRecord {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connected: Arc::new(AtomicBool::new(false)),
            error: Arc::new(Mutex::new(None)),
            transport: Arc::new(Mutex::new(None)),
        }
    }
}

/// A server endpoint's lifecycle bookkeeping, polled by
/// `wait_for_server_connections`.
#[derive(Clone)]
pub struct ServerRecord {
    pub port: u16,
    pub factory: Arc<ServerFactory>,
}

impl ServerRecord {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            factory: Arc::new(ServerFactory::new()),
        }
    }
}

/// Implemented by a concrete test case. Mirrors the `setup` / `run` /
/// `teardown` lifecycle; `pre_test` is a boolean gate checked first.
pub trait TestCaseController: Send {
    fn testcase_id(&self) -> &str;
    fn description(&self) -> &str;

    fn servers(&self) -> HashMap<String, ServerRecord> {
        HashMap::new()
    }
    fn clients(&self) -> HashMap<String, ClientRecord> {
        HashMap::new()
    }

    fn pre_test(&mut self) -> bool {
        true
    }
    fn setup(&mut self) -> Result<(), TestFailure> {
        Ok(())
    }
    fn run(&mut self) -> Result<(), TestFailure>;
    fn teardown(&mut self) -> Result<(), TestFailure> {
        Ok(())
    }
}

/// Runs a [`TestCaseController`]'s lifecycle and tracks the resulting
/// status string and process exit code, matching the source's taxonomy.
pub struct ControllerRunner {
    cancelled: Arc<AtomicBool>,
}

impl ControllerRunner {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// `pre_test` -> `setup` -> `run` -> `teardown`, producing a
    /// `(test_status, exit_code)` pair exactly as the source's
    /// `_execute_test` would.
    pub fn execute_test(&self, controller: &mut dyn TestCaseController) -> (String, i32) {
        if !controller.pre_test() {
            return ("test: skipped".to_string(), 0);
        }

        info!(testcase = controller.testcase_id(), "test: in-progress");

        let outcome = (|| -> Result<(), TestFailure> {
            controller.setup()?;
            controller.run()?;
            controller.teardown()?;
            Ok(())
        })();

        match outcome {
            Ok(()) => ("ok".to_string(), 0),
            Err(failure) => {
                error!(testcase = controller.testcase_id(), status = %failure.status_string(), "test failed");
                (failure.status_string(), 1)
            }
        }
    }

    /// Set the cancellation flag, cancel every client/server transport so
    /// blocked `wait_for_message` calls unblock with `Interrupted`.
    pub fn cancel_test(&self, clients: &HashMap<String, ClientRecord>, servers: &HashMap<String, ServerRecord>) {
        self.cancelled.store(true, Ordering::SeqCst);
        for client in clients.values() {
            if let Some(t) = client.transport.lock().unwrap().as_ref() {
                t.cancel();
            }
        }
        for server in servers.values() {
            server.factory.cancel_all();
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Poll (5Hz, matching the source) until every client is connected or
    /// `timeout` elapses; fail fast on a recorded connection error.
    pub fn wait_for_client_connections(
        &self,
        clients: &HashMap<String, ClientRecord>,
        timeout: Duration,
    ) -> Result<(), TestFailure> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_cancelled() {
                return Err(TestFailure::Interrupted);
            }
            for client in clients.values() {
                if let Some(err) = client.error.lock().unwrap().clone() {
                    return Err(TestFailure::Exception(err));
                }
            }
            if clients.values().all(|c| c.connected.load(Ordering::SeqCst)) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(TestFailure::Timeout("client connections".to_string()));
            }
            std::thread::sleep(Duration::from_millis(200));
        }
    }

    /// Poll (5Hz) until every server has accepted at least one connection
    /// or `timeout` elapses.
    pub fn wait_for_server_connections(
        &self,
        servers: &HashMap<String, ServerRecord>,
        timeout: Duration,
    ) -> Result<(), TestFailure> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_cancelled() {
                return Err(TestFailure::Interrupted);
            }
            if servers.values().all(|s| s.factory.server_count() > 0) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(TestFailure::Timeout("server connections".to_string()));
            }
            std::thread::sleep(Duration::from_millis(200));
        }
    }
}

impl Default for ControllerRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubController {
        pre_test_result: bool,
        run_result: Result<(), TestFailure>,
        teardown_called: bool,
    }

    impl TestCaseController for StubController {
        fn testcase_id(&self) -> &str {
            "stub"
        }
        fn description(&self) -> &str {
            "a stub controller for runner tests"
        }
        fn pre_test(&mut self) -> bool {
            self.pre_test_result
        }
        fn run(&mut self) -> Result<(), TestFailure> {
            std::mem::replace(&mut self.run_result, Ok(()))
        }
        fn teardown(&mut self) -> Result<(), TestFailure> {
            self.teardown_called = true;
            Ok(())
        }
    }

    #[test]
    fn execute_test_runs_full_lifecycle_on_success() {
        let mut controller = StubController {
            pre_test_result: true,
            run_result: Ok(()),
            teardown_called: false,
        };
        let runner = ControllerRunner::new();
        let (status, code) = runner.execute_test(&mut controller);
        assert_eq!(status, "ok");
        assert_eq!(code, 0);
        assert!(controller.teardown_called);
    }

    #[test]
    fn execute_test_skips_when_pre_test_fails() {
        let mut controller = StubController {
            pre_test_result: false,
            run_result: Ok(()),
            teardown_called: false,
        };
        let runner = ControllerRunner::new();
        let (status, code) = runner.execute_test(&mut controller);
        assert_eq!(status, "test: skipped");
        assert_eq!(code, 0);
        assert!(!controller.teardown_called);
    }

    #[test]
    fn execute_test_reports_failure_status_string_and_skips_teardown_rerun() {
        let mut controller = StubController {
            pre_test_result: true,
            run_result: Err(TestFailure::Timeout("no data".to_string())),
            teardown_called: false,
        };
        let runner = ControllerRunner::new();
        let (status, code) = runner.execute_test(&mut controller);
        assert_eq!(status, "fail: timeout: no data");
        assert_eq!(code, 1);
        assert!(!controller.teardown_called);
    }

    #[test]
    fn wait_for_client_connections_times_out_when_none_connect() {
        let clients = HashMap::from([("c1".to_string(), ClientRecord::new("127.0.0.1", 9000))]);
        let runner = ControllerRunner::new();
        let result = runner.wait_for_client_connections(&clients, Duration::from_millis(100));
        assert!(matches!(result, Err(TestFailure::Timeout(_))));
    }

    #[test]
    fn wait_for_server_connections_succeeds_once_a_connection_is_recorded() {
        let servers = HashMap::from([("s1".to_string(), ServerRecord::new(9000))]);
        let runner = ControllerRunner::new();
        assert!(matches!(
            runner.wait_for_server_connections(&servers, Duration::from_millis(50)),
            Err(TestFailure::Timeout(_))
        ));
    }
}

/// Install SIGINT/SIGTERM/SIGHUP/SIGQUIT handlers that call `cancel_test`
/// on the given runner. Must be called from within a running tokio runtime.
pub fn install_signal_handlers(
    runner: Arc<ControllerRunner>,
    clients: HashMap<String, ClientRecord>,
    servers: HashMap<String, ServerRecord>,
) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        for kind in [SignalKind::interrupt(), SignalKind::terminate(), SignalKind::hangup(), SignalKind::quit()] {
            let runner = runner.clone();
            let clients = clients.clone();
            let servers = servers.clone();
            tokio::spawn(async move {
                if let Ok(mut sig) = signal(kind) {
                    sig.recv().await;
                    warn!("signal received, cancelling test");
                    runner.cancel_test(&clients, &servers);
                }
            });
        }
    }
}
