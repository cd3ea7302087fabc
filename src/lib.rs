#![doc = include_str!("../README.md")]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod codec;
pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod message;
pub mod messages;
pub mod parser;
pub mod queue;
pub mod session;
pub mod transport;

pub use codec::{FixMsgType, SOH};
pub use config::{ControllerConfig, Link, Role, Section};
pub use controller::{install_signal_handlers, ClientRecord, ControllerRunner, ServerRecord, TestCaseController, TestFailure};
pub use error::{FixError, Result};
pub use message::{FieldValue, Message};
pub use queue::MessageQueue;
pub use session::{Session, SessionConfig};
pub use transport::{ConnState, Transport};
