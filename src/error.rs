use thiserror::Error;

/// Error taxonomy for the wire codec, session engine, transport, and
/// controller layers.
#[derive(Debug, Error)]
pub enum FixError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("message length exceeded max_length")]
    LengthExceeded,

    #[error("binary field length exceeded max_length")]
    BinaryLengthExceeded,

    #[error("data error on tag {0}")]
    Data(u32),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("interrupted")]
    Interrupted,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("channel closed")]
    ChannelClosed,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FixError {
    pub fn parse(msg: impl Into<String>) -> Self {
        FixError::Parse(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, FixError>;
