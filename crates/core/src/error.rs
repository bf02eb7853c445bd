use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassdexError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("MSGPACK encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("MSGPACK decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Classpath scan failed: {0}")]
    ScanFailed(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ClassdexError>;
