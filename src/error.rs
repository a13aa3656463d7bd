#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("substrate I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session {0} not found")]
    UnknownSession(String),

    #[error("session {0} already exists")]
    DuplicateSession(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
