use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No supported browser found on this system")]
    NoBrowserFound,

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("No browser session is running")]
    NotRunning,

    #[error("Automation protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Protocol(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
