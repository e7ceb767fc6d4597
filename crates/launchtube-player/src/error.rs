use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to launch player: {0}")]
    Launch(String),

    #[error("No player is running")]
    NotRunning,

    #[error("Player protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
