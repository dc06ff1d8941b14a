use mrfcore::error::MrfError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("unsupported results file version {0}")]
    Version(u32),

    #[error(transparent)]
    Mrf(#[from] MrfError),
}

pub type Result<T> = std::result::Result<T, IoError>;
