use crate::model::TargetId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid target URL: {0}")]
    InvalidUrl(String),

    #[error("Target {0} not found")]
    NotFound(TargetId),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Target {0} not found")]
    NotFound(TargetId),

    #[error("Target {0} is already being analyzed")]
    AlreadyRunning(TargetId),

    #[error("Target {0} is not running")]
    NotRunning(TargetId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;
