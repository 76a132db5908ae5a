use thiserror::Error;

use crate::ride::RideId;

#[derive(Error, Debug, PartialEq)]
pub enum HeapError {
    #[error("Full priority index is at capacity ({capacity})")]
    Full { capacity: usize },
    #[error("DuplicateKey key is already queued")]
    DuplicateKey,
}

#[derive(Error, Debug, PartialEq)]
pub enum TreeError {
    #[error("DuplicateKey key already exists in the ordered index")]
    DuplicateKey,
    #[error("ArenaFull ordered index has no free node ids")]
    ArenaFull,
}

#[derive(Error, Debug, PartialEq)]
pub enum RepositoryError {
    #[error("DuplicateRide ride {0} already exists")]
    DuplicateRide(RideId),
    #[error("CapacityExhausted no room for more pending rides (capacity {capacity})")]
    CapacityExhausted { capacity: usize },
}

impl RepositoryError {
    /// A duplicate ride number is an unrecoverable usage error; the caller
    /// must not keep feeding commands after it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RepositoryError::DuplicateRide(_))
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("DuplicateRide ride {0} already exists, processing halted")]
    DuplicateRide(RideId),
    #[error("Io couldn't write to output: {0}")]
    Io(#[from] std::io::Error),
    #[error("Json couldn't encode result: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ServiceError::DuplicateRide(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("InvalidConfig couldn't read configuration from environment: {0}")]
    Env(#[from] envy::Error),
}
