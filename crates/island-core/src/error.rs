//! Error types for the simulation.

use crate::Species;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown species: {0}")]
    UnknownSpecies(String),

    #[error("No profile configured for species {0}")]
    MissingProfile(Species),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker pool is closed")]
    PoolClosed,

    #[error("Timed out waiting for {pending} pending actions")]
    DrainTimeout { pending: usize },

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
