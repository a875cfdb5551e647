use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitvaultError {
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Config(ConfigError),
    #[error("{0}")]
    Store(StoreError),
    #[error("a backup cycle is already running")]
    Busy,
    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parse config: {0}")]
    Parse(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("mapping {0} not found")]
    NotFound(String),
    #[error("repo subdirectory {0:?} is already used by mapping {1}")]
    DuplicateSubdir(String, String),
    #[error("parse store: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, GitvaultError>;

impl GitvaultError {
    pub fn message(msg: impl Into<String>) -> Self {
        GitvaultError::Message(msg.into())
    }
}

impl From<ConfigError> for GitvaultError {
    fn from(err: ConfigError) -> Self {
        GitvaultError::Config(err)
    }
}

impl From<StoreError> for GitvaultError {
    fn from(err: StoreError) -> Self {
        GitvaultError::Store(err)
    }
}
