use thiserror::Error;

pub type Result<T> = std::result::Result<T, TalentError>;

#[derive(Error, Debug)]
pub enum TalentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Malformed stored vector for resume {id}: {reason}")]
    MalformedStoredVector { id: i64, reason: String },

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Invalid resume: {0}")]
    InvalidResume(String),

    #[error("Search query cannot be empty")]
    EmptyQuery,

    #[error("Resume not found: {0}")]
    NotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod generation;
pub mod indexer;
pub mod search;
