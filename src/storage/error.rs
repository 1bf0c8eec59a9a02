use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Failed to open profile database '{0}'")]
    Open(PathBuf, #[source] rusqlite::Error),

    #[error("Profile query failed")]
    Query(#[from] rusqlite::Error),

    #[error("Failed to create database directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),
}
