use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    Conflict { kind: &'static str, id: String },

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn flavor_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "Flavor",
            id: id.into(),
        }
    }

    pub fn flavor_conflict(id: impl Into<String>) -> Self {
        Error::Conflict {
            kind: "Flavor",
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
