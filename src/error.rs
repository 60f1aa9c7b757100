use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("configuration file not found in '{0}'")]
    NotFound(PathBuf),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures surfaced by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("document violates a unique key in '{collection}'")]
    Duplicate { collection: String },
    #[error(transparent)]
    Serialize(#[from] bson::ser::Error),
    #[error(transparent)]
    Deserialize(#[from] bson::de::Error),
    #[error(transparent)]
    Backend(mongodb::error::Error),
}

impl StoreError {
    /// Names the collection a duplicate key was reported for.
    pub fn in_collection(self, name: &str) -> StoreError {
        match self {
            StoreError::Duplicate { .. } => StoreError::Duplicate {
                collection: name.to_string(),
            },
            other => other,
        }
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, WriteFailure};

        match e.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == 11000 => {
                StoreError::Duplicate {
                    collection: String::from("unknown"),
                }
            }
            ErrorKind::Io(_)
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::ServerSelection { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
            | ErrorKind::Authentication { .. } => StoreError::Unavailable(e.to_string()),
            _ => StoreError::Backend(e),
        }
    }
}

/// Reasons a bearer token can be refused.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("payment provider isn't configured")]
    Unconfigured,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("payment provider rejected the request: {status} {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cors(#[from] rocket_cors::Error),

    // External errors
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
}
