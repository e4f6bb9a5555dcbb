use crate::model::NodeId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Invalid edge endpoints: {from} -> {to}")]
    InvalidEndpoint { from: NodeId, to: NodeId },

    #[error("Unknown node: {id}")]
    UnknownNode { id: NodeId },

    #[error("Unknown connection: {id}")]
    UnknownEdge { id: u64 },

    #[error("{message}")]
    InvalidAttributes { message: String },

    #[error("You must be logged in to update markers")]
    AuthenticationRequired,

    #[error("Remote store unavailable: {message}")]
    RemoteUnavailable { message: String },

    #[error("Session expired")]
    SessionExpired,

    #[error("Map resource failed to load: {message}")]
    ResourceLoadFailed { message: String },

    #[error("Please wait for the map to load")]
    MapNotReady,

    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

/// Machine-readable failure reported by a [`TopologyBackend`](crate::sync::TopologyBackend).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("rejected with status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    #[error("unavailable: {message}")]
    Unavailable { message: String },
}

impl From<RemoteError> for Error {
    fn from(value: RemoteError) -> Self {
        match value {
            RemoteError::Unauthorized => Error::SessionExpired,
            other => Error::RemoteUnavailable {
                message: other.to_string(),
            },
        }
    }
}
