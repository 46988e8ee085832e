//! Error types for the elevator.

/// Boxed cause attached to level construction failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while loading levels or moving the lift.
#[derive(Debug, thiserror::Error)]
pub enum ElevatorError {
    /// A required input was malformed.
    #[error("{0}")]
    InvalidArgument(String),

    /// An operation was called in a state that does not allow it.
    #[error("{0}")]
    InvalidState(String),

    /// The progress store points at a level the lift does not know about.
    #[error("Stored level {0} is not registered with the lift")]
    UnknownLevel(i64),

    /// A level definition could not be turned into a level.
    #[error("{message}")]
    LevelConstruction {
        /// Name of the offending definition.
        class: String,
        /// Which requirement failed.
        message: String,
        /// Underlying failure, if construction itself failed.
        #[source]
        source: Option<BoxError>,
    },

    /// Database error in a progress store.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error in a progress store.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Command-line arguments could not be parsed.
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

impl ElevatorError {
    /// Shorthand for [`ElevatorError::InvalidState`].
    pub(crate) fn state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Builds a [`ElevatorError::LevelConstruction`] without a cause.
    pub(crate) fn construction(class: &str, message: String) -> Self {
        Self::LevelConstruction {
            class: class.to_string(),
            message,
            source: None,
        }
    }
}

/// Result type for elevator operations.
pub type Result<T> = std::result::Result<T, ElevatorError>;
