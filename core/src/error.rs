use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An execution was ticked before `init` bound it to the world.
    /// This is a sequencing bug in the driver, never a game condition.
    #[error("Execution '{execution}' ticked before init")]
    NotInitialized { execution: &'static str },

    /// A uniform pick was requested from an empty sequence.
    #[error("Random selection from empty sequence: {context}")]
    EmptySelection { context: &'static str },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
