use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("missing required settings: {}", .0.join(", "))]
    MissingSettings(Vec<String>),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("failed to {action}: {source}")]
    Io {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("reply generation failed: {0}")]
    Generation(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("a run is already in progress")]
    RunInProgress,
}

impl MonitorError {
    pub fn io(action: impl Into<String>, source: std::io::Error) -> Self {
        MonitorError::Io {
            action: action.into(),
            source,
        }
    }

    pub fn parse(what: impl Into<String>, message: impl ToString) -> Self {
        MonitorError::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }
}
