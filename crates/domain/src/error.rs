/// Shared error type for conditions §7 classifies as fatal/propagating:
/// journal write failure, provider failure, and config load failure.
/// Tool- and guardrail-level failures stay data (`{ok:false, error}`),
/// never constructed through this enum.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("journal: {0}")]
    Journal(String),

    #[error("session index: {0}")]
    Index(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("pulse store: {0}")]
    Pulse(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
