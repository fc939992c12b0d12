use thiserror::Error;

/// Failures talking to the REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot carry path segments: {0}")]
    NotABase(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// Failures on the push socket.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("invalid push url: {0}")]
    Url(#[from] url::ParseError),
    #[error("unsupported push url scheme: {0}")]
    Scheme(String),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed packet: {0}")]
    Protocol(String),
    #[error("no frame from the server within {0:?}")]
    Silent(std::time::Duration),
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config directory available")]
    NoConfigDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
