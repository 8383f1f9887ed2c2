/// Startup errors. Everything after a successful bind is handled per
/// session and never tears down the process.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("config file {path}: {reason}")]
    Config { path: String, reason: String },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
