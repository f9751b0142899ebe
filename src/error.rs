//! Error types for the bridge

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge error types
///
/// Connection and handshake errors are fatal at startup. Everything else is
/// contained: a protocol error aborts the current command sequence, a frame
/// decode error drops the stream buffer, a socket error terminates only the
/// owning worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A channel in the set failed to open
    #[error("connection failed: {0}")]
    Connection(String),

    /// Malformed or version-mismatched handshake response
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Malformed or version-mismatched response packet
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Malformed frame body on a continuous stream
    #[error("frame decode error: {0}")]
    FrameDecode(String),

    /// I/O error on a socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed inbound control-message arguments
    #[error("invalid control arguments: {0}")]
    Argument(String),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file parse error
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// OSC encode/decode error
    #[error("OSC error: {0}")]
    Osc(String),
}
