use std::io;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Could not resolve endpoint {0}")]
    Resolve(String),
    #[error("Connection to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    #[error("Transport is not connected")]
    NotConnected,
    #[error("Write failed: {0}")]
    Write(#[source] io::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
