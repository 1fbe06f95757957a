//! Server error types

use thiserror::Error;

/// Errors that stop the server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to initialize the tracing subscriber
    #[error("failed to initialize tracing subscriber: {0}")]
    Telemetry(String),

    /// Failed to load the TLS certificate or key
    #[error("failed to load TLS configuration: {0}")]
    TlsConfig(String),

    /// Failed to bind the listen address
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that could not be bound
        addr: std::net::SocketAddr,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
