//! Process-level wiring for the fieldtrack server: configuration loading and
//! the HTTP transports that deliver verification links and one-time codes.

pub mod config;
pub mod transport;

pub use config::ServerConfig;
pub use transport::Dispatcher;
