// reolink-api: Async Rust client for the Reolink camera CGI command protocol

pub mod command;
pub mod connection;
pub mod crypto;
pub mod error;
pub mod error_code;
pub mod models;
pub mod security;
pub mod transport;

pub use command::{Action, CommandRequest, CommandResponse, ResponseError};
pub use connection::{Anonymous, Connection, ConnectionState, TokenProvider, API_PATH};
pub use crypto::{Cipher, DigestChallenge, DigestResponse};
pub use error::Error;
pub use error_code::ErrorCode;
pub use security::{AuthState, Security};
pub use transport::{TlsMode, TransportConfig};
