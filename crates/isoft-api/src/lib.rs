// isoft-api: Async Rust client for the Judo i-soft HTTPS control protocol

pub mod client;
pub mod command;
pub mod error;
pub mod models;
pub mod session;
pub mod tls;
pub mod transport;

pub use client::IsoftClient;
pub use command::{Command, CommandKind};
pub use error::{Error, ErrorKind};
pub use models::{DeviceResponse, Reply, UnitRecord};
pub use session::{Session, SessionState};
pub use transport::{RetryPolicy, TlsMode, Transport, TransportConfig};

/// TCP port the appliance serves its control protocol on.
pub const DEFAULT_PORT: u16 = 8124;
