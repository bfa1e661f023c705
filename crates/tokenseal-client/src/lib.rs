//! Tokenseal client.
//!
//! Opens a connection, establishes a security context with a named service,
//! sends one protected message and verifies the signature block the server
//! returns for it.
//!
//! ## Architecture
//!
//! ```text
//! tokenseal-client
//!   ├─ Session       (orchestrator: connect, negotiate, protect, verify)
//!   ├─ TcpConnector  (framed TCP channels with timeouts)
//!   ├─ SystemEnv     (production Environment impl)
//!   └─ PskProvider   (from tokenseal-core)
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod connector;
mod error;
mod session;
mod system_env;

pub use config::{DEFAULT_PORT, PayloadSource, SessionConfig, SessionRequest, load_psk_file};
pub use connector::{Channel, Connector, TcpConnector};
pub use error::{ConfigError, SessionError};
pub use session::{Session, SessionOutcome, SessionState};
pub use system_env::SystemEnv;
