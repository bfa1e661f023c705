//! Session configuration.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use tokenseal_core::{ContextFlags, DEFAULT_MAX_ROUNDS, Oid, psk::PskConfig};
use tokenseal_proto::DEFAULT_MAX_TOKEN_SIZE;

use crate::error::{ConfigError, SessionError};

/// Default server port.
pub const DEFAULT_PORT: u16 = 4444;

/// Connection and negotiation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Server host name or address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Bound on connection establishment (`None` blocks indefinitely)
    pub connect_timeout: Option<Duration>,
    /// Bound on each read and write (`None` blocks indefinitely)
    pub io_timeout: Option<Duration>,
    /// Maximum context-establishment rounds
    pub max_rounds: usize,
    /// Largest token accepted from the server
    pub max_token_size: u32,
}

impl SessionConfig {
    /// `host:port`, for dialing and diagnostics.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: None,
            io_timeout: None,
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_token_size: DEFAULT_MAX_TOKEN_SIZE,
        }
    }
}

/// Where the plaintext comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadSource {
    /// The message itself
    Literal(String),
    /// A file whose contents are the message
    File(PathBuf),
}

impl PayloadSource {
    /// Read the plaintext.
    pub fn load(&self) -> Result<Vec<u8>, SessionError> {
        match self {
            Self::Literal(message) => Ok(message.as_bytes().to_vec()),
            Self::File(path) => fs::read(path)
                .map_err(|source| SessionError::Payload { path: path.clone(), source }),
        }
    }
}

/// One protected exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    /// Target service name (`service@host` or `service`)
    pub service: String,
    /// Requested context flags (replay detection is always added)
    pub flags: ContextFlags,
    /// Mechanism to use, or the provider default
    pub mechanism: Option<Oid>,
    /// Plaintext to protect
    pub payload: PayloadSource,
    /// Request confidentiality for the message
    pub seal: bool,
}

/// Load a hex-encoded pre-shared key for `name`.
///
/// Surrounding whitespace in the file is ignored.
pub fn load_psk_file(path: &Path, name: &str) -> Result<PskConfig, ConfigError> {
    let text = fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    let key = hex::decode(text.trim())
        .map_err(|source| ConfigError::Hex { path: path.to_path_buf(), source })?;
    Ok(PskConfig::new(key, name)?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tokenseal_crypto::CryptoError;

    use super::*;

    #[test]
    fn default_config_values() {
        let config = SessionConfig::default();
        assert_eq!(config.port, 4444);
        assert_eq!(config.max_rounds, 100);
        assert_eq!(config.max_token_size, 16 * 1024 * 1024);
        assert_eq!(config.connect_timeout, None);
    }

    #[test]
    fn literal_payload_is_message_bytes() {
        let payload = PayloadSource::Literal("hello".to_string());
        assert_eq!(payload.load().unwrap(), b"hello");
    }

    #[test]
    fn file_payload_reads_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"from a file\n").unwrap();

        let payload = PayloadSource::File(file.path().to_path_buf());
        assert_eq!(payload.load().unwrap(), b"from a file\n");
    }

    #[test]
    fn missing_payload_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");

        let err = PayloadSource::File(path.clone()).load().unwrap_err();
        assert!(matches!(err, SessionError::Payload { path: ref p, .. } if *p == path));
    }

    #[test]
    fn psk_file_is_hex() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", "ab".repeat(32)).unwrap();

        let config = load_psk_file(file.path(), "client").unwrap();
        assert_eq!(config.name(), "client");
    }

    #[test]
    fn short_psk_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "abcd").unwrap();

        let err = load_psk_file(file.path(), "client").unwrap_err();
        assert!(matches!(err, ConfigError::Key(CryptoError::WeakKey { len: 2, .. })));
    }

    #[test]
    fn non_hex_psk_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not hex at all").unwrap();

        let err = load_psk_file(file.path(), "client").unwrap_err();
        assert!(matches!(err, ConfigError::Hex { .. }));
    }
}
