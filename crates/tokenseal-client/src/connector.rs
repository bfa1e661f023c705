//! Connection acquisition.
//!
//! The orchestrator never opens sockets itself: it asks a [`Connector`] for a
//! [`Channel`], which frames tokens and can be closed explicitly. Tests swap
//! in in-memory channels.

use std::{
    io,
    net::{Shutdown, TcpStream, ToSocketAddrs},
};

use tokenseal_proto::{Framed, TokenTransport};

use crate::config::SessionConfig;

/// A token transport the orchestrator can close.
pub trait Channel: TokenTransport {
    /// Close the connection. Further sends and receives fail.
    fn close(&mut self) -> io::Result<()>;
}

/// Opens channels to the configured server.
pub trait Connector {
    /// Channel type produced.
    type Channel: Channel;

    /// Open a channel to `config.host:config.port`.
    fn connect(&mut self, config: &SessionConfig) -> io::Result<Self::Channel>;
}

/// TCP connector honoring the configured timeouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Channel = Framed<TcpStream>;

    fn connect(&mut self, config: &SessionConfig) -> io::Result<Self::Channel> {
        let mut last_err = None;

        for addr in (config.host.as_str(), config.port).to_socket_addrs()? {
            let attempt = match config.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };

            match attempt {
                Ok(stream) => {
                    stream.set_read_timeout(config.io_timeout)?;
                    stream.set_write_timeout(config.io_timeout)?;
                    stream.set_nodelay(true)?;

                    tracing::debug!(%addr, "connected");
                    return Ok(Framed::new(stream).with_max_token_size(config.max_token_size));
                },
                Err(err) => {
                    tracing::debug!(%addr, %err, "connect attempt failed");
                    last_err = Some(err);
                },
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
        }))
    }
}

impl Channel for Framed<TcpStream> {
    fn close(&mut self) -> io::Result<()> {
        match self.get_ref().shutdown(Shutdown::Both) {
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread,
        time::Duration,
    };

    use super::*;

    #[test]
    fn tcp_channel_frames_tokens() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let peer = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut frame = [0u8; 7];
            stream.read_exact(&mut frame).unwrap();
            stream.write_all(&frame).unwrap();
            frame
        });

        let config = SessionConfig {
            host: "127.0.0.1".to_string(),
            port,
            io_timeout: Some(Duration::from_secs(5)),
            ..SessionConfig::default()
        };
        let mut channel = TcpConnector.connect(&config).unwrap();
        channel.send_token(b"abc").unwrap();
        let echoed = channel.recv_token().unwrap();
        channel.close().unwrap();

        assert_eq!(peer.join().unwrap(), [0, 0, 0, 3, b'a', b'b', b'c']);
        assert_eq!(echoed.as_bytes(), b"abc");
    }

    #[test]
    fn refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = SessionConfig {
            host: "127.0.0.1".to_string(),
            port,
            connect_timeout: Some(Duration::from_secs(1)),
            ..SessionConfig::default()
        };
        assert!(TcpConnector.connect(&config).is_err());
    }

    #[test]
    fn close_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = SessionConfig { host: "127.0.0.1".to_string(), port, ..SessionConfig::default() };

        let mut channel = TcpConnector.connect(&config).unwrap();
        let _accepted = listener.accept().unwrap();

        channel.close().unwrap();
        channel.close().unwrap();
    }
}
