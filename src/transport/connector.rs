use std::fmt;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info};

use super::error::TransportError;

/// The halves of an opened duplex byte stream.
///
/// `closer` must unblock a read in progress on `reader` (for sockets this is
/// a shutdown); the transport runs it exactly once.
pub struct StreamParts {
    pub reader: Box<dyn Read + Send>,
    pub writer: Box<dyn Write + Send>,
    pub closer: Box<dyn FnOnce() + Send>,
}

/// Something that can open a line-oriented duplex stream to the device.
pub trait Connector {
    fn open(&self) -> Result<StreamParts, TransportError>;

    fn describe(&self) -> String;
}

/// TCP endpoint of the device's Wi-Fi bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpEndpoint {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
}

impl TcpEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Parses `host:port`.
    pub fn parse(s: &str) -> Option<Self> {
        let (host, port) = s.rsplit_once(':')?;
        if host.is_empty() {
            return None;
        }
        let port = port.parse::<u16>().ok()?;
        Some(Self::new(host, port))
    }
}

impl fmt::Display for TcpEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl Connector for TcpEndpoint {
    fn open(&self) -> Result<StreamParts, TransportError> {
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve(self.to_string()))?
            .next()
            .ok_or_else(|| TransportError::Resolve(self.to_string()))?;

        debug!("Connecting to {} ({})", self, addr);
        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout).map_err(|e| {
            TransportError::Connect {
                endpoint: self.to_string(),
                source: e,
            }
        })?;
        stream.set_nodelay(true)?;

        let reader = stream.try_clone()?;
        let closer = stream.try_clone()?;
        info!("Connected to {}", self);

        Ok(StreamParts {
            reader: Box::new(reader),
            writer: Box::new(stream),
            closer: Box::new(move || {
                if let Err(e) = closer.shutdown(Shutdown::Both) {
                    debug!("Socket shutdown: {}", e);
                }
            }),
        })
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_port() {
        let endpoint = TcpEndpoint::parse("192.168.4.1:80").unwrap();
        assert_eq!(endpoint.host, "192.168.4.1");
        assert_eq!(endpoint.port, 80);
        assert_eq!(endpoint.to_string(), "192.168.4.1:80");
        assert!(TcpEndpoint::parse("no-port").is_none());
        assert!(TcpEndpoint::parse(":80").is_none());
    }

    #[test]
    fn refused_connection_is_an_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = TcpEndpoint::new("127.0.0.1", port).open();
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
