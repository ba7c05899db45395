// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of fluard.
//
// fluard is free software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// fluard is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with fluard.  If not,
// see <http://www.gnu.org/licenses/>.

//! The Forward protocol transport layer.
//!
//! This module defines the [`Transport`] trait that all implementations must support, along with
//! the TCP, UDP & Unix socket implementations. Each is constructed already connected; dropping it
//! closes the socket.
//!
//! # Examples
//!
//! To send to a collector on another host:
//!
//! ```rust
//! use fluard::transport::TcpTransport;
//! use std::time::Duration;
//! let transpo = TcpTransport::new("some-host.domain.invalid:24224", Duration::from_secs(1));
//! assert!(transpo.is_err()); // no such host, after all
//! ```
//!
//! To send to a local Unix socket:
//!
//! ```rust
//! use fluard::transport::UnixSocketStream;
//! use std::time::Duration;
//! let transpo = UnixSocketStream::new("/i/am/not/there.s", Duration::from_secs(1));
//! assert!(transpo.is_err()); // no such socket, after all
//! ```

use crate::error::{Error, Result};

use backtrace::Backtrace;
use tracing::debug;

use std::{
    io::Write,
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket},
    time::Duration,
};

#[cfg(unix)]
use std::{os::unix::net::UnixStream, path::Path};

fn transport_error<E>(err: E) -> Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    Error::Transport {
        source: err.into(),
        back: Backtrace::new(),
    }
}

/// Resolve `addr`, failing if it names no addresses at all.
fn socket_addrs<A: ToSocketAddrs>(addr: A) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = addr.to_socket_addrs().map_err(transport_error)?.collect();
    if addrs.is_empty() {
        return Err(transport_error(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "could not resolve to any address",
        )));
    }
    Ok(addrs)
}

/// Shut down both halves of a stream socket; a peer that has already gone away is not an error.
fn shutdown_result(res: std::io::Result<()>) -> Result<()> {
    match res {
        Err(err) if err.kind() != std::io::ErrorKind::NotConnected => Err(transport_error(err)),
        _ => Ok(()),
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                      transport mechanisms                                      //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operations all transport layers must support.
pub trait Transport {
    /// Send a slice of bytes on this transport mechanism.
    ///
    /// Forward protocol entries are self-delimiting MessagePack, so no framing is added: stream
    /// transports write `buf` in full, datagram transports send it as a single datagram.
    fn send(&self, buf: &[u8]) -> Result<usize>;
    /// Orderly close; the default does nothing.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Sending Forward messages via UDP datagrams.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Construct a [`Transport`] implementation via UDP at `addr`.
    pub fn new<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<UdpTransport> {
        let peer = socket_addrs(addr)?[0];
        // Bind to any available port in the peer's address family...
        let local = if peer.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).map_err(transport_error)?;
        // and connect to the collector at `peer`:
        socket.connect(peer).map_err(transport_error)?;
        socket
            .set_write_timeout(Some(timeout))
            .map_err(transport_error)?;
        debug!("UDP socket {:?} connected to {}", socket.local_addr().ok(), peer);
        Ok(UdpTransport { socket })
    }
}

impl Transport for UdpTransport {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        self.socket.send(buf).map_err(transport_error)
    }
}

/// Sending Forward messages via TCP streams
pub struct TcpTransport {
    socket: TcpStream,
}

impl TcpTransport {
    /// Construct a [`Transport`] implementation via TCP at `addr`.
    ///
    /// Each address `addr` resolves to is tried in turn, each attempt bounded by `timeout`; the
    /// error from the last one is returned if none succeed.
    pub fn new<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<TcpTransport> {
        let mut last_err = None;
        for peer in socket_addrs(addr)? {
            match TcpStream::connect_timeout(&peer, timeout) {
                Ok(socket) => {
                    socket
                        .set_write_timeout(Some(timeout))
                        .map_err(transport_error)?;
                    debug!("TCP stream connected to {}", peer);
                    return Ok(TcpTransport { socket });
                }
                Err(err) => {
                    debug!("Failed to connect to {}: {}", peer, err);
                    last_err = Some(err);
                }
            }
        }
        // `socket_addrs()` never returns an empty list, so `last_err` is set by now.
        Err(transport_error(last_err.unwrap_or_else(|| {
            std::io::Error::from(std::io::ErrorKind::NotConnected)
        })))
    }
}

impl Transport for TcpTransport {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        // `Write` takes `&mut self`, but it's also implemented on `&TcpStream`, so we write
        // through a mutable binding of type `&TcpStream`.
        let mut writer: &TcpStream = &self.socket;
        writer.write_all(buf).map_err(transport_error)?;
        writer.flush().map_err(transport_error)?;
        Ok(buf.len())
    }
    fn shutdown(&self) -> Result<()> {
        shutdown_result(self.socket.shutdown(Shutdown::Both))
    }
}

/// Sending Forward messages via Unix socket (stream)
#[cfg(unix)]
pub struct UnixSocketStream {
    socket: UnixStream,
}

#[cfg(unix)]
impl UnixSocketStream {
    /// Construct a [`Transport`] implementation via the Unix socket at `path`.
    ///
    /// Connecting a Unix socket doesn't block the way a TCP connect can, so `timeout` only bounds
    /// writes.
    pub fn new<P: AsRef<Path>>(path: P, timeout: Duration) -> Result<UnixSocketStream> {
        let socket = UnixStream::connect(path.as_ref()).map_err(transport_error)?;
        socket
            .set_write_timeout(Some(timeout))
            .map_err(transport_error)?;
        debug!("Unix stream connected to {}", path.as_ref().display());
        Ok(UnixSocketStream { socket })
    }
}

#[cfg(unix)]
impl Transport for UnixSocketStream {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        let mut writer: &UnixStream = &self.socket;
        writer.write_all(buf).map_err(transport_error)?;
        writer.flush().map_err(transport_error)?;
        Ok(buf.len())
    }
    fn shutdown(&self) -> Result<()> {
        shutdown_result(self.socket.shutdown(Shutdown::Both))
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use std::io::Read;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn tcp_round_trip() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let transpo = TcpTransport::new(addr, TIMEOUT).unwrap();
        assert_eq!(transpo.send(b"hello").unwrap(), 5);
        transpo.shutdown().unwrap();

        let (mut conn, _) = listener.accept().unwrap();
        let mut got = Vec::new();
        conn.read_to_end(&mut got).unwrap();
        assert_eq!(got, b"hello");
    }

    #[test]
    fn tcp_refused() {
        // Grab a free port, then close it so nothing is listening there.
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        assert!(matches!(
            TcpTransport::new(addr, TIMEOUT),
            Err(Error::Transport { .. })
        ));
    }

    #[test]
    fn udp_datagram() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        server.set_read_timeout(Some(TIMEOUT)).unwrap();

        let transpo = UdpTransport::new(server.local_addr().unwrap(), TIMEOUT).unwrap();
        assert_eq!(transpo.send(b"datagram").unwrap(), 8);
        transpo.shutdown().unwrap();

        let mut buf = [0u8; 64];
        let n = server.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"datagram");
    }

    #[cfg(unix)]
    #[test]
    fn unix_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fluentd.sock");
        let listener = std::os::unix::net::UnixListener::bind(&path).unwrap();

        let transpo = UnixSocketStream::new(&path, TIMEOUT).unwrap();
        assert_eq!(transpo.send(b"over unix").unwrap(), 9);
        transpo.shutdown().unwrap();

        let (mut conn, _) = listener.accept().unwrap();
        let mut got = Vec::new();
        conn.read_to_end(&mut got).unwrap();
        assert_eq!(got, b"over unix");
    }

    #[cfg(unix)]
    #[test]
    fn unix_missing() {
        assert!(UnixSocketStream::new("/i/am/not/there.s", TIMEOUT).is_err());
    }
}
