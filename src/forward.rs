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

//! A minimal Fluent [Forward] protocol client.
//!
//! [Forward]: https://github.com/fluent/fluentd/wiki/Forward-Protocol-Specification-v1
//!
//! [`ForwardClient`] speaks just enough of the protocol to deliver one event: it encodes the event
//! in "Message mode", that is, as the MessagePack array
//!
//! ```text
//! [tag, time, record]
//! ```
//!
//! where `tag` is a string, `time` an [`EventTime`] and `record` a map, and writes it to whichever
//! [`Transport`] the [`Endpoint`] selects. Acknowledgements, the optional fourth "option" element,
//! and the batched modes (Forward, PackedForward, CompressedPackedForward) are not implemented.
//!
//! ```no_run
//! use fluard::{address::resolve, forward::ForwardClient, identity::OsIdentity, record::build};
//!
//! let endpoint = resolve("tcp://127.0.0.1:24224").unwrap();
//! let record = build("", &endpoint, &OsIdentity).unwrap();
//! let mut client = ForwardClient::new(endpoint);
//! client.connect().unwrap();
//! client.send_message("fluard.test", &record).unwrap();
//! client.disconnect().unwrap();
//! ```

use crate::{
    address::{Endpoint, Scheme},
    error::{Error, Result},
    record::EventRecord,
    transport::{TcpTransport, Transport, UdpTransport},
};

#[cfg(unix)]
use crate::transport::UnixSocketStream;

use backtrace::Backtrace;
use chrono::{DateTime, Utc};
use tracing::debug;

use std::time::Duration;

/// Connect & write timeout used unless [`ForwardClient::with_timeout`] says otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// MessagePack extension type under which the protocol carries [`EventTime`]
pub const EVENT_TIME_EXT: i8 = 0;

fn encoding_error<E>(err: E) -> Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    Error::Encoding {
        source: err.into(),
        back: Backtrace::new(),
    }
}

/// Event timestamp with nanosecond resolution.
///
/// On the wire this is ext type 0 with an eight byte payload: seconds since the epoch, then
/// nanoseconds, each a big-endian `u32`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EventTime {
    secs: u32,
    nanos: u32,
}

impl EventTime {
    pub fn new(secs: u32, nanos: u32) -> EventTime {
        EventTime { secs, nanos }
    }
    pub fn now() -> EventTime {
        EventTime::from(Utc::now())
    }
    pub fn secs(&self) -> u32 {
        self.secs
    }
    pub fn nanos(&self) -> u32 {
        self.nanos
    }
    fn encode(&self, buf: &mut Vec<u8>) -> Result<()> {
        rmp::encode::write_ext_meta(buf, 8, EVENT_TIME_EXT).map_err(encoding_error)?;
        use bytes::BufMut;
        buf.put_u32(self.secs);
        buf.put_u32(self.nanos);
        Ok(())
    }
}

impl std::convert::From<DateTime<Utc>> for EventTime {
    /// Times before the epoch clamp to zero; times after 2106 clamp to `u32::MAX` seconds.
    fn from(dt: DateTime<Utc>) -> Self {
        EventTime {
            secs: dt.timestamp().clamp(0, u32::MAX as i64) as u32,
            nanos: dt.timestamp_subsec_nanos(),
        }
    }
}

/// Encode a single Message mode entry: `[tag, time, record]`.
pub fn encode_message(tag: &str, time: EventTime, record: &EventRecord) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    rmp::encode::write_array_len(&mut buf, 3).map_err(encoding_error)?;
    rmp::encode::write_str(&mut buf, tag).map_err(encoding_error)?;
    time.encode(&mut buf)?;
    rmp_serde::encode::write(&mut buf, record).map_err(encoding_error)?;
    Ok(buf)
}

/// Client for a single Forward protocol endpoint.
///
/// The lifecycle is [`connect`](ForwardClient::connect),
/// [`send_message`](ForwardClient::send_message), [`disconnect`](ForwardClient::disconnect);
/// each may fail independently. Dropping a connected client closes its socket.
pub struct ForwardClient {
    endpoint: Endpoint,
    timeout: Duration,
    transport: Option<Box<dyn Transport>>,
}

impl ForwardClient {
    pub fn new(endpoint: Endpoint) -> ForwardClient {
        ForwardClient {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            transport: None,
        }
    }
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }
    /// Open the transport the endpoint's scheme calls for. Connecting an already-connected client
    /// replaces the existing connection.
    pub fn connect(&mut self) -> Result<()> {
        self.disconnect()?;
        let address = self.endpoint.address();
        let transport: Box<dyn Transport> = match self.endpoint.scheme() {
            Scheme::Tcp => Box::new(TcpTransport::new(address, self.timeout)?),
            Scheme::Udp => Box::new(UdpTransport::new(address, self.timeout)?),
            #[cfg(unix)]
            Scheme::Unix => Box::new(UnixSocketStream::new(address, self.timeout)?),
            #[cfg(not(unix))]
            Scheme::Unix => {
                return Err(Error::Transport {
                    source: Box::new(std::io::Error::new(
                        std::io::ErrorKind::Unsupported,
                        "Unix domain sockets are not supported on this platform",
                    )),
                    back: Backtrace::new(),
                })
            }
        };
        debug!("Connected to {}", self.endpoint);
        self.transport = Some(transport);
        Ok(())
    }
    /// Send `record` under `tag`, timestamped now.
    pub fn send_message(&self, tag: &str, record: &EventRecord) -> Result<()> {
        let transport = self.transport.as_ref().ok_or_else(|| Error::NotConnected {
            back: Backtrace::new(),
        })?;
        let buf = encode_message(tag, EventTime::now(), record)?;
        let cb = transport.send(&buf)?;
        debug!("Sent {} bytes tagged '{}' to {}", cb, tag, self.endpoint);
        Ok(())
    }
    /// Close the connection, if any; disconnecting twice is harmless.
    pub fn disconnect(&mut self) -> Result<()> {
        match self.transport.take() {
            Some(transport) => {
                debug!("Disconnecting from {}", self.endpoint);
                transport.shutdown()
            }
            None => Ok(()),
        }
    }
}
