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

//! Resolving operator-supplied endpoint strings.
//!
//! [`resolve`] classifies a single address string into a transport [`Scheme`] and a
//! transport-specific address. Two forms are accepted:
//!
//! 1. `tcp:` or `udp:`, any number of slashes, then a non-empty authority (`host:port`, although
//!    that shape is left for the transport layer to enforce)
//!
//! 2. `unix:`, any number of `//` pairs, then an absolute path
//!
//! The whole string must match one of the two; anything else is
//! [`MalformedAddress`](crate::error::Error::MalformedAddress).
//!
//! ```rust
//! use fluard::address::{resolve, Scheme};
//!
//! let ep = resolve("tcp://127.0.0.1:24224").unwrap();
//! assert_eq!(ep.scheme(), Scheme::Tcp);
//! assert_eq!(ep.address(), "127.0.0.1:24224");
//!
//! let ep = resolve("unix:///run/fluentd.sock").unwrap();
//! assert_eq!(ep.scheme(), Scheme::Unix);
//! assert_eq!(ep.address(), "/run/fluentd.sock");
//!
//! assert!(resolve("http://127.0.0.1:24224").is_err());
//! ```

use crate::error::{Error, Result};

use backtrace::Backtrace;

type StdResult<T, E> = std::result::Result<T, E>;

/// Human-readable summary of the accepted address forms, suitable for a usage hint.
pub const ADDRESS_FORMS: [&str; 2] = [
    "Address format should match any of tcp:(/..)<host>:<port>, udp:(/..)<host>:<port>, or unix:(/..)<path>",
    "Any number of slashes is optional; use an odd number for absolute unix paths",
];

/// The transport mechanism selected by an address.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Scheme {
    Tcp,
    Udp,
    Unix,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Tcp => "tcp",
            Scheme::Udp => "udp",
            Scheme::Unix => "unix",
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", self.as_str())
    }
}

/// A resolved (scheme, address) pair.
///
/// For [`Scheme::Tcp`] & [`Scheme::Udp`], `address` is the authority exactly as given (expected
/// to be `host:port`); for [`Scheme::Unix`] it is an absolute filesystem path. The string the
/// endpoint was resolved from is retained, since the default event record reports it verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    address: String,
    raw: String,
}

impl Endpoint {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }
    pub fn address(&self) -> &str {
        &self.address
    }
    /// The unparsed address string, as the operator gave it
    pub fn as_given(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}://{}", self.scheme, self.address)
    }
}

impl std::str::FromStr for Endpoint {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        resolve(s)
    }
}

/// Match `tcp:` or `udp:`, optional slashes, then a non-empty authority.
fn resolve_inet(raw: &str) -> Option<(Scheme, &str)> {
    let (scheme, rest) = if let Some(rest) = raw.strip_prefix("tcp:") {
        (Scheme::Tcp, rest)
    } else if let Some(rest) = raw.strip_prefix("udp:") {
        (Scheme::Udp, rest)
    } else {
        return None;
    };
    let authority = rest.trim_start_matches('/');
    if authority.is_empty() {
        None
    } else {
        Some((scheme, authority))
    }
}

/// Match `unix:`, zero or more `//` pairs, then a path with at least one leading slash.
///
/// Pairs are stripped greedily, but never the last slash: with `n` leading slashes we drop
/// `2 * ((n - 1) / 2)`, so an odd count yields a path with exactly one leading slash.
fn resolve_unix(raw: &str) -> Option<&str> {
    let rest = raw.strip_prefix("unix:")?;
    let slashes = rest.len() - rest.trim_start_matches('/').len();
    if slashes == 0 {
        return None;
    }
    Some(&rest[2 * ((slashes - 1) / 2)..])
}

/// Resolve `raw` into an [`Endpoint`].
///
/// The tcp/udp form is checked first, then the unix form; the scheme keywords are disjoint so at
/// most one can match. Neither form admits a newline in the address.
pub fn resolve(raw: &str) -> Result<Endpoint> {
    let (scheme, address) = resolve_inet(raw)
        .or_else(|| resolve_unix(raw).map(|path| (Scheme::Unix, path)))
        .filter(|(_, address)| !address.contains('\n'))
        .ok_or_else(|| Error::MalformedAddress {
            address: raw.to_string(),
            back: Backtrace::new(),
        })?;
    Ok(Endpoint {
        scheme,
        address: address.to_string(),
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod test {

    use super::*;

    fn ok(raw: &str) -> (Scheme, String) {
        let ep = resolve(raw).unwrap();
        assert_eq!(ep.as_given(), raw);
        (ep.scheme(), ep.address().to_string())
    }

    fn malformed(raw: &str) -> bool {
        matches!(resolve(raw), Err(Error::MalformedAddress { address, .. }) if address == raw)
    }

    #[test]
    fn tcp_and_udp() {
        assert_eq!(
            ok("tcp://127.0.0.1:24224"),
            (Scheme::Tcp, "127.0.0.1:24224".to_string())
        );
        assert_eq!(
            ok("udp:127.0.0.1:54453"),
            (Scheme::Udp, "127.0.0.1:54453".to_string())
        );
        assert_eq!(
            ok("tcp:/fluentd.local:24224"),
            (Scheme::Tcp, "fluentd.local:24224".to_string())
        );
        // Any number of slashes is tolerated
        assert_eq!(
            ok("tcp:////host:24224"),
            (Scheme::Tcp, "host:24224".to_string())
        );
        // The authority shape is not checked here
        assert_eq!(ok("udp://no-port"), (Scheme::Udp, "no-port".to_string()));
        assert_eq!(ok("tcp://[::1]:24224"), (Scheme::Tcp, "[::1]:24224".to_string()));
    }

    #[test]
    fn unix() {
        assert_eq!(
            ok("unix:///run/fluentd.sock"),
            (Scheme::Unix, "/run/fluentd.sock".to_string())
        );
        assert_eq!(
            ok("unix:/run/fluentd.sock"),
            (Scheme::Unix, "/run/fluentd.sock".to_string())
        );
        assert_eq!(
            ok("unix://///run/fluentd.sock"),
            (Scheme::Unix, "/run/fluentd.sock".to_string())
        );
        // An even number of slashes leaves two on the path
        assert_eq!(ok("unix://run/x.sock"), (Scheme::Unix, "//run/x.sock".to_string()));
        assert_eq!(ok("unix:////x.sock"), (Scheme::Unix, "//x.sock".to_string()));
        assert_eq!(ok("unix:/"), (Scheme::Unix, "/".to_string()));
    }

    #[test]
    fn rejections() {
        assert!(malformed("tcp://"));
        assert!(malformed("udp:"));
        assert!(malformed("tcp:"));
        assert!(malformed("unix:"));
        assert!(malformed("unix:run/fluentd.sock"));
        assert!(malformed("http://127.0.0.1:24224"));
        assert!(malformed("TCP://127.0.0.1:24224"));
        assert!(malformed("127.0.0.1:24224"));
        assert!(malformed(""));
        assert!(malformed(" tcp://127.0.0.1:24224"));
        assert!(malformed("tcp://127.0.0.1:24224\n"));
        assert!(malformed("unix:///run/fluentd.sock\nx"));
    }

    #[test]
    fn display_and_from_str() {
        let ep: Endpoint = "unix:///run/fluentd.sock".parse().unwrap();
        assert_eq!(format!("{}", ep), "unix:///run/fluentd.sock");
        let ep: Endpoint = "tcp:localhost:24224".parse().unwrap();
        assert_eq!(format!("{}", ep), "tcp://localhost:24224");
        assert_eq!(ep.as_given(), "tcp:localhost:24224");
        assert!("ftp://x".parse::<Endpoint>().is_err());
    }
}
