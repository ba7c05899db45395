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
//! [fluard](crate) errors

use backtrace::Backtrace;

use std::path::PathBuf;

/// [fluard](crate) error type
///
/// [fluard](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor of a
/// straightforward enumeration with a few match arms chosen on the basis of what the operator will
/// need to fix their input. Every failure is fatal to a one-shot tool, so each variant carries
/// the offending string or path rather than anything a caller could use to recover.
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
#[non_exhaustive]
pub enum Error {
    /// The endpoint string matched none of the accepted address forms
    MalformedAddress { address: String, back: Backtrace },
    /// A record file named with `@` could not be read
    SourceUnavailable {
        path: PathBuf,
        source: std::io::Error,
        back: Backtrace,
    },
    /// Record text was not valid JSON; `path` is set when the text came from a file
    MalformedJson {
        path: Option<PathBuf>,
        source: serde_json::Error,
        back: Backtrace,
    },
    /// The record was valid JSON, but not an object
    WrongShape { found: &'static str, back: Backtrace },
    /// Failed to serialize a Forward protocol message
    Encoding {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// A message was sent before connecting (or after disconnecting)
    NotConnected { back: Backtrace },
    /// General transport layer error
    Transport {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::MalformedAddress { address, .. } => {
                write!(f, "invalid address format: '{}'", address)
            }
            Error::SourceUnavailable { path, source, .. } => {
                write!(f, "failed to read file {}: {}", path.display(), source)
            }
            Error::MalformedJson {
                path: Some(path),
                source,
                ..
            } => write!(
                f,
                "failed to parse JSON from file {}: {}",
                path.display(),
                source
            ),
            Error::MalformedJson {
                path: None, source, ..
            } => write!(f, "failed to parse JSON string: {}", source),
            Error::WrongShape { found, .. } => {
                write!(f, "record must be a JSON object, not {}", found)
            }
            Error::Encoding { source, .. } => {
                write!(f, "While encoding a Forward message, got {}", source)
            }
            Error::NotConnected { .. } => write!(f, "Not connected to a Fluentd endpoint"),
            Error::Transport { source, .. } => write!(f, "Transport error: {}", source),
            _ => write!(f, "Other fluard error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::MalformedAddress { back, .. }
            | Error::SourceUnavailable { back, .. }
            | Error::MalformedJson { back, .. }
            | Error::WrongShape { back, .. }
            | Error::Encoding { back, .. }
            | Error::NotConnected { back }
            | Error::Transport { back, .. } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "fluard error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    #[allow(unreachable_patterns)]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SourceUnavailable { source, .. } => Some(source),
            Error::MalformedJson { source, .. } => Some(source),
            Error::Encoding { source, .. } | Error::Transport { source, .. } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn json_errors_name_their_file() {
        let source = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = Error::MalformedJson {
            path: Some(PathBuf::from("/tmp/record.json")),
            source,
            back: Backtrace::new(),
        };
        let text = format!("{}", err);
        assert!(text.starts_with("failed to parse JSON from file /tmp/record.json: "));
        assert!(std::error::Error::source(&err).is_some());

        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::MalformedJson {
            path: None,
            source,
            back: Backtrace::new(),
        };
        assert!(format!("{}", err).starts_with("failed to parse JSON string: "));
    }

    #[test]
    fn wrong_shape_message() {
        let err = Error::WrongShape {
            found: "an array",
            back: Backtrace::new(),
        };
        assert_eq!(
            format!("{}", err),
            "record must be a JSON object, not an array"
        );
        // Debug output carries the backtrace after the message.
        assert!(format!("{:?}", err).starts_with("record must be a JSON object, not an array\n"));
    }
}
