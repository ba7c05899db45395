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
//! Send a single test event to a [Fluentd]-compatible collector.
//!
//! [Fluentd]: https://www.fluentd.org
//!
//! # Introduction
//!
//! When standing up a log pipeline, the first question is usually "is anything listening, and is
//! it configured the way I think it is?" [fluard](crate) answers that by emitting exactly one
//! structured event to a collector over TCP, UDP or a Unix domain socket, speaking the Fluent
//! [Forward] protocol. There is no retry, buffering or batching: one record goes out, and the
//! program exits.
//!
//! [Forward]: https://github.com/fluent/fluentd/wiki/Forward-Protocol-Specification-v1
//!
//! Getting there takes three steps:
//!
//! 1. resolving the operator's address string into a transport & an address ([`address`])
//!
//! 2. building the event record, either from JSON the operator supplies or a small diagnostic
//!    record naming the sender ([`record`], with help from [`identity`])
//!
//! 3. encoding the record as a Forward protocol message & writing it to the collector
//!    ([`forward`] over [`transport`])
//!
//! Failures at any step are fatal; see [`error`].
//!
//! # Usage
//!
//! ```text
//! fluard tcp://127.0.0.1:24224
//! fluard udp:127.0.0.1:54453 --tag app.debug
//! fluard unix:///run/fluentd.sock --record '{"message": "hello"}'
//! fluard tcp://fluentd.local:24224 -r @event.json
//! ```
//!
//! The same steps are available as a library:
//!
//! ```rust
//! use fluard::{address::resolve, identity::OsIdentity, record::build};
//!
//! let endpoint = resolve("tcp://127.0.0.1:24224").unwrap();
//! let record = build(r#"{"message": "hello"}"#, &endpoint, &OsIdentity).unwrap();
//! assert_eq!(record.get("message").unwrap(), "hello");
//!
//! // With no record given, a default is synthesized that reports the address verbatim:
//! let record = build("", &endpoint, &OsIdentity).unwrap();
//! assert_eq!(record.as_map()["local"]["address"], "tcp://127.0.0.1:24224");
//! ```

pub mod address;
pub mod error;
pub mod forward;
pub mod identity;
pub mod record;
pub mod transport;

/// Tag under which events are sent when the operator doesn't choose one
pub const DEFAULT_TAG: &str = "fluard.test";
