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

//! Building the event record.
//!
//! An [`EventRecord`] is a JSON object: a string-keyed map to arbitrary JSON values. [`build`]
//! produces one from whatever the operator passed to `--record`:
//!
//! - nothing: a small diagnostic record naming the sender (see [`default_record`])
//! - `@<path>`: the JSON contents of the file at `<path>`
//! - anything else: the text itself, as JSON
//!
//! Whatever the source, the top-level value must be an object.

use crate::{
    address::Endpoint,
    error::{Error, Result},
    identity::CurrentIdentityProvider,
};

use backtrace::Backtrace;
use serde_json::{json, Map, Value};

use std::path::Path;

type StdResult<T, E> = std::result::Result<T, E>;

/// The message field of the default record
pub const DEFAULT_MESSAGE: &str = "This is a test event";

/// Leading character marking a `--record` argument as a file path
pub const FILE_SENTINEL: char = '@';

/// A JSON object to be sent as the record of a Forward protocol event.
///
/// The only way to get one is through [`TryFrom<Value>`], which enforces the object shape, or
/// from [`build`].
#[derive(Clone, Debug, PartialEq)]
pub struct EventRecord(Map<String, Value>);

impl EventRecord {
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl std::convert::TryFrom<Value> for EventRecord {
    type Error = Error;
    fn try_from(value: Value) -> StdResult<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(EventRecord(map)),
            other => Err(Error::WrongShape {
                found: describe(&other),
                back: Backtrace::new(),
            }),
        }
    }
}

impl serde::Serialize for EventRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> StdResult<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.0, serializer)
    }
}

impl std::fmt::Display for EventRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        // Serializing a `Map<String, Value>` can't fail
        match serde_json::to_string(&self.0) {
            Ok(text) => write!(f, "{}", text),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The record sent when the operator doesn't supply one.
///
/// ```json
/// {
///   "message": "This is a test event",
///   "local": { "user": "...", "host": "...", "address": "<the address argument>" }
/// }
/// ```
pub fn default_record(endpoint: &Endpoint, identity: &impl CurrentIdentityProvider) -> EventRecord {
    let mut local = Map::new();
    local.insert("user".to_string(), Value::String(identity.user()));
    local.insert("host".to_string(), Value::String(identity.host()));
    local.insert(
        "address".to_string(),
        Value::String(endpoint.as_given().to_string()),
    );

    let mut map = Map::new();
    map.insert("message".to_string(), json!(DEFAULT_MESSAGE));
    map.insert("local".to_string(), Value::Object(local));
    EventRecord(map)
}

fn parse(text: &[u8], path: Option<&Path>) -> Result<EventRecord> {
    let value: Value = serde_json::from_slice(text).map_err(|err| Error::MalformedJson {
        path: path.map(Path::to_path_buf),
        source: err,
        back: Backtrace::new(),
    })?;
    EventRecord::try_from(value)
}

/// Produce the [`EventRecord`] described by `raw_input`.
///
/// An empty `raw_input` yields the [`default_record`], which reports `endpoint` as given on the
/// command line along with the user & host from `identity`; that path cannot fail. Otherwise
/// `raw_input` is either `@<path>` or literal JSON, and must decode to an object.
pub fn build(
    raw_input: &str,
    endpoint: &Endpoint,
    identity: &impl CurrentIdentityProvider,
) -> Result<EventRecord> {
    if raw_input.is_empty() {
        return Ok(default_record(endpoint, identity));
    }

    match raw_input.strip_prefix(FILE_SENTINEL) {
        Some(path) => {
            let path = Path::new(path);
            // `read()` opens & closes the file before returning, however it turns out.
            let text = std::fs::read(path).map_err(|err| Error::SourceUnavailable {
                path: path.to_path_buf(),
                source: err,
                back: Backtrace::new(),
            })?;
            parse(&text, Some(path))
        }
        None => parse(raw_input.as_bytes(), None),
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use crate::address::resolve;

    use std::io::Write;

    struct FixedIdentity;

    impl CurrentIdentityProvider for FixedIdentity {
        fn user(&self) -> String {
            "sp1ff".to_string()
        }
        fn host(&self) -> String {
            "bree.local".to_string()
        }
    }

    fn endpoint() -> Endpoint {
        resolve("tcp://127.0.0.1:24224").unwrap()
    }

    #[test]
    fn default_shape() {
        let ep = resolve("unix:///run/fluentd.sock").unwrap();
        let rec = build("", &ep, &FixedIdentity).unwrap();
        assert_eq!(
            Value::Object(rec.into_inner()),
            json!({
                "message": "This is a test event",
                "local": {
                    "user": "sp1ff",
                    "host": "bree.local",
                    "address": "unix:///run/fluentd.sock"
                }
            })
        );
    }

    #[test]
    fn default_values_are_not_spliced_into_json() {
        struct Awkward;
        impl CurrentIdentityProvider for Awkward {
            fn user(&self) -> String {
                "o\"brien".to_string()
            }
            fn host(&self) -> String {
                "back\\slash".to_string()
            }
        }
        let rec = build("", &endpoint(), &Awkward).unwrap();
        assert_eq!(rec.as_map()["local"]["user"], json!("o\"brien"));
        assert_eq!(rec.as_map()["local"]["host"], json!("back\\slash"));
        assert_eq!(rec.as_map()["local"]["address"], json!("tcp://127.0.0.1:24224"));
    }

    #[test]
    fn literal_json() {
        let rec = build(r#"{"a":1,"b":[1,2,3]}"#, &endpoint(), &FixedIdentity).unwrap();
        assert_eq!(Value::Object(rec.clone().into_inner()), json!({"a": 1, "b": [1, 2, 3]}));
        assert_eq!(rec.as_map().len(), 2);

        let rec = build(
            r#"{"n":null,"t":true,"f":-1.5,"s":"x","o":{"deep":[{}]}}"#,
            &endpoint(),
            &FixedIdentity,
        )
        .unwrap();
        assert_eq!(rec.get("n"), Some(&Value::Null));
        assert_eq!(rec.get("t"), Some(&json!(true)));
        assert_eq!(rec.get("f"), Some(&json!(-1.5)));
        assert_eq!(rec.get("o"), Some(&json!({"deep": [{}]})));
    }

    #[test]
    fn wrong_shape() {
        for text in ["[1,2,3]", "42", "\"str\"", "true", "null"] {
            let res = build(text, &endpoint(), &FixedIdentity);
            assert!(matches!(res, Err(Error::WrongShape { .. })), "{}", text);
        }
    }

    #[test]
    fn malformed_literal() {
        let res = build("{\"a\":", &endpoint(), &FixedIdentity);
        assert!(matches!(res, Err(Error::MalformedJson { path: None, .. })));
        let res = build("not json", &endpoint(), &FixedIdentity);
        assert!(matches!(res, Err(Error::MalformedJson { path: None, .. })));
    }

    #[test]
    fn missing_file() {
        let res = build("@/nonexistent/path.json", &endpoint(), &FixedIdentity);
        match res {
            Err(Error::SourceUnavailable { path, .. }) => {
                assert_eq!(path, Path::new("/nonexistent/path.json"))
            }
            other => panic!("expected SourceUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(br#"{"service": "api", "latency_ms": 12, "tags": ["a", "b"]}"#)
            .unwrap();
        let arg = format!("@{}", f.path().display());
        let rec = build(&arg, &endpoint(), &FixedIdentity).unwrap();
        assert_eq!(
            Value::Object(rec.into_inner()),
            json!({"service": "api", "latency_ms": 12, "tags": ["a", "b"]})
        );
    }

    #[test]
    fn file_not_json() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"not json").unwrap();
        let arg = format!("@{}", f.path().display());
        match build(&arg, &endpoint(), &FixedIdentity) {
            Err(Error::MalformedJson {
                path: Some(path), ..
            }) => assert_eq!(path, f.path()),
            other => panic!("expected MalformedJson, got {:?}", other),
        }
    }

    #[test]
    fn file_wrong_shape() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"[{\"a\": 1}]").unwrap();
        let arg = format!("@{}", f.path().display());
        let res = build(&arg, &endpoint(), &FixedIdentity);
        assert!(matches!(res, Err(Error::WrongShape { found: "an array", .. })));
    }

    #[test]
    fn display() {
        let rec = build(r#"{"a":1}"#, &endpoint(), &FixedIdentity).unwrap();
        assert_eq!(format!("{}", rec), r#"{"a":1}"#);
    }
}
