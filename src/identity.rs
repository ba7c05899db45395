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

//! Who & where we're running.
//!
//! The default event record reports the current user & host. Neither lookup is allowed to fail
//! the program: [`OsIdentity`] falls back to [`UNKNOWN`] on any error (or an empty answer). The lookups sit behind
//! the [`CurrentIdentityProvider`] trait so that record construction can be tested against a
//! fixed identity.

use tracing::debug;

/// Substituted for any identity component that can't be determined
pub const UNKNOWN: &str = "unknown";

/// Supplies the current user & host names. Implementations shall not fail; they should return
/// [`UNKNOWN`] instead.
pub trait CurrentIdentityProvider {
    fn user(&self) -> String;
    fn host(&self) -> String;
}

/// [`CurrentIdentityProvider`] backed by the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsIdentity;

impl CurrentIdentityProvider for OsIdentity {
    fn user(&self) -> String {
        match whoami::fallible::username() {
            Ok(user) if !user.is_empty() => user,
            Ok(_) => UNKNOWN.to_string(),
            Err(err) => {
                debug!("Couldn't determine the current user ({}); using {}", err, UNKNOWN);
                UNKNOWN.to_string()
            }
        }
    }
    fn host(&self) -> String {
        // `hostname::get()` hands back an `OsString`, which may not be valid UTF-8; we need a
        // JSON string, so treat that the same as a failed lookup.
        match hostname::get().map(|hn| hn.into_string()) {
            Ok(Ok(host)) if !host.is_empty() => host,
            Ok(Ok(_)) => UNKNOWN.to_string(),
            Ok(Err(hn)) => {
                debug!("Hostname {:?} is not valid UTF-8; using {}", hn, UNKNOWN);
                UNKNOWN.to_string()
            }
            Err(err) => {
                debug!("Couldn't determine the hostname ({}); using {}", err, UNKNOWN);
                UNKNOWN.to_string()
            }
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn os_identity_never_empty_handed() {
        // Whatever the host, we should get *something* back for both.
        let id = OsIdentity;
        assert!(!id.host().is_empty());
        assert!(!id.user().is_empty());
    }
}
