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

//! Test writing to port 24224 on the local host.

use fluard::{address::resolve, forward::ForwardClient, record::EventRecord};
use tracing::info;

pub fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let endpoint = resolve("tcp://127.0.0.1:24224").unwrap();
    let record = EventRecord::try_from(serde_json::json!({
        "message": "你好, TCP socket.",
        "transport": endpoint.scheme().as_str(),
    }))
    .unwrap();

    let mut client = ForwardClient::new(endpoint);
    client.connect().unwrap();
    client.send_message("fluard.test", &record).unwrap();
    client.disconnect().unwrap();
    info!("Sent {} to {}", record, client.endpoint());
}
