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

//! fluard: send one event to a Fluentd endpoint & exit.

use fluard::{
    address::{self, ADDRESS_FORMS},
    error::Error,
    forward::ForwardClient,
    identity::OsIdentity,
    record, DEFAULT_TAG,
};

use clap::Parser;
use tracing::{debug, error, info};

use std::{process::ExitCode, time::Duration};

/// Send a single test event to a Fluentd endpoint using the Forward protocol
#[derive(Debug, Parser)]
#[command(name = "fluard", version, about)]
struct Cli {
    /// Fluentd server address, e.g. tcp://127.0.0.1:24224, udp://127.0.0.1:54453 or
    /// unix:///run/fluentd.sock
    address: String,
    /// Fluentd event tag
    #[arg(short, long, default_value = DEFAULT_TAG)]
    tag: String,
    /// Event record as a JSON object, or @<file> to read one from a file
    #[arg(short, long)]
    record: Option<String>,
    /// Connect & write timeout, in seconds
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,
    /// Log more (repeat for even more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Each step's failure, paired with what we were trying to do at the time.
type StepResult<T> = std::result::Result<T, (&'static str, Error)>;

fn run(cli: &Cli) -> StepResult<()> {
    let endpoint = address::resolve(&cli.address).map_err(|err| ("Failed to parse address", err))?;
    let record = record::build(cli.record.as_deref().unwrap_or(""), &endpoint, &OsIdentity)
        .map_err(|err| ("Failed to parse record input", err))?;
    debug!("Record: {}", record);

    info!("Connecting to Fluentd at {}", endpoint);
    let mut client = ForwardClient::new(endpoint).with_timeout(Duration::from_secs(cli.timeout));
    client
        .connect()
        .map_err(|err| ("Failed to connect to Fluentd", err))?;
    client
        .send_message(&cli.tag, &record)
        .map_err(|err| ("Failed to send event", err))?;
    client
        .disconnect()
        .map_err(|err| ("Failed to disconnect from Fluentd", err))?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => {
            info!("Event sent successfully");
            ExitCode::SUCCESS
        }
        Err((what, err)) => {
            if let Error::MalformedAddress { .. } = err {
                for line in ADDRESS_FORMS {
                    error!("{}", line);
                }
            }
            error!("{}: {}", what, err);
            debug!("{:?}", err);
            ExitCode::FAILURE
        }
    }
}
