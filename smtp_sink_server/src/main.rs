// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright © 2024 RemasteredArch
//
// This file is part of smtp_sink.
//
// smtp_sink is free software: you can redistribute it and/or modify it under the terms of the GNU
// Affero General Public License as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// smtp_sink is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU
// Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License along with smtp_sink.
// If not, see <https://www.gnu.org/licenses/>.

#![warn(clippy::nursery, clippy::pedantic)]

//! Serves SMTP on port 25 and SMTPS on port 465 until interrupted.
//!
//! The TLS listener reads its certificate chain from `cert/cert.pem` and its private key from
//! `cert/key.pem`, relative to the working directory. Log output is filtered by the
//! `SMTP_SINK_LOG` environment variable, which defaults to `info`.

use std::process::ExitCode;

use smtp_sink::{Config, Server};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const PLAIN_ADDR: &str = "0.0.0.0:25";
const TLS_ADDR: &str = "0.0.0.0:465";
const CERTIFICATE: &str = "cert/cert.pem";
const PRIVATE_KEY: &str = "cert/key.pem";

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env("SMTP_SINK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_thread_names(true))
        .with(filter)
        .init();

    let plain = Server::plain(PLAIN_ADDR, Config::default());
    let tls = Server::tls(TLS_ADDR, CERTIFICATE, PRIVATE_KEY, Config::default());

    for server in [&plain, &tls] {
        if let Err(error) = server.start().await {
            tracing::error!(%error, "failed to start server");
            plain.stop();
            tls.stop();

            return ExitCode::FAILURE;
        }
    }

    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to wait for interrupt");
    }

    plain.stop();
    tls.stop();

    ExitCode::SUCCESS
}
