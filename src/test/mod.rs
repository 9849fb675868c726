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

use std::error::Error;

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
};

use crate::{Config, Server};


type Result = std::result::Result<(), Box<dyn Error>>;

/// A client connected to a running [`Server`].
struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(server: &Server) -> std::io::Result<Self> {
        let addr = server.start().await.map_err(std::io::Error::other)?;
        let (read_stream, writer) = TcpStream::connect(addr).await?.into_split();

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer,
        })
    }

    async fn read_line(&mut self) -> std::io::Result<String> {
        let mut line = String::new();
        self.reader.read_line(&mut line).await?;

        Ok(line)
    }

    /// Send `line` with its `CRLF` in one write, as the server reads one command per read.
    async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.writer.write_all(format!("{line}\r\n").as_bytes()).await
    }

    async fn command(&mut self, line: &str) -> std::io::Result<String> {
        self.write_line(line).await?;
        self.read_line().await
    }
}

// 4.5.1 Minimum Implementation:
//
// - [x] `EHLO`
// - [x] `HELO`
// - [x] `MAIL`
// - [x] `RCPT`
// - [x] `DATA`
// - [x] `RSET`
// - [x] `NOOP`
// - [x] `VRFY`
// - [x] `QUIT`
//
// <https://www.rfc-editor.org/rfc/rfc5321.html#section-4.5.1>
#[tokio::test]
async fn test_minimum_implementation() -> Result {
    let server = Server::plain("127.0.0.1:0", Config::default());
    let mut client = Client::connect(&server).await?;

    assert!(is_valid_response::server_greeting(&client.read_line().await?));

    assert!(is_valid_response::continued_line(
        &client.command("EHLO client.example.com").await?,
        250
    ));
    assert!(is_valid_response::continued_line(&client.read_line().await?, 250));
    assert!(is_valid_response::ok(&client.read_line().await?));

    assert!(is_valid_response::ok(&client.command("HELO client.example.com").await?));
    assert!(is_valid_response::ok(&client.command("NOOP").await?));
    assert!(is_valid_response::ok(&client.command("VRFY postmaster@example.com").await?));

    assert!(is_valid_response::ok(&client.command("MAIL FROM:<a@b.com>").await?));
    assert!(is_valid_response::ok(&client.command("RCPT TO:<c@d.com>").await?));
    assert!(is_valid_response::ok(&client.command("RSET").await?));
    assert!(is_valid_response::bad_sequence(&client.command("DATA").await?));

    assert!(is_valid_response::ok(&client.command("MAIL FROM:<a@b.com>").await?));
    assert!(is_valid_response::ok(&client.command("RCPT TO:<c@d.com>").await?));
    assert!(is_valid_response::start_mail_input(&client.command("DATA").await?));
    client.write_line("Subject: test").await?;
    client.write_line("").await?;
    assert!(is_valid_response::ok(&client.command("hello\r\n.").await?));

    assert!(is_valid_response::quit(&client.command("QUIT").await?));

    server.stop();

    Ok(())
}
