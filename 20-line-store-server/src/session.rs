//! Per-connection command loop.
//!
//! A session greets the peer, then reads one line at a time, parses it and
//! fully writes the reply before reading the next line. Store failures and
//! malformed input become `ERROR:` replies; only socket faults end the loop
//! with an error.

use std::time::Duration;

use anyhow::Result;
use tokio::{
    io::{AsyncBufRead, AsyncWrite},
    time::{sleep, timeout},
};
use tracing::{debug, info, warn};

use crate::{
    config::ServerConfig,
    profile::{AfterRead, Profile},
    protocol::{Command, Reply, read_line, write_reply},
    store::{LineStore, StoreError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

pub async fn run<R, W>(
    reader: &mut R,
    writer: &mut W,
    store: &LineStore,
    config: &ServerConfig,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    send_banner(writer, config.profile).await?;

    while let Some(line) = next_line(reader, config.idle_timeout).await? {
        debug!(%line, "command received");
        let command = Command::parse(config.profile, &line);
        if execute(command, writer, store, config).await? == Flow::Close {
            break;
        }
    }

    Ok(())
}

async fn send_banner<W>(writer: &mut W, profile: Profile) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    for line in profile.banner() {
        write_reply(writer, &Reply::Text(line.to_string())).await?;
    }
    Ok(())
}

async fn next_line<R>(reader: &mut R, idle_timeout: Option<Duration>) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let Some(limit) = idle_timeout else {
        return Ok(read_line(reader).await?);
    };

    match timeout(limit, read_line(reader)).await {
        Ok(line) => Ok(line?),
        Err(_) => {
            info!(idle = ?limit, "closing idle session");
            Ok(None)
        }
    }
}

async fn execute<W>(
    command: Command,
    writer: &mut W,
    store: &LineStore,
    config: &ServerConfig,
) -> Result<Flow>
where
    W: AsyncWrite + Unpin,
{
    match command {
        Command::Read => handle_read(writer, store, config).await,
        Command::Write(line) => handle_write(writer, store, config.profile, &line).await,
        Command::Invalid(reason) => {
            write_reply(writer, &Reply::Error(reason)).await?;
            Ok(Flow::Continue)
        }
    }
}

async fn handle_read<W>(writer: &mut W, store: &LineStore, config: &ServerConfig) -> Result<Flow>
where
    W: AsyncWrite + Unpin,
{
    let lines = match store.read_all().await {
        Ok(lines) => lines,
        Err(err) => {
            warn!(path = %store.path().display(), error = %err, "failed to read store");
            let message = read_failure(config.profile, &err);
            write_reply(writer, &Reply::Error(message)).await?;
            return Ok(Flow::Continue);
        }
    };

    match config.profile {
        Profile::Generic => send_numbered(writer, lines, config.pace).await?,
        Profile::Logs => send_counted(writer, lines).await?,
    }

    Ok(match config.after_read {
        AfterRead::Close => Flow::Close,
        AfterRead::AwaitCommand => Flow::Continue,
    })
}

fn read_failure(profile: Profile, err: &StoreError) -> String {
    match err {
        StoreError::Missing { .. } => profile.missing_store().to_string(),
        other => other.to_string(),
    }
}

async fn send_numbered<W>(writer: &mut W, lines: Vec<String>, pace: Duration) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_reply(writer, &Reply::Ok("Reading file content".to_string())).await?;
    for (index, text) in lines.into_iter().enumerate() {
        write_reply(
            writer,
            &Reply::NumberedLine {
                number: index + 1,
                text,
            },
        )
        .await?;
        if !pace.is_zero() {
            sleep(pace).await;
        }
    }
    write_reply(writer, &Reply::EndOfFile).await?;
    Ok(())
}

async fn send_counted<W>(writer: &mut W, lines: Vec<String>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_reply(writer, &Reply::LogsCount(lines.len())).await?;
    for line in lines {
        write_reply(writer, &Reply::Text(line)).await?;
    }
    write_reply(writer, &Reply::EndOfLogs).await?;
    Ok(())
}

async fn handle_write<W>(
    writer: &mut W,
    store: &LineStore,
    profile: Profile,
    line: &str,
) -> Result<Flow>
where
    W: AsyncWrite + Unpin,
{
    let reply = match store.append(line).await {
        Ok(()) => {
            info!(%line, "appended line");
            Reply::Ok(profile.write_ok(line))
        }
        Err(err) => {
            warn!(path = %store.path().display(), error = %err, "failed to append line");
            Reply::Error(profile.write_failed(&err.to_string()))
        }
    };
    write_reply(writer, &reply).await?;
    Ok(Flow::Continue)
}
