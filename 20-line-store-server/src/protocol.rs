use std::{fmt, io};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::profile::{INVALID_FORMAT, NO_DATA, Profile};

const LINE_ENDINGS: &[char] = &['\n', '\r'];
const WRITE_PREFIX: &str = "WRITE:";

/// Longest command line accepted before the connection is treated as faulty.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// One parsed client line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Read,
    /// Carries the line to persist, already stripped of protocol delimiters.
    Write(String),
    /// Rejected input and the reason sent back to the client.
    Invalid(String),
}

impl Command {
    /// Parses one input line. Malformed input always becomes `Invalid`.
    pub fn parse(profile: Profile, line: &str) -> Self {
        let line = line.trim_end_matches(LINE_ENDINGS);
        let line = if profile.trims_input() {
            line.trim()
        } else {
            line
        };

        if line.eq_ignore_ascii_case("READ") {
            return Command::Read;
        }

        match strip_prefix_ignore_case(line, WRITE_PREFIX) {
            Some(payload) => parse_payload(profile, payload),
            None => Command::Invalid(profile.unknown_command().to_string()),
        }
    }
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &line[prefix.len()..])
}

fn parse_payload(profile: Profile, payload: &str) -> Command {
    match profile {
        Profile::Generic => {
            if payload.is_empty() {
                Command::Invalid(NO_DATA.to_string())
            } else {
                Command::Write(payload.to_string())
            }
        }
        Profile::Logs => {
            if payload.trim().is_empty() {
                Command::Invalid(NO_DATA.to_string())
            } else if !payload.contains('=') || !payload.ends_with(';') {
                Command::Invalid(INVALID_FORMAT.to_string())
            } else {
                Command::Write(payload.trim_end_matches(';').to_string())
            }
        }
    }
}

/// Every line the server sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Sent verbatim: banner lines and raw log records.
    Text(String),
    Ok(String),
    Error(String),
    NumberedLine { number: usize, text: String },
    EndOfFile,
    LogsCount(usize),
    EndOfLogs,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Text(text) => f.write_str(text),
            Reply::Ok(message) => write!(f, "OK: {message}"),
            Reply::Error(message) => write!(f, "ERROR: {message}"),
            Reply::NumberedLine { number, text } => write!(f, "Line {number}: {text}"),
            Reply::EndOfFile => f.write_str("--- END OF FILE ---"),
            Reply::LogsCount(count) => write!(f, "LOGS_COUNT:{count}"),
            Reply::EndOfLogs => f.write_str("END_LOGS"),
        }
    }
}

/// Reads one line, without its terminator. `None` means the peer closed.
///
/// Bytes that are not UTF-8 are replaced rather than failing the read, so a
/// stray byte from a raw client yields an `ERROR:` reply instead of a
/// dropped connection.
pub async fn read_line<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    // Room for the longest line plus a `\r\n` terminator.
    let mut limited = (&mut *reader).take(MAX_LINE_BYTES as u64 + 2);
    let bytes = limited.read_until(b'\n', &mut buf).await?;
    if bytes == 0 {
        return Ok(None);
    }
    if strip_terminator(&buf).len() > MAX_LINE_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line exceeds {MAX_LINE_BYTES} bytes"),
        ));
    }

    let text = String::from_utf8_lossy(&buf);
    Ok(Some(text.trim_end_matches(LINE_ENDINGS).to_string()))
}

fn strip_terminator(buf: &[u8]) -> &[u8] {
    match buf.strip_suffix(b"\n") {
        Some(line) => line.strip_suffix(b"\r").unwrap_or(line),
        None => buf,
    }
}

pub async fn write_reply<W>(writer: &mut W, reply: &Reply) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded = reply.to_string().into_bytes();
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}
