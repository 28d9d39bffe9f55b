use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    select,
};
use tracing::{info, warn};

use crate::cli::ClientArgs;

pub async fn run(args: ClientArgs) -> Result<()> {
    let (reader, mut writer) = establish_connection(&args).await?;
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    relay(reader, &mut writer, stdin, &mut stdout).await
}

async fn establish_connection(
    args: &ClientArgs,
) -> Result<(BufReader<OwnedReadHalf>, OwnedWriteHalf)> {
    let stream = TcpStream::connect(args.server)
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;

    info!("connected to {}", args.server);

    let (reader, writer) = stream.into_split();
    Ok((BufReader::new(reader), writer))
}

/// Relays input lines to the server and prints every server line.
///
/// When input ends the write half is closed but server output is still
/// drained, so piped input such as `echo READ | client` prints the reply.
async fn relay<R, W, I, O>(server: R, writer: &mut W, input: I, output: &mut O) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    // `Lines::next_line` keeps partial lines across cancelled `select!` rounds.
    let mut server_lines = server.lines();
    let mut input_lines = input.lines();
    let mut input_open = true;

    loop {
        select! {
            line = server_lines.next_line() => {
                match line? {
                    Some(line) => write_line(output, &line).await?,
                    None => {
                        write_line(output, "*** server closed the connection").await?;
                        break;
                    }
                }
            }
            line = input_lines.next_line(), if input_open => {
                match handle_input(line?, writer, output).await? {
                    Input::Sent => {}
                    Input::Closed => {
                        input_open = false;
                        shutdown_connection(writer).await;
                    }
                    Input::Quit => break,
                }
            }
            ctrl_c = tokio::signal::ctrl_c() => {
                if let Err(error) = ctrl_c {
                    warn!(?error, "ctrl-c handler failed");
                }
                break;
            }
        }
    }

    if input_open {
        shutdown_connection(writer).await;
    }
    Ok(())
}

enum Input {
    Sent,
    Closed,
    Quit,
}

async fn handle_input<W, O>(line: Option<String>, writer: &mut W, output: &mut O) -> Result<Input>
where
    W: AsyncWrite + Unpin,
    O: AsyncWrite + Unpin,
{
    let Some(line) = line else {
        return Ok(Input::Closed);
    };

    if line.eq_ignore_ascii_case("/quit") {
        write_line(output, "*** leaving").await?;
        return Ok(Input::Quit);
    }

    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(Input::Sent)
}

async fn shutdown_connection<W>(writer: &mut W)
where
    W: AsyncWrite + Unpin,
{
    if let Err(error) = writer.shutdown().await {
        warn!(?error, "failed to shutdown client writer cleanly");
    }
}

async fn write_line<O>(output: &mut O, line: &str) -> std::io::Result<()>
where
    O: AsyncWrite + Unpin,
{
    output.write_all(line.as_bytes()).await?;
    output.write_all(b"\n").await?;
    output.flush().await
}
