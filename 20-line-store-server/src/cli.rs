use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::profile::Profile;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the shared line store over TCP.
    Serve(ServeArgs),
    /// Connect to a server and exchange commands from the terminal.
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Protocol profile: seed data, payload grammar and READ framing.
    #[arg(long, value_enum, default_value_t = Profile::Logs)]
    pub profile: Profile,

    /// Socket address to bind. Defaults to port 8080 (generic) or 8001 (logs)
    /// on all interfaces. Use port 0 for an ephemeral port.
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Backing file. Defaults to data.txt (generic) or logs.txt (logs).
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Delay between lines of a generic READ, in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub pace_ms: u64,

    /// Keep generic sessions open after READ instead of closing them.
    #[arg(long)]
    pub keep_open: bool,

    /// Close sessions that send nothing for this many seconds.
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,

    /// Upper bound on concurrently served connections.
    #[arg(long)]
    pub max_connections: Option<NonZeroUsize>,
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Address of the server to connect to.
    #[arg(long, default_value = "127.0.0.1:8001")]
    pub server: SocketAddr,
}
