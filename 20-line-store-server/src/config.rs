use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf, time::Duration};

use crate::{
    cli::ServeArgs,
    profile::{AfterRead, Profile},
};

const DEFAULT_PACE: Duration = Duration::from_millis(500);

/// Fully resolved server settings, with profile defaults filled in.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub profile: Profile,
    pub listen: SocketAddr,
    pub store_path: PathBuf,
    /// Generic `READ` delay after each line. Zero disables pacing.
    pub pace: Duration,
    pub after_read: AfterRead,
    pub idle_timeout: Option<Duration>,
    pub max_connections: Option<NonZeroUsize>,
}

impl ServerConfig {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            listen: profile.default_listen(),
            store_path: PathBuf::from(profile.default_store_path()),
            pace: DEFAULT_PACE,
            after_read: profile.after_read(),
            idle_timeout: None,
            max_connections: None,
        }
    }
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        let mut config = ServerConfig::new(args.profile);
        if let Some(listen) = args.listen {
            config.listen = listen;
        }
        if let Some(store) = args.store {
            config.store_path = store;
        }
        config.pace = Duration::from_millis(args.pace_ms);
        if args.keep_open {
            config.after_read = AfterRead::AwaitCommand;
        }
        config.idle_timeout = args.idle_timeout_secs.map(Duration::from_secs);
        config.max_connections = args.max_connections;
        config
    }
}
