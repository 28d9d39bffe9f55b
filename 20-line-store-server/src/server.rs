use std::{
    future::Future,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    select,
    sync::{OwnedSemaphorePermit, Semaphore},
};
use tracing::{debug, info, warn};

use crate::{config::ServerConfig, session, store::LineStore};

type SessionId = u64;

pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl Server {
    pub fn new(listener: TcpListener, store: Arc<LineStore>, config: ServerConfig) -> Self {
        Self {
            listener,
            state: Arc::new(ServerState::new(store, config)),
        }
    }

    /// Seeds the store if needed and binds the configured address.
    ///
    /// Either failure is fatal: the server never starts half-configured.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let store = LineStore::new(&config.store_path);
        store
            .initialize(config.profile.seed_lines())
            .await
            .context("failed to initialize store")?;

        let listener = TcpListener::bind(config.listen)
            .await
            .with_context(|| format!("failed to bind {}", config.listen))?;

        Ok(Self::new(listener, Arc::new(store), config))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn store(&self) -> Arc<LineStore> {
        Arc::clone(&self.state.store)
    }

    /// Accepts connections until `shutdown` resolves. Sessions already
    /// running are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server { listener, state } = self;
        tokio::pin!(shutdown);

        loop {
            let permit = match &state.gate {
                Some(gate) => select! {
                    _ = &mut shutdown => break,
                    permit = Arc::clone(gate).acquire_owned() => Some(permit?),
                },
                None => None,
            };

            select! {
                _ = &mut shutdown => break,
                accept_result = listener.accept() => {
                    handle_accept_result(accept_result, &state, permit);
                }
            }
        }

        info!(profile = state.config.profile.name(), "server shutting down");
        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}

fn handle_accept_result(
    result: std::io::Result<(TcpStream, SocketAddr)>,
    state: &Arc<ServerState>,
    permit: Option<OwnedSemaphorePermit>,
) {
    match result {
        Ok((stream, peer)) => spawn_session(stream, peer, state, permit),
        Err(err) => warn!(error = ?err, "failed to accept connection"),
    }
}

fn spawn_session(
    stream: TcpStream,
    peer: SocketAddr,
    state: &Arc<ServerState>,
    permit: Option<OwnedSemaphorePermit>,
) {
    let state = Arc::clone(state);
    let id = state.next_id();
    info!(session = id, %peer, "client connected");

    tokio::spawn(async move {
        let _permit = permit;
        match handle_connection(stream, &state).await {
            Ok(()) => info!(session = id, %peer, "client disconnected"),
            Err(err) => {
                warn!(session = id, %peer, error = ?err, "client connection closed with error");
            }
        }
    });
}

struct ServerState {
    store: Arc<LineStore>,
    config: ServerConfig,
    gate: Option<Arc<Semaphore>>,
    next_id: AtomicU64,
}

impl ServerState {
    fn new(store: Arc<LineStore>, config: ServerConfig) -> Self {
        let gate = config
            .max_connections
            .map(|limit| Arc::new(Semaphore::new(limit.get())));
        Self {
            store,
            config,
            gate,
            next_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> SessionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

async fn handle_connection(stream: TcpStream, state: &ServerState) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    session::run(&mut reader, &mut writer, &state.store, &state.config).await?;

    if let Err(err) = writer.shutdown().await {
        debug!(error = ?err, "failed to shut down connection cleanly");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Profile;

    #[test]
    fn session_ids_are_unique_and_increasing() {
        let store = Arc::new(LineStore::new("unused.txt"));
        let state = ServerState::new(store, ServerConfig::new(Profile::Logs));

        let first = state.next_id();
        let second = state.next_id();
        assert!(second > first);
        assert!(state.gate.is_none());
    }

    #[test]
    fn connection_limit_sizes_the_gate() {
        let store = Arc::new(LineStore::new("unused.txt"));
        let mut config = ServerConfig::new(Profile::Logs);
        config.max_connections = std::num::NonZeroUsize::new(3);

        let state = ServerState::new(store, config);
        let gate = state.gate.expect("gate should be configured");
        assert_eq!(gate.available_permits(), 3);
    }

    #[tokio::test]
    async fn bind_seeds_store_and_reports_bind_failure() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let mut config = ServerConfig::new(Profile::Logs);
        config.store_path = dir.path().join("logs.txt");
        config.listen = occupied.local_addr().unwrap();

        let err = Server::bind(config.clone()).await.err().expect("port is taken");
        assert!(err.to_string().contains("failed to bind"));
        assert_eq!(
            LineStore::new(&config.store_path).read_all().await.unwrap().len(),
            Profile::Logs.seed_lines().len()
        );
    }
}
