use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ConfigError};
use crate::duid::{DuidError, DuidFactory};
use crate::hooks::{HookError, HooksManager};
use crate::nic::{Listener, NicError, OutPacket, RawPacket};
use crate::ping::Pinger;
use crate::rpc::RpcClient;
use crate::server::{Dhcpv4Server, ServerStats};
use crate::QUEUE_SIZE_PER_WORKER;

const DEFAULT_DUID_FILE: &str = "/var/lib/ember-dhcpd/duid";
const DEFAULT_PING_TIMEOUT: u32 = 1;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Hooks(#[from] HookError),

    #[error(transparent)]
    Duid(#[from] DuidError),

    #[error(transparent)]
    Nic(#[from] NicError),

    #[error("No interfaces configured under dhcp4.interfaces-config.interfaces")]
    NoInterfaces,
}

struct RunningState {
    recv_cancel: CancellationToken,
    rpc_cancel: CancellationToken,
    receiver_tasks: Vec<JoinHandle<()>>,
    worker_tasks: Vec<JoinHandle<()>>,
    rpc_task: JoinHandle<()>,
    transmitter_task: JoinHandle<()>,
    ingress_tx: mpsc::Sender<Option<RawPacket>>,
    egress_tx: mpsc::Sender<Option<OutPacket>>,
    stats: Arc<ServerStats>,
    workers: usize,
}

/// Owns the running server: builds the immutable configuration set,
/// spawns the receiver/worker/transmitter/RPC tasks, and drives the
/// shutdown and reconfiguration sequences.
pub struct ControlledServer {
    config_path: PathBuf,
    config: Config,
    state: Option<RunningState>,
}

impl ControlledServer {
    pub fn new(config_path: impl Into<PathBuf>) -> Result<Self, RuntimeError> {
        let config_path = config_path.into();
        let config = Config::from_file(&config_path)?;
        Ok(Self::with_config(config_path, config))
    }

    /// Adopt an already-parsed configuration document.
    pub fn with_config(config_path: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            config_path: config_path.into(),
            config,
            state: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_some()
    }

    pub async fn start(&mut self) -> Result<(), RuntimeError> {
        if self.state.is_some() {
            return Ok(());
        }
        let state = launch(&self.config).await?;
        self.state = Some(state);
        Ok(())
    }

    /// Orderly shutdown: stop the receivers, queue one sentinel per
    /// worker behind whatever ingress is left so the backlog still gets
    /// answered, stop the RPC client once the workers are done, drain
    /// egress through the transmitter, then join everything. Sockets
    /// close when the state drops.
    pub async fn stop(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };

        state.recv_cancel.cancel();
        for task in state.receiver_tasks {
            let _ = task.await;
        }

        for _ in 0..state.workers {
            let _ = state.ingress_tx.send(None).await;
        }
        for task in state.worker_tasks {
            let _ = task.await;
        }

        state.rpc_cancel.cancel();
        let _ = state.rpc_task.await;

        let _ = state.egress_tx.send(None).await;
        let _ = state.transmitter_task.await;

        info!(stats = %state.stats, "server stopped");
    }

    /// Reload the configuration file and restart. A configuration that
    /// fails to parse or start is discarded and the previous one brought
    /// back.
    pub async fn reconfig(&mut self) -> Result<(), RuntimeError> {
        self.stop().await;

        let error = match Config::from_file(&self.config_path) {
            Ok(new_config) => match launch(&new_config).await {
                Ok(state) => {
                    self.config = new_config;
                    self.state = Some(state);
                    info!("reconfiguration complete");
                    return Ok(());
                }
                Err(error) => error,
            },
            Err(error) => RuntimeError::Config(error),
        };

        warn!(%error, "reconfiguration failed, restoring previous configuration");
        self.state = Some(launch(&self.config).await?);
        Err(error)
    }
}

async fn launch(config: &Config) -> Result<RunningState, RuntimeError> {
    let dhcp4 = &config.dhcp4;

    let defs = Arc::new(dhcp4.build_option_defs()?);
    let classifier = Arc::new(dhcp4.build_classifier(&defs)?);
    let subnets = Arc::new(dhcp4.build_subnets(&defs)?);

    let mut hooks = HooksManager::new();
    for library in &dhcp4.hooks_libraries {
        hooks.load_library(&library.library, library.parameters.clone())?;
    }
    let hooks = Arc::new(hooks);

    let duid_file = dhcp4
        .duid_file
        .clone()
        .unwrap_or_else(|| Path::new(DEFAULT_DUID_FILE).to_path_buf());
    let duid = DuidFactory::new(duid_file).get()?;
    info!(%duid, "server identity");

    let bindings = dhcp4.interfaces_config.bindings();
    if bindings.is_empty() {
        return Err(RuntimeError::NoInterfaces);
    }
    let port = dhcp4.listen_port();
    let mut listeners = Vec::with_capacity(bindings.len());
    for (iface, addr) in &bindings {
        listeners.push(Arc::new(Listener::open(iface, *addr, port)?));
    }
    let server_ids = listeners.iter().map(|l| l.addr()).collect();

    let workers = dhcp4.worker_count.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let capacity = workers * QUEUE_SIZE_PER_WORKER;
    let (ingress_tx, ingress_rx) = mpsc::channel(capacity);
    let ingress_rx = Arc::new(Mutex::new(ingress_rx));
    let (egress_tx, mut egress_rx) = mpsc::channel(capacity);

    let recv_cancel = CancellationToken::new();
    let rpc_cancel = CancellationToken::new();

    let (master_host, master_port) = dhcp4.master_endpoint();
    let (rpc_handle, rpc_client) = RpcClient::new(&master_host, master_port, rpc_cancel.clone());
    let rpc_task = tokio::spawn(rpc_client.run());

    let pinger = Pinger::new(
        dhcp4.ping_check.enable,
        dhcp4.ping_check.timeout.unwrap_or(DEFAULT_PING_TIMEOUT),
    );

    let stats = Arc::new(ServerStats::default());
    let subnet_count = subnets.len();
    let server = Dhcpv4Server::new(
        defs,
        subnets,
        classifier,
        hooks,
        Arc::new(rpc_handle),
        Arc::new(pinger),
        stats.clone(),
        egress_tx.clone(),
        server_ids,
    );

    let mut receiver_tasks = Vec::with_capacity(listeners.len());
    for listener in &listeners {
        let listener = listener.clone();
        let tx = ingress_tx.clone();
        let cancel = recv_cancel.clone();
        receiver_tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = listener.recv() => match received {
                        Ok(packet) => {
                            if tx.send(Some(packet)).await.is_err() {
                                break;
                            }
                        }
                        Err(error) => {
                            error!(iface = listener.iface(), %error, "receive failed");
                        }
                    }
                }
            }
            debug!(iface = listener.iface(), "receiver stopped");
        }));
    }

    let mut worker_tasks = Vec::with_capacity(workers);
    for worker_id in 0..workers {
        let ingress_rx = ingress_rx.clone();
        let server = server.clone();
        worker_tasks.push(tokio::spawn(async move {
            loop {
                let item = { ingress_rx.lock().await.recv().await };
                match item {
                    Some(Some(packet)) => server.process_packet(packet).await,
                    Some(None) | None => break,
                }
            }
            debug!(worker_id, "worker stopped");
        }));
    }

    let transmit_listeners = listeners.clone();
    let transmitter_task = tokio::spawn(async move {
        while let Some(Some(packet)) = egress_rx.recv().await {
            let listener = transmit_listeners
                .iter()
                .find(|l| l.iface() == packet.iface)
                .or_else(|| transmit_listeners.first());
            let Some(listener) = listener else {
                continue;
            };
            if let Err(error) = listener.send(&packet).await {
                error!(dest = %packet.dest, %error, "socket write failed");
            }
        }
        debug!("transmitter stopped");
    });

    info!(
        workers,
        listeners = listeners.len(),
        subnet_count,
        "server running"
    );

    Ok(RunningState {
        recv_cancel,
        rpc_cancel,
        receiver_tasks,
        worker_tasks,
        rpc_task,
        transmitter_task,
        ingress_tx,
        egress_tx,
        stats,
        workers,
    })
}
