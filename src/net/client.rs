//! UDP transport between the two peers
//!
//! The tick loop pushes one snapshot per tick with a non-blocking send. A background
//! task receives the opponent's datagrams and parks the newest state in a
//! last-write-wins slot that the tick drains.

use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::util::rate_limit::PeerRateLimiter;

use super::protocol::{BulletRecord, PeerMsg, ShipState};

/// Largest datagram we accept
pub const MAX_DATAGRAM: usize = 64 * 1024;

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed datagram: {0}")]
    Decode(#[source] serde_json::Error),
}

pub fn encode_datagram(msg: &PeerMsg) -> Result<Vec<u8>, TransportError> {
    serde_json::to_vec(msg).map_err(TransportError::Encode)
}

pub fn decode_datagram(bytes: &[u8]) -> Result<PeerMsg, TransportError> {
    serde_json::from_slice(bytes).map_err(TransportError::Decode)
}

/// Everything received since the previous drain
#[derive(Debug, Default)]
pub struct Inbound {
    /// Newest opponent state with its sender tick
    pub snapshot: Option<(u64, ShipState)>,
    /// Opponent bullets staged from that snapshot
    pub bullets: Option<Vec<BulletRecord>>,
    pub peer_left: bool,
}

/// Newest snapshot and the bullets split off it, swapped as one unit
#[derive(Debug, Default)]
struct Staged {
    snapshot: Option<(u64, ShipState)>,
    bullets: Option<Vec<BulletRecord>>,
}

/// Shared landing area between the receive task and the tick loop
#[derive(Debug, Default)]
pub struct PeerInbox {
    staged: Mutex<Staged>,
    peer_left: AtomicBool,
}

impl PeerInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a received message, replacing any undrained snapshot
    pub fn store(&self, msg: PeerMsg) {
        match msg {
            PeerMsg::Snapshot { tick, mut state } => {
                let bullets = std::mem::take(&mut state.bullets);
                *self.staged.lock() = Staged {
                    snapshot: Some((tick, state)),
                    bullets: Some(bullets),
                };
            }
            PeerMsg::Leave { reason } => {
                info!(reason = %reason, "Peer left the match");
                self.peer_left.store(true, Ordering::Release);
            }
        }
    }

    /// Move out whatever arrived since the last call
    pub fn drain(&self) -> Inbound {
        let Staged { snapshot, bullets } = std::mem::take(&mut *self.staged.lock());
        Inbound {
            snapshot,
            bullets,
            peer_left: self.peer_left.load(Ordering::Acquire),
        }
    }
}

/// One peer's end of the match connection
pub struct GameClient {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    inbox: Arc<PeerInbox>,
    stopped: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl GameClient {
    /// Bind the local socket; nothing is received until `start`
    pub async fn bind(local: SocketAddr, peer: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(local).await?;
        Self::from_socket(socket, peer)
    }

    /// Wrap an already bound socket
    pub fn from_socket(socket: UdpSocket, peer: SocketAddr) -> Result<Self, TransportError> {
        info!(local = %socket.local_addr()?, peer = %peer, "Peer socket bound");
        Ok(Self {
            socket: Arc::new(socket),
            peer,
            inbox: Arc::new(PeerInbox::new()),
            stopped: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            task: None,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn inbox(&self) -> Arc<PeerInbox> {
        self.inbox.clone()
    }

    /// Spawn the background receive task
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        self.stopped.store(false, Ordering::Release);
        let task = tokio::spawn(receive_loop(
            self.socket.clone(),
            self.peer,
            self.inbox.clone(),
            self.stopped.clone(),
            self.shutdown.clone(),
            PeerRateLimiter::new(),
        ));
        self.task = Some(task);
    }

    /// Fire-and-forget send; a full socket buffer drops the datagram
    pub fn send(&self, msg: &PeerMsg) -> Result<(), TransportError> {
        let bytes = encode_datagram(msg)?;
        match self.socket.try_send_to(&bytes, self.peer) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                debug!(peer = %self.peer, "Socket busy, datagram dropped");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stop the receive task and wait for it to exit
    pub async fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        self.shutdown.notify_one();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!(error = %e, "Receive task ended abnormally");
            }
        }
    }
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    inbox: Arc<PeerInbox>,
    stopped: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    limiter: PeerRateLimiter,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    while !stopped.load(Ordering::Acquire) {
        let (len, from) = tokio::select! {
            _ = shutdown.notified() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok(received) => received,
                Err(e) => {
                    debug!(error = %e, "UDP receive failed");
                    continue;
                }
            },
        };

        if from != peer {
            debug!(from = %from, "Datagram from unknown sender ignored");
            continue;
        }
        if !limiter.check_packet() {
            warn!(peer = %peer, "Rate limited peer datagram");
            continue;
        }

        match decode_datagram(&buf[..len]) {
            Ok(msg) => inbox.store(msg),
            Err(e) => warn!(peer = %peer, error = %e, "Failed to decode peer datagram"),
        }
    }

    debug!(peer = %peer, "Receive task stopped");
}
