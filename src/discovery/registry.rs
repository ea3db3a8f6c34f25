use super::codec;
use super::types::{Announcement, RegistryEntry};
use crate::content::types::ContentType;

use anyhow::Result;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};

pub const SWEEP_INTERVAL: Duration = Duration::from_millis(500);
pub const LIVENESS_WINDOW: Duration = Duration::from_secs(2);

const DATAGRAM_BUFFER_SIZE: usize = 1024;
const COMMAND_QUEUE_LEN: usize = 1024;

/// The live worker set.
///
/// Only the registry control loop owns an instance, so ingestion, eviction and
/// queries never interleave.
#[derive(Debug)]
pub struct RegistryState {
    entries: Vec<RegistryEntry>,
    liveness_window: Duration,
}

impl RegistryState {
    pub fn new(liveness_window: Duration) -> Self {
        Self {
            entries: Vec::new(),
            liveness_window,
        }
    }

    /// Records an announcement. Returns `true` when it created a new entry.
    pub fn ingest(&mut self, announcement: Announcement, source: SocketAddr, now: Instant) -> bool {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.announcement.same_worker(&announcement))
        {
            entry.last_seen = now;
            return false;
        }

        tracing::debug!(
            "Parser added: {} ({}) at {}:{}",
            announcement.name,
            announcement.content_type,
            announcement.http_host,
            announcement.http_port
        );
        self.entries.push(RegistryEntry {
            announcement,
            last_seen: now,
            source_addr: source,
        });
        true
    }

    /// Drops every entry silent for at least the liveness window and returns them.
    pub fn evict(&mut self, now: Instant) -> Vec<RegistryEntry> {
        let window = self.liveness_window;
        let (alive, stale): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|entry| now.duration_since(entry.last_seen) < window);
        self.entries = alive;
        stale
    }

    /// Entries of `content_type` in storage order; empty for an unknown type.
    pub fn query(&self, content_type: &str) -> Vec<RegistryEntry> {
        if ContentType::from_str(content_type).is_err() {
            return Vec::new();
        }

        self.entries
            .iter()
            .filter(|entry| entry.announcement.content_type == content_type)
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

enum RegistryCommand {
    Query {
        content_type: String,
        reply: oneshot::Sender<Vec<RegistryEntry>>,
    },
}

/// Handle used to query a running registry.
#[derive(Clone)]
pub struct Registry {
    commands: mpsc::Sender<RegistryCommand>,
}

impl Registry {
    /// Snapshot of the live workers serving `content_type`.
    pub async fn query(&self, content_type: &str) -> Vec<RegistryEntry> {
        let (reply, answer) = oneshot::channel();
        let command = RegistryCommand::Query {
            content_type: content_type.to_string(),
            reply,
        };

        if self.commands.send(command).await.is_err() {
            tracing::error!("Registry control loop is not running");
            return Vec::new();
        }
        answer.await.unwrap_or_default()
    }
}

/// Listens for announcements and keeps the live worker set.
pub struct RegistryService {
    socket: UdpSocket,
    state: RegistryState,
    sweep_interval: Duration,
}

impl RegistryService {
    /// Binds the discovery socket, joining the multicast group when `bind_addr` is one.
    ///
    /// `interface` is an interface name or an IPv4 address; empty means any.
    pub async fn bind(bind_addr: SocketAddr, interface: &str) -> Result<Self> {
        let socket = match bind_addr.ip() {
            IpAddr::V4(group) if group.is_multicast() => {
                let local = resolve_interface(interface)?;
                let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, bind_addr.port())).await?;
                socket.join_multicast_v4(group, local)?;
                tracing::info!("Joined multicast group {} on {}", group, local);
                socket
            }
            _ => UdpSocket::bind(bind_addr).await?,
        };

        Ok(Self {
            socket,
            state: RegistryState::new(LIVENESS_WINDOW),
            sweep_interval: SWEEP_INTERVAL,
        })
    }

    pub fn with_timing(mut self, sweep_interval: Duration, liveness_window: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self.state.liveness_window = liveness_window;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns the control loop. It stops once every [`Registry`] handle is dropped.
    pub fn start(self) -> Registry {
        let (commands, queue) = mpsc::channel(COMMAND_QUEUE_LEN);

        tokio::spawn(async move {
            self.control_loop(queue).await;
        });

        Registry { commands }
    }

    async fn control_loop(self, mut queue: mpsc::Receiver<RegistryCommand>) {
        let RegistryService {
            socket,
            mut state,
            sweep_interval,
        } = self;
        let mut buf = vec![0u8; DATAGRAM_BUFFER_SIZE];
        let mut sweep = tokio::time::interval(sweep_interval);

        tracing::info!("Registry listening on {:?}", socket.local_addr());

        loop {
            tokio::select! {
                received = socket.recv_from(&mut buf) => match received {
                    Ok((len, src)) => match codec::decode(&buf[..len]) {
                        Ok(announcement) => {
                            state.ingest(announcement, src, Instant::now());
                        }
                        Err(e) => {
                            tracing::warn!("Dropping announcement from {}: {}", src, e);
                        }
                    },
                    Err(e) => {
                        tracing::error!("Reading from udp socket error: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },

                command = queue.recv() => match command {
                    Some(RegistryCommand::Query { content_type, reply }) => {
                        let _ = reply.send(state.query(&content_type));
                    }
                    None => {
                        tracing::info!("All registry handles dropped, stopping");
                        break;
                    }
                },

                _ = sweep.tick() => {
                    for entry in state.evict(Instant::now()) {
                        tracing::debug!(
                            "Parser removed: {} ({}) silent for {:?}",
                            entry.announcement.name,
                            entry.announcement.content_type,
                            entry.last_seen.elapsed()
                        );
                    }
                }
            }
        }
    }
}

fn resolve_interface(interface: &str) -> Result<Ipv4Addr> {
    if interface.is_empty() {
        return Ok(Ipv4Addr::UNSPECIFIED);
    }
    if let Ok(addr) = interface.parse::<Ipv4Addr>() {
        return Ok(addr);
    }

    for ifaddr in nix::ifaddrs::getifaddrs()? {
        if ifaddr.interface_name != interface {
            continue;
        }
        if let Some(inet) = ifaddr.address.as_ref().and_then(|addr| addr.as_sockaddr_in()) {
            return Ok(inet.ip());
        }
    }

    anyhow::bail!("interface {} has no IPv4 address", interface)
}
