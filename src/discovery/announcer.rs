use super::codec;
use super::types::Announcement;

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

pub const ANNOUNCE_INTERVAL: Duration = Duration::from_millis(500);

/// Broadcasts a fixed announcement on every tick.
///
/// The payload is encoded once in [`Announcer::new`]; a worker never changes
/// its announced identity while running.
pub struct Announcer {
    target: SocketAddr,
    payload: Vec<u8>,
    interval: Duration,
}

impl Announcer {
    pub fn new(announcement: &Announcement, target: SocketAddr) -> Result<Self, bincode::Error> {
        Ok(Self {
            target,
            payload: codec::encode(announcement)?,
            interval: ANNOUNCE_INTERVAL,
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawns the announce loop. Failures are logged and retried on the next tick.
    pub fn start(self) -> JoinHandle<()> {
        tracing::info!(
            "Announcing {} bytes to {} every {:?}",
            self.payload.len(),
            self.target,
            self.interval
        );

        tokio::spawn(async move {
            self.announce_loop().await;
        })
    }

    async fn announce_loop(self) {
        let mut interval = tokio::time::interval(self.interval);
        let mut socket: Option<UdpSocket> = None;

        loop {
            interval.tick().await;

            if socket.is_none() {
                match self.dial().await {
                    Ok(dialed) => socket = Some(dialed),
                    Err(e) => {
                        tracing::error!("Error while dialing udp addr {}: {}", self.target, e);
                        continue;
                    }
                }
            }

            let sent = match &socket {
                Some(connected) => connected.send(&self.payload).await,
                None => continue,
            };

            match sent {
                Ok(n) if n < self.payload.len() => {
                    tracing::error!(
                        "Short write to udp socket: {} of {} bytes",
                        n,
                        self.payload.len()
                    );
                    socket = None;
                }
                Ok(_) => {
                    tracing::trace!("Announced to {}", self.target);
                }
                Err(e) => {
                    tracing::error!("Error writing to udp socket: {}", e);
                    socket = None;
                }
            }
        }
    }

    async fn dial(&self) -> io::Result<UdpSocket> {
        let local: SocketAddr = if self.target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(self.target).await?;
        Ok(socket)
    }
}
