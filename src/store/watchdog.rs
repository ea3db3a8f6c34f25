//! Resilient Connection Watchdog
//!
//! Keeps one backing-store handle usable across transient outages.
//!
//! ## Lifecycle
//! - **Active**: the initial state after a successful [`Watchdog::start`].
//! - **Disconnected**: entered on the first disconnect event. A reconnect task
//!   polls the [`Connector`] every `reconnect_interval` until it succeeds, then
//!   the keeper moves back to `Active`.
//!
//! The `active` flag is owned by a single keeper task and is only read or
//! written through its command queue. The handle itself lives in an
//! [`ArcSwap`], so a reconnect replaces it as a whole and readers observe
//! either the old or the new client.

use super::error::StoreError;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(1);
/// Only every n-th failed reconnect attempt is logged as an error.
pub const LOUD_FAILURE_EVERY: u32 = 5;

/// Dials and re-validates one kind of backing store.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Handle: Send + Sync + 'static;

    /// Store name used in log lines.
    fn name(&self) -> &str;

    /// Establishes a brand new handle.
    async fn connect(&self) -> Result<Self::Handle, StoreError>;

    /// Makes the store usable again after a connectivity failure.
    ///
    /// Returns `Ok(None)` when `current` is still valid and `Ok(Some(_))`
    /// with a replacement handle otherwise.
    async fn refresh(&self, current: Arc<Self::Handle>)
    -> Result<Option<Self::Handle>, StoreError>;

    /// Releases the resources held by `current`.
    async fn release(&self, _current: Arc<Self::Handle>) {}
}

#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    pub reconnect_interval: Duration,
    pub loud_failure_every: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            reconnect_interval: RECONNECT_INTERVAL,
            loud_failure_every: LOUD_FAILURE_EVERY,
        }
    }
}

impl WatchdogConfig {
    /// Whether failed reconnect `attempt` (0-based) is logged as an error.
    pub fn is_loud(&self, attempt: u32) -> bool {
        attempt % self.loud_failure_every.max(1) == 0
    }
}

/// Serializes refreshes of one handle.
///
/// `generation` counts finished refresh attempts, so a caller that waited
/// for the lock can tell that the handle was refreshed after it failed.
#[derive(Default)]
struct RefreshGate {
    lock: Mutex<()>,
    generation: AtomicU64,
}

impl RefreshGate {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Runs one refresh under the lock and stores a replacement handle.
    async fn refresh<C: Connector>(
        &self,
        connector: &C,
        handle: &ArcSwap<C::Handle>,
    ) -> Result<Arc<C::Handle>, StoreError> {
        let _guard = self.lock.lock().await;
        self.refresh_locked(connector, handle).await
    }

    /// Like [`RefreshGate::refresh`], unless a refresh finished after `seen`.
    async fn refresh_since<C: Connector>(
        &self,
        connector: &C,
        handle: &ArcSwap<C::Handle>,
        seen: u64,
    ) -> Result<Arc<C::Handle>, StoreError> {
        let _guard = self.lock.lock().await;
        if self.generation() != seen {
            return Ok(handle.load_full());
        }
        self.refresh_locked(connector, handle).await
    }

    async fn refresh_locked<C: Connector>(
        &self,
        connector: &C,
        handle: &ArcSwap<C::Handle>,
    ) -> Result<Arc<C::Handle>, StoreError> {
        let outcome = connector.refresh(handle.load_full()).await;
        self.generation.fetch_add(1, Ordering::AcqRel);

        match outcome? {
            Some(fresh) => {
                let fresh = Arc::new(fresh);
                handle.store(fresh.clone());
                Ok(fresh)
            }
            None => Ok(handle.load_full()),
        }
    }
}

enum Command {
    IsActive(oneshot::Sender<bool>),
    Disconnected,
    Reconnected,
    Close,
}

pub struct Watchdog<C: Connector> {
    connector: Arc<C>,
    handle: Arc<ArcSwap<C::Handle>>,
    gate: Arc<RefreshGate>,
    commands: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
}

impl<C: Connector> Watchdog<C> {
    pub async fn start(connector: C) -> Result<Self, StoreError> {
        Self::start_with(connector, WatchdogConfig::default()).await
    }

    /// Connects once and spawns the keeper. Fails fast when the first dial fails.
    pub async fn start_with(connector: C, config: WatchdogConfig) -> Result<Self, StoreError> {
        let handle = connector.connect().await?;
        tracing::info!("{} connected", connector.name());

        let connector = Arc::new(connector);
        let handle = Arc::new(ArcSwap::from_pointee(handle));
        let gate = Arc::new(RefreshGate::default());
        let (commands, queue) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        let keeper = ConnectionKeeper {
            connector: connector.clone(),
            handle: handle.clone(),
            gate: gate.clone(),
            events: commands.clone(),
            queue,
            shutdown: shutdown.clone(),
            config,
        };
        tokio::spawn(keeper.run());

        Ok(Self {
            connector,
            handle,
            gate,
            commands,
            shutdown,
        })
    }

    /// Asks the keeper for the current state.
    pub async fn is_active(&self) -> bool {
        let (reply, answer) = oneshot::channel();
        if self.commands.send(Command::IsActive(reply)).is_err() {
            return false;
        }
        answer.await.unwrap_or(false)
    }

    pub fn report_disconnect(&self) {
        let _ = self.commands.send(Command::Disconnected);
    }

    /// The handle currently in use.
    pub fn handle(&self) -> Arc<C::Handle> {
        self.handle.load_full()
    }

    /// Runs `op` against the current handle.
    ///
    /// A retryable failure triggers one in-place refresh followed by one retry,
    /// and a disconnect event whatever the retry outcome. Refreshes are
    /// serialized: callers that failed together share a single refresh.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T, StoreError>
    where
        F: Fn(Arc<C::Handle>) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        if self.shutdown.is_cancelled() {
            return Err(StoreError::Closed);
        }

        let seen = self.gate.generation();
        match op(self.handle.load_full()).await {
            Err(err) if err.is_retryable() => {
                tracing::warn!(
                    "{} operation failed ({}), refreshing connection",
                    self.connector.name(),
                    err
                );

                let retried = match self
                    .gate
                    .refresh_since(self.connector.as_ref(), &self.handle, seen)
                    .await
                {
                    Ok(fresh) => op(fresh).await,
                    Err(refresh_err) => Err(refresh_err),
                };

                if let Err(e) = &retried {
                    tracing::error!("{} retry attempt failed: {}", self.connector.name(), e);
                }
                self.report_disconnect();
                retried
            }
            other => other,
        }
    }

    /// Stops any reconnect in flight, stops the keeper and releases the handle.
    pub async fn close(&self) {
        tracing::info!("Closing {}", self.connector.name());
        self.shutdown.cancel();
        let _ = self.commands.send(Command::Close);
        self.connector.release(self.handle.load_full()).await;
    }
}

/// Single owner of the `active` flag.
struct ConnectionKeeper<C: Connector> {
    connector: Arc<C>,
    handle: Arc<ArcSwap<C::Handle>>,
    gate: Arc<RefreshGate>,
    events: mpsc::UnboundedSender<Command>,
    queue: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
    config: WatchdogConfig,
}

impl<C: Connector> ConnectionKeeper<C> {
    async fn run(mut self) {
        let mut active = true;

        while let Some(command) = self.queue.recv().await {
            match command {
                Command::IsActive(reply) => {
                    let _ = reply.send(active);
                }
                Command::Disconnected => {
                    if active {
                        tracing::error!("*** {} connection is lost! ***", self.connector.name());
                        active = false;
                        self.spawn_reconnect();
                    }
                }
                Command::Reconnected => {
                    active = true;
                    tracing::info!("{} connection is restored", self.connector.name());
                }
                Command::Close => break,
            }
        }

        tracing::debug!("{} keeper stopped", self.connector.name());
    }

    fn spawn_reconnect(&self) {
        let connector = self.connector.clone();
        let handle = self.handle.clone();
        let gate = self.gate.clone();
        let events = self.events.clone();
        let cancel = self.shutdown.child_token();
        let config = self.config.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(config.reconnect_interval);

            for attempt in 0u32.. {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("{} reconnect abandoned", connector.name());
                        return;
                    }
                    _ = interval.tick() => {}
                }

                let outcome = tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("{} reconnect abandoned", connector.name());
                        return;
                    }
                    outcome = gate.refresh(connector.as_ref(), &handle) => outcome,
                };

                match outcome {
                    Ok(_) => {
                        let _ = events.send(Command::Reconnected);
                        return;
                    }
                    Err(e) if config.is_loud(attempt) => {
                        tracing::error!(
                            "{} reconnect attempt {} failed: {}",
                            connector.name(),
                            attempt + 1,
                            e
                        );
                    }
                    Err(e) => {
                        tracing::debug!(
                            "{} reconnect attempt {} failed: {}",
                            connector.name(),
                            attempt + 1,
                            e
                        );
                    }
                }
            }
        });
    }
}
