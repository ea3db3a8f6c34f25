//! Store Module Tests
//!
//! Drives the watchdog state machine with a scripted connector whose health
//! is flipped by the test.
//!
//! ## Test Scopes
//! - **Lifecycle**: fail-fast start, disconnect detection, recovery, close.
//! - **Execute**: refresh-and-retry on connectivity failures only, handle replacement,
//!   one shared refresh for callers failing together.
//! - **Sentinel Failover**: master lookup across a sentinel list, against a
//!   minimal RESP responder on loopback.

#[cfg(test)]
mod tests {
    use crate::store::cache::SentinelConnector;
    use crate::store::error::StoreError;
    use crate::store::watchdog::{Connector, Watchdog, WatchdogConfig};
    use async_trait::async_trait;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::tcp::OwnedReadHalf;
    use tokio::net::{TcpListener, TcpStream};

    /// Hands out numbered generations; refresh fails while unhealthy.
    #[derive(Clone, Default)]
    struct ScriptedConnector {
        unhealthy: Arc<AtomicBool>,
        replace_on_refresh: bool,
        refresh_delay: Duration,
        refreshes: Arc<AtomicU32>,
        in_flight: Arc<AtomicU32>,
        max_in_flight: Arc<AtomicU32>,
        releases: Arc<AtomicU32>,
    }

    impl ScriptedConnector {
        fn set_healthy(&self, healthy: bool) {
            self.unhealthy.store(!healthy, Ordering::SeqCst);
        }

        fn refreshes(&self) -> u32 {
            self.refreshes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        type Handle = u32;

        fn name(&self) -> &str {
            "scripted"
        }

        async fn connect(&self) -> Result<u32, StoreError> {
            if self.unhealthy.load(Ordering::SeqCst) {
                return Err(StoreError::NoReachableEndpoint("scripted".to_string()));
            }
            Ok(0)
        }

        async fn refresh(&self, current: Arc<u32>) -> Result<Option<u32>, StoreError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);
            if !self.refresh_delay.is_zero() {
                tokio::time::sleep(self.refresh_delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.unhealthy.load(Ordering::SeqCst) {
                return Err(StoreError::ConnectionClosed);
            }
            if self.replace_on_refresh {
                Ok(Some(*current + 1))
            } else {
                Ok(None)
            }
        }

        async fn release(&self, _current: Arc<u32>) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn fast_config() -> WatchdogConfig {
        WatchdogConfig {
            reconnect_interval: Duration::from_millis(10),
            loud_failure_every: 5,
        }
    }

    async fn start(connector: &ScriptedConnector) -> Watchdog<ScriptedConnector> {
        Watchdog::start_with(connector.clone(), fast_config())
            .await
            .unwrap()
    }

    async fn wait_active(watchdog: &Watchdog<ScriptedConnector>, expected: bool) -> bool {
        for _ in 0..100 {
            if watchdog.is_active().await == expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Binds a loopback port and frees it again, leaving nothing listening.
    async fn closed_port() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    /// Answers like a sentinel that elects itself as master.
    ///
    /// `SENTINEL ...` gets the responder's own address, `PING` gets `PONG` and
    /// anything else sent during the client handshake gets `OK`.
    async fn spawn_sentinel() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve_sentinel(socket, addr));
            }
        });

        addr
    }

    async fn serve_sentinel(socket: TcpStream, master: SocketAddr) {
        let (read, mut write) = socket.into_split();
        let mut reader = BufReader::new(read);

        while let Some(command) = read_command(&mut reader).await {
            let name = command
                .first()
                .map(|part| part.to_ascii_uppercase())
                .unwrap_or_default();
            let reply = match name.as_str() {
                "SENTINEL" => {
                    let host = master.ip().to_string();
                    let port = master.port().to_string();
                    format!(
                        "*2\r\n${}\r\n{}\r\n${}\r\n{}\r\n",
                        host.len(),
                        host,
                        port.len(),
                        port
                    )
                }
                "PING" => "+PONG\r\n".to_string(),
                _ => "+OK\r\n".to_string(),
            };
            if write.write_all(reply.as_bytes()).await.is_err() {
                return;
            }
        }
    }

    /// Reads one RESP array of bulk strings.
    async fn read_command(reader: &mut BufReader<OwnedReadHalf>) -> Option<Vec<String>> {
        let mut line = String::new();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let count: usize = line.trim_end().strip_prefix('*')?.parse().ok()?;

        let mut parts = Vec::with_capacity(count);
        for _ in 0..count {
            line.clear();
            reader.read_line(&mut line).await.ok()?;
            let len: usize = line.trim_end().strip_prefix('$')?.parse().ok()?;

            let mut data = vec![0u8; len + 2];
            reader.read_exact(&mut data).await.ok()?;
            data.truncate(len);
            parts.push(String::from_utf8(data).ok()?);
        }
        Some(parts)
    }

    // ============================================================
    // LIFECYCLE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_start_fails_fast_when_unreachable() {
        let connector = ScriptedConnector::default();
        connector.set_healthy(false);

        let result = Watchdog::start_with(connector, fast_config()).await;

        assert!(matches!(result, Err(StoreError::NoReachableEndpoint(_))));
    }

    #[tokio::test]
    async fn test_active_after_start() {
        let connector = ScriptedConnector::default();
        let watchdog = start(&connector).await;

        assert!(watchdog.is_active().await);
        assert_eq!(*watchdog.handle(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_then_recover() {
        let connector = ScriptedConnector::default();
        let watchdog = start(&connector).await;

        connector.set_healthy(false);
        watchdog.report_disconnect();
        assert!(!watchdog.is_active().await);

        // Still down after several failed reconnect attempts.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!watchdog.is_active().await);
        assert!(connector.refreshes() >= 2);

        connector.set_healthy(true);
        assert!(wait_active(&watchdog, true).await, "Watchdog should recover");
    }

    #[tokio::test]
    async fn test_repeated_disconnects_start_one_reconnect() {
        let connector = ScriptedConnector::default();
        let watchdog = start(&connector).await;

        connector.set_healthy(false);
        for _ in 0..10 {
            watchdog.report_disconnect();
        }
        tokio::time::sleep(Duration::from_millis(35)).await;

        // One task polling every 10ms makes about four attempts, not forty.
        assert!(connector.refreshes() < 10);
    }

    #[tokio::test]
    async fn test_close_stops_reconnect_and_releases() {
        let connector = ScriptedConnector::default();
        let watchdog = start(&connector).await;

        connector.set_healthy(false);
        watchdog.report_disconnect();
        tokio::time::sleep(Duration::from_millis(30)).await;

        watchdog.close().await;
        assert_eq!(connector.releases.load(Ordering::SeqCst), 1);

        let after_close = connector.refreshes();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(connector.refreshes(), after_close, "Reconnect must stop polling");

        let result = watchdog.execute(|_| async { Ok(()) }).await;
        assert!(matches!(result, Err(StoreError::Closed)));
    }

    #[test]
    fn test_every_fifth_failure_is_loud() {
        let config = WatchdogConfig::default();

        for attempt in [0, 5, 10] {
            assert!(config.is_loud(attempt), "attempt {}", attempt);
        }
        for attempt in 1..5 {
            assert!(!config.is_loud(attempt), "attempt {}", attempt);
        }

        let every = WatchdogConfig {
            loud_failure_every: 0,
            ..fast_config()
        };
        assert!((0..3).all(|attempt| every.is_loud(attempt)));
    }

    // ============================================================
    // EXECUTE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_execute_passes_success_through() {
        let connector = ScriptedConnector::default();
        let watchdog = start(&connector).await;

        let value = watchdog.execute(|handle| async move { Ok(*handle + 41) }).await;

        assert_eq!(value.unwrap(), 41);
        assert_eq!(connector.refreshes(), 0);
    }

    #[tokio::test]
    async fn test_execute_retries_once_after_refresh() {
        let connector = ScriptedConnector::default();
        let watchdog = start(&connector).await;
        let calls = Arc::new(AtomicU32::new(0));

        let result = watchdog
            .execute(|_| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(StoreError::EndOfStream)
                    } else {
                        Ok("second try")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "second try");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(connector.refreshes() >= 1);
        // The disconnect is reported even though the retry worked.
        assert!(wait_active(&watchdog, true).await);
    }

    #[tokio::test]
    async fn test_execute_surfaces_error_when_retry_fails() {
        let connector = ScriptedConnector::default();
        let watchdog = start(&connector).await;
        connector.set_healthy(false);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), StoreError> = watchdog
            .execute(|_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(StoreError::ConnectionClosed)
                }
            })
            .await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "Refresh failed, no retry possible");
        assert!(!watchdog.is_active().await);
    }

    #[tokio::test]
    async fn test_execute_does_not_retry_other_errors() {
        let connector = ScriptedConnector::default();
        let watchdog = start(&connector).await;
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), StoreError> = watchdog
            .execute(|_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(StoreError::Duplicate)
                }
            })
            .await;

        assert!(matches!(result, Err(StoreError::Duplicate)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(connector.refreshes(), 0);
        assert!(watchdog.is_active().await);
    }

    #[tokio::test]
    async fn test_refresh_replaces_handle_whole() {
        let connector = ScriptedConnector {
            replace_on_refresh: true,
            ..Default::default()
        };
        let watchdog = start(&connector).await;

        let seen = watchdog
            .execute(|handle| async move {
                if *handle == 0 {
                    Err(StoreError::ConnectionClosed)
                } else {
                    Ok(*handle)
                }
            })
            .await;

        assert_eq!(seen.unwrap(), 1);
        assert!(*watchdog.handle() >= 1);
    }

    #[tokio::test]
    async fn test_concurrent_failures_share_one_refresh() {
        let connector = ScriptedConnector {
            refresh_delay: Duration::from_millis(20),
            ..Default::default()
        };
        let watchdog = start(&connector).await;

        let calls: Vec<_> = (0..8)
            .map(|_| {
                let failed_once = Arc::new(AtomicBool::new(false));
                let watchdog = &watchdog;
                async move {
                    watchdog
                        .execute(|handle| {
                            let failed_once = failed_once.clone();
                            async move {
                                if failed_once.swap(true, Ordering::SeqCst) {
                                    Ok(*handle)
                                } else {
                                    Err(StoreError::ConnectionClosed)
                                }
                            }
                        })
                        .await
                }
            })
            .collect();
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(connector.max_in_flight.load(Ordering::SeqCst), 1);
        // One refresh for the eight callers, plus at most the reconnect check.
        assert!(connector.refreshes() <= 2, "refreshes: {}", connector.refreshes());
        assert!(wait_active(&watchdog, true).await);
    }

    // ============================================================
    // SENTINEL FAILOVER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_sentinel_empty_list_is_unreachable() {
        let connector = SentinelConnector::new(Vec::new(), "redis-cache-evict");

        let result = connector.connect().await;

        assert!(matches!(result, Err(StoreError::NoReachableEndpoint(_))));
    }

    #[tokio::test]
    async fn test_sentinel_all_down_names_each_sentinel() {
        let first = closed_port().await.to_string();
        let second = closed_port().await.to_string();
        let connector =
            SentinelConnector::new(vec![first.clone(), second.clone()], "redis-cache-evict");

        let result = connector.connect().await;

        match result {
            Err(StoreError::NoReachableEndpoint(message)) => {
                assert!(message.contains(&first), "{}", message);
                assert!(message.contains(&second), "{}", message);
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("no sentinel is listening"),
        }
    }

    #[tokio::test]
    async fn test_sentinel_skips_dead_entry() {
        let dead = closed_port().await.to_string();
        let live = spawn_sentinel().await;
        let connector = SentinelConnector::new(vec![dead, live.to_string()], "redis-cache-evict");

        let client = connector.connect().await.unwrap();

        assert_eq!(client.master_addr, live.to_string());
    }
}
