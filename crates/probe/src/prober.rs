//! Probe implementations.

use crate::types::ProbeResult;
use async_trait::async_trait;
use common::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpSocket, TcpStream, lookup_host};
use tokio::time::timeout;
use tracing::{info, warn};

/// Default upper bound for name resolution, separate from the connect timeout
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(2);

/// Liveness probe trait
///
/// Implementations never fail: every connection-layer problem is folded
/// into a `Down` result.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe `hostname:port`, giving up on the handshake after `timeout`
    async fn probe(&self, hostname: &str, port: u16, timeout: Duration) -> ProbeResult;
}

/// Hostname resolution seam
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, hostname: &str, port: u16) -> std::io::Result<Vec<SocketAddr>>;
}

/// Resolver backed by the system's `getaddrinfo`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, hostname: &str, port: u16) -> std::io::Result<Vec<SocketAddr>> {
        Ok(lookup_host((hostname, port)).await?.collect())
    }
}

/// TCP connect prober
///
/// A probe is a plain TCP handshake. The socket has `SO_REUSEADDR` set
/// before connecting and is closed as soon as the attempt finishes.
///
/// Name resolution runs under its own `resolve_timeout`; the probe's
/// `timeout` only bounds the handshake, so a slow DNS answer is not
/// mistaken for a dead service.
#[derive(Clone)]
pub struct TcpProber {
    resolver: Arc<dyn Resolver>,
    resolve_timeout: Duration,
}

impl Default for TcpProber {
    fn default() -> Self {
        Self::new()
    }
}

/// Why an attempt did not produce a connection
enum AttemptError {
    ResolveTimeout,
    ConnectTimeout,
    Failed(Error),
}

impl TcpProber {
    /// Create a new TCP prober using the system resolver
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(SystemResolver))
    }

    /// Create a prober with a custom resolver
    pub fn with_resolver(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            resolver,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    /// Override the name resolution bound
    pub fn with_resolve_timeout(mut self, resolve_timeout: Duration) -> Self {
        self.resolve_timeout = resolve_timeout;
        self
    }

    pub fn resolve_timeout(&self) -> Duration {
        self.resolve_timeout
    }

    async fn resolve(&self, hostname: &str, port: u16) -> Result<Vec<SocketAddr>, AttemptError> {
        let addrs = timeout(self.resolve_timeout, self.resolver.resolve(hostname, port))
            .await
            .map_err(|_| AttemptError::ResolveTimeout)?
            .map_err(|e| AttemptError::Failed(e.into()))?;

        if addrs.is_empty() {
            return Err(AttemptError::Failed(Error::probe(format!(
                "no addresses found for {}",
                hostname
            ))));
        }
        Ok(addrs)
    }

    /// Try each resolved address in order within one handshake budget.
    async fn connect(addrs: &[SocketAddr], budget: Duration) -> Result<TcpStream, AttemptError> {
        let attempt = async {
            let mut last_error = None;
            for addr in addrs {
                match Self::connect_addr(*addr).await {
                    Ok(stream) => return Ok(stream),
                    Err(e) => last_error = Some(e),
                }
            }
            Err(match last_error {
                Some(e) => e.into(),
                None => Error::probe("no addresses to connect to"),
            })
        };

        match timeout(budget, attempt).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(AttemptError::Failed(e)),
            Err(_) => Err(AttemptError::ConnectTimeout),
        }
    }

    async fn connect_addr(addr: SocketAddr) -> std::io::Result<TcpStream> {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.connect(addr).await
    }

    async fn attempt(&self, hostname: &str, port: u16, budget: Duration) -> Result<TcpStream, AttemptError> {
        let addrs = self.resolve(hostname, port).await?;
        Self::connect(&addrs, budget).await
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, hostname: &str, port: u16, timeout_duration: Duration) -> ProbeResult {
        let start = Instant::now();

        match self.attempt(hostname, port, timeout_duration).await {
            Ok(_stream) => {
                let duration = start.elapsed();
                info!(hostname, port, duration_ms = duration.as_millis() as u64, "Service OK");
                ProbeResult::up(duration)
            }
            Err(AttemptError::Failed(e)) => {
                let duration = start.elapsed();
                warn!(hostname, port, error = %e, "Failed to connect");
                ProbeResult::failed(duration, format!("connection failed: {}", e))
            }
            Err(AttemptError::ResolveTimeout) => {
                let duration = start.elapsed();
                warn!(
                    hostname,
                    port,
                    resolve_timeout_ms = self.resolve_timeout.as_millis() as u64,
                    "Name resolution timed out"
                );
                ProbeResult::timeout(duration)
            }
            Err(AttemptError::ConnectTimeout) => {
                let duration = start.elapsed();
                warn!(hostname, port, timeout_ms = timeout_duration.as_millis() as u64, "Connection timed out");
                ProbeResult::timeout(duration)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DownReason, ProbeStatus};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_prober_up_against_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = TcpProber::new()
            .probe("127.0.0.1", port, Duration::from_millis(200))
            .await;

        assert!(result.is_up());
        assert!(result.reason.is_none());
    }

    #[tokio::test]
    async fn test_tcp_prober_refused_is_down() {
        // Grab a free port, then release it so nothing is listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = TcpProber::new()
            .probe("127.0.0.1", port, Duration::from_millis(200))
            .await;

        assert_eq!(result.status, ProbeStatus::Down);
        assert!(matches!(result.reason, Some(DownReason::Failed(_))));
    }

    #[tokio::test]
    async fn test_tcp_prober_unresolvable_host_is_down() {
        let result = TcpProber::new()
            .probe("host.invalid", 80, Duration::from_millis(200))
            .await;

        assert_eq!(result.status, ProbeStatus::Down);
    }

    /// Answers after `delay` with a fixed address list
    struct DelayedResolver {
        delay: Duration,
        addrs: Vec<SocketAddr>,
    }

    #[async_trait]
    impl Resolver for DelayedResolver {
        async fn resolve(&self, _hostname: &str, _port: u16) -> std::io::Result<Vec<SocketAddr>> {
            tokio::time::sleep(self.delay).await;
            Ok(self.addrs.clone())
        }
    }

    #[tokio::test]
    async fn test_slow_resolution_not_charged_to_connect_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let prober = TcpProber::with_resolver(Arc::new(DelayedResolver {
            delay: Duration::from_millis(400),
            addrs: vec![addr],
        }));

        let result = prober
            .probe("slow-dns.example.net", addr.port(), Duration::from_millis(200))
            .await;

        assert!(result.is_up(), "expected UP, got {:?}", result);
        assert!(result.duration >= Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_resolution_past_its_own_bound_is_down() {
        let prober = TcpProber::with_resolver(Arc::new(DelayedResolver {
            delay: Duration::from_secs(5),
            addrs: vec!["127.0.0.1:1".parse().unwrap()],
        }))
        .with_resolve_timeout(Duration::from_millis(100));

        let start = Instant::now();
        let result = prober
            .probe("stuck-dns.example.net", 1, Duration::from_millis(200))
            .await;

        assert_eq!(result.reason, Some(DownReason::Timeout));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_empty_resolution_is_down() {
        let prober = TcpProber::with_resolver(Arc::new(DelayedResolver {
            delay: Duration::ZERO,
            addrs: Vec::new(),
        }));

        let result = prober.probe("empty.example.net", 80, Duration::from_millis(200)).await;

        assert!(matches!(result.reason, Some(DownReason::Failed(_))));
    }

    #[test]
    fn test_default_resolve_timeout() {
        assert_eq!(TcpProber::new().resolve_timeout(), DEFAULT_RESOLVE_TIMEOUT);
    }
}
