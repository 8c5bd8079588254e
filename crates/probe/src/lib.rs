//! TCP liveness probing for Downwatch.
//!
//! A probe is one bounded-time TCP connection attempt against a
//! `hostname:port` pair. The result is either `Up` or `Down`; connection
//! problems (refused, unreachable, unresolvable, timed out) are never
//! surfaced as errors.
//!
//! # Example
//!
//! ```no_run
//! use probe::{Prober, TcpProber};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let prober = TcpProber::new();
//! let result = prober.probe("example.com", 80, Duration::from_millis(200)).await;
//! println!("example.com:80 is {}", result.status);
//! # }
//! ```

pub mod prober;
pub mod types;

pub use prober::{DEFAULT_RESOLVE_TIMEOUT, Prober, Resolver, SystemResolver, TcpProber};
pub use types::{DownReason, ProbeResult, ProbeStatus};
