//! Locating the controller via service advertisements.
//!
//! # Flow
//!
//! ```text
//! ServiceBrowser::browse(service_type) ──▶ BrowseSession (one-shot receiver)
//!        │
//!        ▼
//! discover(): recv_timeout(poll_interval)
//!        ├─ advertisement → DeviceEndpoint
//!        ├─ nothing yet   → log, check stop flag / deadline, retry
//!        └─ browser gone  → DiscoveryError::BrowserClosed
//!
//! BrowseSession dropped (any exit path) ──▶ browse stopped
//! ```
//!
//! There is no built-in deadline: callers choose between waiting forever
//! (`timeout: None`) and an explicit bound.

pub mod mdns;

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant, SystemTime};

use thiserror::Error;

pub use mdns::MdnsBrowser;

/// Port the controller firmware listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 7778;

// ---------------------------------------------------------------------------
// PortPolicy / Advertisement / DeviceEndpoint
// ---------------------------------------------------------------------------

/// How the destination port is chosen once a device is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortPolicy {
    /// Ignore the advertised port and use this one.
    Fixed(u16),
    /// Use the port carried by the advertisement.
    Advertised,
}

/// A resolved service advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Full instance name, e.g. `led-strip._led-audio._udp.local.`.
    pub instance: String,
    pub addresses: Vec<IpAddr>,
    pub port: u16,
}

/// Where frames are sent for the lifetime of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoint {
    pub address: IpAddr,
    pub port: u16,
    pub instance: String,
    pub discovered_at: SystemTime,
}

impl DeviceEndpoint {
    /// Build an endpoint from an advertisement, preferring IPv4 addresses.
    ///
    /// Returns `None` when the advertisement carries no address.
    pub fn from_advertisement(ad: &Advertisement, policy: PortPolicy) -> Option<Self> {
        let address = ad
            .addresses
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| ad.addresses.first())
            .copied()?;

        let port = match policy {
            PortPolicy::Fixed(port) => port,
            PortPolicy::Advertised => ad.port,
        };

        Some(Self {
            address,
            port,
            instance: ad.instance.clone(),
            discovered_at: SystemTime::now(),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

// ---------------------------------------------------------------------------
// DiscoveryError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("mDNS daemon error: {0}")]
    Mdns(#[from] mdns_sd::Error),

    #[error("no device advertised {service_type} within {waited:?}")]
    TimedOut {
        service_type: String,
        waited: Duration,
    },

    #[error("discovery cancelled")]
    Cancelled,

    #[error("service browser stopped before a device was found")]
    BrowserClosed,
}

// ---------------------------------------------------------------------------
// ServiceBrowser
// ---------------------------------------------------------------------------

/// Source of resolved advertisements for a service type.
pub trait ServiceBrowser: Send + Sync {
    /// Start browsing `service_type`.
    ///
    /// Resolved advertisements are delivered through the returned session;
    /// its sender is dropped when the browser gives up.  Dropping the
    /// session ends the browse.
    fn browse(&self, service_type: &str) -> Result<BrowseSession, DiscoveryError>;
}

type Cleanup = Box<dyn FnOnce() + Send>;

/// One running browse.  Runs its cleanup exactly once, when dropped.
pub struct BrowseSession {
    rx: mpsc::Receiver<Advertisement>,
    cleanup: Option<Cleanup>,
}

impl BrowseSession {
    /// A session with nothing to release.
    pub fn new(rx: mpsc::Receiver<Advertisement>) -> Self {
        Self { rx, cleanup: None }
    }

    /// A session that calls `cleanup` when it goes out of scope.
    pub fn with_cleanup<F>(rx: mpsc::Receiver<Advertisement>, cleanup: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            rx,
            cleanup: Some(Box::new(cleanup)),
        }
    }

    pub fn recv_timeout(&self, wait: Duration) -> Result<Advertisement, mpsc::RecvTimeoutError> {
        self.rx.recv_timeout(wait)
    }
}

impl Drop for BrowseSession {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl std::fmt::Debug for BrowseSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowseSession")
            .field("cleanup", &self.cleanup.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// discover
// ---------------------------------------------------------------------------

/// Parameters for one [`discover`] call.
#[derive(Debug, Clone)]
pub struct DiscoveryRequest {
    pub service_type: String,
    pub port: PortPolicy,
    /// How long each wait lasts before logging and re-checking the stop
    /// flag.
    pub poll_interval: Duration,
    /// `None` waits until an advertisement arrives or `cancel` is set.
    pub timeout: Option<Duration>,
}

/// Block until a device advertising `request.service_type` is found.
///
/// `cancel` is checked once per poll interval.  The browse is stopped on
/// every return path.
pub fn discover(
    browser: &dyn ServiceBrowser,
    request: &DiscoveryRequest,
    cancel: &AtomicBool,
) -> Result<DeviceEndpoint, DiscoveryError> {
    let session = browser.browse(&request.service_type)?;
    let started = Instant::now();

    loop {
        if cancel.load(Ordering::SeqCst) {
            return Err(DiscoveryError::Cancelled);
        }

        let wait = match request.timeout {
            Some(limit) => {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(DiscoveryError::TimedOut {
                        service_type: request.service_type.clone(),
                        waited: elapsed,
                    });
                }
                request.poll_interval.min(limit - elapsed)
            }
            None => request.poll_interval,
        };

        match session.recv_timeout(wait) {
            Ok(ad) => match DeviceEndpoint::from_advertisement(&ad, request.port) {
                Some(endpoint) => {
                    log::info!(
                        "device found: {} at {}",
                        endpoint.instance,
                        endpoint.socket_addr()
                    );
                    return Ok(endpoint);
                }
                None => {
                    log::warn!("ignoring advertisement without address: {}", ad.instance)
                }
            },
            Err(mpsc::RecvTimeoutError::Timeout) => {
                log::info!("searching for device ({})...", request.service_type);
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(DiscoveryError::BrowserClosed)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
