//! mDNS-SD browser backed by the `mdns-sd` crate.
//!
//! [`MdnsBrowser`] owns one [`mdns_sd::ServiceDaemon`] for the life of the
//! process.  Each [`browse`](ServiceBrowser::browse) call spawns a watcher
//! thread that waits for the first resolved instance carrying an address
//! and forwards it once.  The browse is stopped either by the watcher after
//! forwarding or by the returned [`BrowseSession`] when it is dropped,
//! whichever comes first; the watcher exits on `SearchStopped`.

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use mdns_sd::{ServiceDaemon, ServiceEvent};

use super::{Advertisement, BrowseSession, DiscoveryError, ServiceBrowser};

/// Passive listener for DNS-SD advertisements on the local network.
pub struct MdnsBrowser {
    daemon: ServiceDaemon,
}

impl MdnsBrowser {
    /// Start the mDNS daemon.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Mdns`] when the multicast socket cannot be
    /// created.
    pub fn new() -> Result<Self, DiscoveryError> {
        let daemon = ServiceDaemon::new()?;
        Ok(Self { daemon })
    }
}

/// Stops one browse on the daemon, at most once.
#[derive(Clone)]
struct BrowseStopper {
    daemon: ServiceDaemon,
    service_type: String,
    done: Arc<AtomicBool>,
}

impl BrowseStopper {
    fn stop(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.daemon.stop_browse(&self.service_type) {
            log::debug!("mdns: stop_browse({}) failed: {e}", self.service_type);
        }
    }
}

fn to_advertisement(info: &mdns_sd::ServiceInfo) -> Option<Advertisement> {
    let addresses: Vec<IpAddr> = info.get_addresses().iter().copied().collect();
    if addresses.is_empty() {
        log::debug!("mdns: {} resolved without address", info.get_fullname());
        return None;
    }
    Some(Advertisement {
        instance: info.get_fullname().to_string(),
        addresses,
        port: info.get_port(),
    })
}

impl ServiceBrowser for MdnsBrowser {
    fn browse(&self, service_type: &str) -> Result<BrowseSession, DiscoveryError> {
        let events = self.daemon.browse(service_type)?;
        let (tx, rx) = mpsc::sync_channel::<Advertisement>(1);

        let stopper = BrowseStopper {
            daemon: self.daemon.clone(),
            service_type: service_type.to_string(),
            done: Arc::new(AtomicBool::new(false)),
        };
        let watcher_stopper = stopper.clone();

        std::thread::Builder::new()
            .name("mdns-browse".into())
            .spawn(move || {
                // Ends on SearchStopped or when the daemon shuts down.
                while let Ok(event) = events.recv() {
                    match event {
                        ServiceEvent::SearchStarted(ty) => log::trace!("mdns: browsing {ty}"),
                        ServiceEvent::ServiceFound(_, name) => log::debug!("mdns: found {name}"),
                        ServiceEvent::ServiceResolved(info) => {
                            let Some(ad) = to_advertisement(&info) else {
                                continue;
                            };
                            // Full or gone: discovery already has a device or was
                            // cancelled.
                            let _ = tx.try_send(ad);
                            watcher_stopper.stop();
                        }
                        ServiceEvent::SearchStopped(ty) => {
                            log::debug!("mdns: stopped browsing {ty}");
                            break;
                        }
                        _ => {}
                    }
                }
            })
            .map_err(|e| {
                log::error!("mdns: failed to spawn browse thread: {e}");
                stopper.stop();
                DiscoveryError::BrowserClosed
            })?;

        Ok(BrowseSession::with_cleanup(rx, move || stopper.stop()))
    }
}

impl Drop for MdnsBrowser {
    fn drop(&mut self) {
        if let Err(e) = self.daemon.shutdown() {
            log::debug!("mdns: daemon shutdown failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MdnsBrowser>();
    }
}
