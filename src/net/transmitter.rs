//! Fire-and-forget UDP transmitter.
//!
//! One [`OutputFrame`] becomes one datagram.  There is no acknowledgement,
//! retry or sequence number; callers decide whether a failed send matters
//! (the control loop logs and moves on).

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use crate::discovery::DeviceEndpoint;
use crate::protocol::OutputFrame;

/// Sends encoded frames to an endpoint.
pub trait Transmitter: Send {
    /// Send `frame` as a single datagram.  Returns the bytes written.
    fn send(&self, frame: &OutputFrame, endpoint: &DeviceEndpoint) -> io::Result<usize>;
}

/// [`Transmitter`] over an ephemeral-port UDP socket.
///
/// The socket is closed when the transmitter is dropped.
pub struct UdpTransmitter {
    socket: UdpSocket,
}

impl UdpTransmitter {
    /// Bind an IPv4 socket on an OS-chosen port.
    pub fn bind() -> io::Result<Self> {
        Self::bind_unspecified(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }

    /// Bind a socket of the same address family as `endpoint`.
    ///
    /// An IPv4 socket cannot `send_to` an IPv6 address (and vice versa), so
    /// controllers advertising only an AAAA record need a `[::]:0` socket.
    pub fn bind_for(endpoint: &DeviceEndpoint) -> io::Result<Self> {
        match endpoint.address {
            IpAddr::V4(_) => Self::bind(),
            IpAddr::V6(_) => Self::bind_unspecified(IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
        }
    }

    fn bind_unspecified(any: IpAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::new(any, 0))?;
        log::debug!("udp socket bound on {}", socket.local_addr()?);
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Send a single frame on a throw-away socket.
    pub fn send_once(frame: &OutputFrame, endpoint: &DeviceEndpoint) -> io::Result<usize> {
        Self::bind_for(endpoint)?.send(frame, endpoint)
    }
}

impl Transmitter for UdpTransmitter {
    fn send(&self, frame: &OutputFrame, endpoint: &DeviceEndpoint) -> io::Result<usize> {
        let payload = frame.to_bytes();
        let sent = self.socket.send_to(&payload, endpoint.socket_addr())?;
        log::trace!("sent {sent} bytes to {}", endpoint.socket_addr());
        Ok(sent)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SpectrumBands;
    use crate::protocol::{encode, Color};
    use std::time::{Duration, SystemTime};

    fn listener() -> (UdpSocket, DeviceEndpoint) {
        listener_on(IpAddr::V4(Ipv4Addr::LOCALHOST)).unwrap()
    }

    fn listener_on(address: IpAddr) -> io::Result<(UdpSocket, DeviceEndpoint)> {
        let socket = UdpSocket::bind(SocketAddr::new(address, 0))?;
        socket.set_read_timeout(Some(Duration::from_secs(2)))?;
        let endpoint = DeviceEndpoint {
            address,
            port: socket.local_addr()?.port(),
            instance: "test".into(),
            discovered_at: SystemTime::now(),
        };
        Ok((socket, endpoint))
    }

    #[test]
    fn one_frame_is_one_datagram() {
        let (rx, endpoint) = listener();
        let tx = UdpTransmitter::bind().unwrap();

        let frame = encode(SpectrumBands::new(10, 20, 30, 40), Color::new(5, 6, 7).into());
        assert_eq!(tx.send(&frame, &endpoint).unwrap(), 7);

        let mut buf = [0u8; 64];
        let (n, _) = rx.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[10, 20, 30, 40, 5, 6, 7]);
    }

    #[test]
    fn send_once_delivers_shutdown_frame() {
        let (rx, endpoint) = listener();

        UdpTransmitter::send_once(&OutputFrame::Shutdown, &endpoint).unwrap();

        let mut buf = [0u8; 64];
        let (n, _) = rx.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0, 0, 0, 0]);
    }

    #[test]
    fn transmitter_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<UdpTransmitter>();
    }

    #[test]
    fn socket_family_follows_endpoint() {
        let (_rx, v4) = listener();
        assert!(UdpTransmitter::bind_for(&v4).unwrap().local_addr().unwrap().is_ipv4());

        let v6 = DeviceEndpoint {
            address: IpAddr::V6(Ipv6Addr::LOCALHOST),
            ..v4
        };
        // Hosts without IPv6 cannot bind `[::]:0` at all.
        if let Ok(tx) = UdpTransmitter::bind_for(&v6) {
            assert!(tx.local_addr().unwrap().is_ipv6());
        }
    }

    #[test]
    fn ipv6_only_controller_receives_frames() {
        let Ok((rx, endpoint)) = listener_on(IpAddr::V6(Ipv6Addr::LOCALHOST)) else {
            eprintln!("skipping: no IPv6 loopback on this host");
            return;
        };

        UdpTransmitter::send_once(&OutputFrame::Shutdown, &endpoint).unwrap();

        let mut buf = [0u8; 64];
        let (n, _) = rx.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0, 0, 0, 0]);
    }
}
