use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::debug;

/// Largest datagram the receiver accepts. Fits any legal DHCPv4 message.
const RECV_BUFFER_SIZE: usize = 2048;

#[derive(Debug, Error)]
pub enum NicError {
    #[error("Unable to open socket on {iface}/{addr}: {source}")]
    Open {
        iface: String,
        addr: Ipv4Addr,
        source: io::Error,
    },
}

/// A received datagram together with its ingress metadata. Binding one
/// socket per configured interface address makes the receiving interface
/// and local address attributes of the socket itself.
#[derive(Debug, Clone)]
pub struct RawPacket {
    pub data: Vec<u8>,
    pub iface: String,
    /// Address configured on the ingress interface.
    pub iface_addr: Ipv4Addr,
    pub local_addr: Ipv4Addr,
    pub local_port: u16,
    pub remote: SocketAddrV4,
}

/// An assembled response ready for the transmitter.
#[derive(Debug, Clone)]
pub struct OutPacket {
    pub data: Vec<u8>,
    pub dest: SocketAddrV4,
    /// Interface the response leaves through, i.e. the ingress interface
    /// of the query.
    pub iface: String,
}

/// One UDP socket bound to a configured `<ifname>/<ipv4>` pair. The
/// socket listens on the wildcard address with the device binding so both
/// broadcast and unicast datagrams arrive, and replies can target
/// 255.255.255.255.
pub struct Listener {
    iface: String,
    addr: Ipv4Addr,
    port: u16,
    socket: Arc<UdpSocket>,
}

impl Listener {
    pub fn open(iface: &str, addr: Ipv4Addr, port: u16) -> Result<Self, NicError> {
        let open_err = |source| NicError::Open {
            iface: iface.to_string(),
            addr,
            source,
        };

        let socket =
            Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(open_err)?;
        socket.set_reuse_address(true).map_err(open_err)?;
        // Every listener binds the same wildcard port, one per interface.
        #[cfg(target_os = "linux")]
        socket.set_reuse_port(true).map_err(open_err)?;
        socket.set_broadcast(true).map_err(open_err)?;
        #[cfg(target_os = "linux")]
        socket
            .bind_device(Some(iface.as_bytes()))
            .map_err(open_err)?;
        socket.set_nonblocking(true).map_err(open_err)?;
        socket
            .bind(&SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port).into())
            .map_err(open_err)?;

        let socket = UdpSocket::from_std(socket.into()).map_err(open_err)?;
        debug!(iface, %addr, port, "listener open");

        Ok(Self {
            iface: iface.to_string(),
            addr,
            port,
            socket: Arc::new(socket),
        })
    }

    pub fn iface(&self) -> &str {
        &self.iface
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.addr
    }

    pub async fn recv(&self) -> io::Result<RawPacket> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            let (len, remote) = self.socket.recv_from(&mut buf).await?;
            let SocketAddr::V4(remote) = remote else {
                continue;
            };

            buf.truncate(len);
            return Ok(RawPacket {
                data: buf,
                iface: self.iface.clone(),
                iface_addr: self.addr,
                local_addr: self.addr,
                local_port: self.port,
                remote,
            });
        }
    }

    pub async fn send(&self, packet: &OutPacket) -> io::Result<usize> {
        self.socket
            .send_to(&packet.data, SocketAddr::V4(packet.dest))
            .await
    }
}
