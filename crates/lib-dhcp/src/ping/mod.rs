use std::io;
use std::mem::MaybeUninit;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::warn;

const ICMP_ECHO_REQUEST: u8 = 8;
const ICMP_ECHO_REPLY: u8 = 0;
const ECHO_PAYLOAD: &[u8] = b"ember-dhcpd-ping";

/// Liveness probe consulted before offering an address.
#[async_trait]
pub trait AddressProber: Send + Sync {
    /// True when something answered at the address, i.e. the address is in
    /// use and must not be offered.
    async fn probe(&self, addr: Ipv4Addr) -> bool;
}

/// ICMP echo prober. Disabled probes and probe errors both report the
/// address as free so allocation can proceed.
pub struct Pinger {
    enabled: bool,
    timeout: Duration,
}

impl Pinger {
    pub fn new(enabled: bool, timeout_secs: u32) -> Self {
        Self {
            enabled,
            timeout: Duration::from_secs(u64::from(timeout_secs.max(1))),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[async_trait]
impl AddressProber for Pinger {
    async fn probe(&self, addr: Ipv4Addr) -> bool {
        if !self.enabled {
            return false;
        }

        let timeout = self.timeout;
        match tokio::task::spawn_blocking(move || ping_once(addr, timeout)).await {
            Ok(Ok(alive)) => alive,
            Ok(Err(error)) => {
                warn!(%addr, %error, "ping probe failed, treating address as free");
                false
            }
            Err(error) => {
                warn!(%addr, %error, "ping task failed, treating address as free");
                false
            }
        }
    }
}

fn ping_once(addr: Ipv4Addr, timeout: Duration) -> io::Result<bool> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::ICMPV4))?;

    let request = build_echo_request();
    let dest = SocketAddrV4::new(addr, 0);
    socket.send_to(&request, &dest.into())?;

    let deadline = Instant::now() + timeout;
    let mut buf = [MaybeUninit::<u8>::uninit(); 512];

    loop {
        let remaining = match deadline.checked_duration_since(Instant::now()) {
            Some(remaining) if !remaining.is_zero() => remaining,
            _ => return Ok(false),
        };
        socket.set_read_timeout(Some(remaining))?;

        match socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                let data =
                    unsafe { std::slice::from_raw_parts(buf.as_ptr() as *const u8, len) };
                let from_addr = from.as_socket_ipv4().map(|s| *s.ip());
                if from_addr == Some(addr) && data.first() == Some(&ICMP_ECHO_REPLY) {
                    return Ok(true);
                }
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                return Ok(false);
            }
            Err(error) => return Err(error),
        }
    }
}

fn build_echo_request() -> Vec<u8> {
    let mut packet = vec![ICMP_ECHO_REQUEST, 0, 0, 0];
    // Identifier is rewritten by the kernel for datagram ICMP sockets.
    packet.extend_from_slice(&(std::process::id() as u16).to_be_bytes());
    packet.extend_from_slice(&1u16.to_be_bytes());
    packet.extend_from_slice(ECHO_PAYLOAD);

    let checksum = internet_checksum(&packet);
    packet[2..4].copy_from_slice(&checksum.to_be_bytes());
    packet
}

fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum = 0u32;
    for chunk in data.chunks(2) {
        let word = match chunk {
            [a, b] => u16::from_be_bytes([*a, *b]),
            [a] => u16::from_be_bytes([*a, 0]),
            _ => 0,
        };
        sum = sum.wrapping_add(u32::from(word));
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_probe_reports_free() {
        let pinger = Pinger::new(false, 1);
        assert!(!pinger.probe(Ipv4Addr::new(192, 0, 2, 1)).await);
    }

    #[test]
    fn echo_request_checksum_verifies() {
        let packet = build_echo_request();
        assert_eq!(packet[0], ICMP_ECHO_REQUEST);
        // Checksumming the finished packet must yield zero.
        assert_eq!(internet_checksum(&packet), 0);
    }

    #[test]
    fn checksum_odd_length() {
        assert_eq!(internet_checksum(&[0xff]), 0x00ff);
    }
}
