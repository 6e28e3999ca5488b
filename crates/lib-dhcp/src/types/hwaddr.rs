use std::fmt::Display;

use crate::{HTYPE_ETHER, MAX_CHADDR_LEN};

/// A link-layer address: hardware type byte plus up to 16 address bytes
/// (the DHCPv4 `chaddr` limit).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HardwareAddr {
    pub htype: u8,
    addr: Vec<u8>,
}

impl HardwareAddr {
    /// Build a hardware address, truncating to the `chaddr` limit.
    pub fn new(htype: u8, addr: &[u8]) -> Self {
        let len = addr.len().min(MAX_CHADDR_LEN);
        Self {
            htype,
            addr: addr[..len].to_vec(),
        }
    }

    pub fn ethernet(addr: &[u8]) -> Self {
        Self::new(HTYPE_ETHER, addr)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.addr
    }

    pub fn len(&self) -> usize {
        self.addr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addr.is_empty()
    }

    pub fn to_text(&self) -> String {
        self.addr
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl Display for HardwareAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "hwtype={} {}", self.htype, self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_form() {
        let hw = HardwareAddr::ethernet(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
        assert_eq!(hw.to_text(), "01:02:03:04:05:06");
    }

    #[test]
    fn truncates_to_chaddr_limit() {
        let hw = HardwareAddr::new(1, &[0u8; 20]);
        assert_eq!(hw.len(), 16);
    }
}
