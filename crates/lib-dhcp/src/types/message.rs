use std::fmt::Display;
use std::net::Ipv4Addr;

use netbuf::WriteBuffer;
use thiserror::Error;

use crate::classify::ClientClasses;
use crate::defs::{unpack_options, OptionDefRegistry};
use crate::types::option::code::{
    DHO_DHCP_CLIENT_IDENTIFIER, DHO_DHCP_MESSAGE_TYPE, DHO_END,
};
use crate::types::option::{DhcpOption, EncodeError, OptionCollection};
use crate::types::{HardwareAddr, MessageType, OpCode};
use crate::{
    CLIENT_PORT, DHCP4_OPTION_SPACE, MAGIC_COOKIE, MAX_CHADDR_LEN, MAX_FILE_LEN, MAX_SNAME_LEN,
    PKT_HDR_LEN, SERVER_PORT,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Truncated DHCPv4 packet ({0} bytes), at least 240 expected")]
    TruncatedHeader(usize),

    #[error("Received BOOTP packet, BOOTP is not supported")]
    BootpNotSupported,

    #[error("Invalid or missing DHCP magic cookie")]
    MissingCookie,

    #[error("Option {code} at offset {offset} claims more bytes than remain")]
    TruncatedOption { code: u8, offset: usize },

    #[error("Invalid BOOTP opcode: {0}")]
    InvalidOpCode(u8),
}

/// A DHCPv4 message: the fixed header, the option multimap and the wire
/// metadata of the datagram it arrived in (or is about to leave through).
/// The same layout is used in both directions.
///
/// RFC 2131 Section 2: https://datatracker.ietf.org/doc/html/rfc2131#section-2
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub op: OpCode,
    pub hwaddr: HardwareAddr,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,

    /// Server host name, zero padded to 64 octets on the wire.
    pub sname: Vec<u8>,
    /// Boot file name, zero padded to 128 octets on the wire.
    pub file: Vec<u8>,

    pub options: OptionCollection,

    /// Name of the interface the datagram was received on or leaves through.
    pub iface: String,
    pub local_addr: Ipv4Addr,
    pub remote_addr: Ipv4Addr,
    pub local_port: u16,
    pub remote_port: u16,

    /// Client classes attached during classification.
    pub classes: ClientClasses,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            op: OpCode::BootRequest,
            hwaddr: HardwareAddr::default(),
            hops: 0,
            xid: 0,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            sname: vec![0; MAX_SNAME_LEN],
            file: vec![0; MAX_FILE_LEN],
            options: OptionCollection::new(),
            iface: String::new(),
            local_addr: Ipv4Addr::UNSPECIFIED,
            remote_addr: Ipv4Addr::UNSPECIFIED,
            local_port: SERVER_PORT,
            remote_port: CLIENT_PORT,
            classes: ClientClasses::default(),
        }
    }
}

impl Message {
    /// Create an outbound message of the given type.
    pub fn new(msg_type: MessageType, xid: u32) -> Self {
        let mut message = Self {
            op: msg_type.bootp_type(),
            xid,
            ..Default::default()
        };
        message.set_type(msg_type);
        message
    }

    /// Parse a wire buffer into a message, resolving option payloads
    /// through the definition registry.
    pub fn unpack(data: &[u8], defs: &OptionDefRegistry) -> Result<Self, DecodeError> {
        if data.len() < PKT_HDR_LEN {
            return Err(DecodeError::TruncatedHeader(data.len()));
        }
        let hdr = &data[..PKT_HDR_LEN];

        let op = OpCode::try_from(hdr[0]).map_err(|e| DecodeError::InvalidOpCode(e.0))?;
        let htype = hdr[1];
        let hlen = hdr[2];
        let hops = hdr[3];
        let xid = u32::from_be_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]);
        let secs = u16::from_be_bytes([hdr[8], hdr[9]]);
        let flags = u16::from_be_bytes([hdr[10], hdr[11]]);
        let ciaddr = Ipv4Addr::new(hdr[12], hdr[13], hdr[14], hdr[15]);
        let yiaddr = Ipv4Addr::new(hdr[16], hdr[17], hdr[18], hdr[19]);
        let siaddr = Ipv4Addr::new(hdr[20], hdr[21], hdr[22], hdr[23]);
        let giaddr = Ipv4Addr::new(hdr[24], hdr[25], hdr[26], hdr[27]);

        let chaddr = &hdr[28..44];
        let sname = hdr[44..108].to_vec();
        let file = hdr[108..PKT_HDR_LEN].to_vec();

        let hwaddr = HardwareAddr::new(htype, &chaddr[..(hlen as usize).min(MAX_CHADDR_LEN)]);

        // A frame that stops right after the fixed header carries no magic
        // cookie, which makes it a plain BOOTP packet.
        let rest = &data[PKT_HDR_LEN..];
        if rest.is_empty() {
            return Err(DecodeError::BootpNotSupported);
        }
        if rest.len() < 4 {
            return Err(DecodeError::TruncatedHeader(data.len()));
        }
        if u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) != MAGIC_COOKIE {
            return Err(DecodeError::MissingCookie);
        }

        let mut options = OptionCollection::new();
        unpack_options(&rest[4..], DHCP4_OPTION_SPACE, defs, &mut options)?;

        Ok(Self {
            op,
            hwaddr,
            hops,
            xid,
            secs,
            flags,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            sname,
            file,
            options,
            ..Default::default()
        })
    }

    /// Serialize the message: fixed header, magic cookie, options in
    /// ascending code order with Relay Agent Information deferred to the
    /// tail, then the END terminator.
    pub fn pack(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = WriteBuffer::new();

        let hw = self.hwaddr.bytes();
        let hw_len = hw.len().min(MAX_CHADDR_LEN);

        buf.push(self.op as u8);
        buf.push(self.hwaddr.htype);
        buf.push(hw_len as u8);
        buf.push(self.hops);
        buf.write_u32(self.xid);
        buf.write_u16(self.secs);
        buf.write_u16(self.flags);
        buf.write_slice(&self.ciaddr.octets());
        buf.write_slice(&self.yiaddr.octets());
        buf.write_slice(&self.siaddr.octets());
        buf.write_slice(&self.giaddr.octets());

        buf.write_slice(&hw[..hw_len]);
        buf.write_slice(&vec![0; MAX_CHADDR_LEN - hw_len]);

        write_padded(&mut buf, &self.sname, MAX_SNAME_LEN);
        write_padded(&mut buf, &self.file, MAX_FILE_LEN);

        buf.write_u32(MAGIC_COOKIE);
        self.options.pack(&mut buf)?;
        buf.push(DHO_END);

        Ok(buf.into_bytes())
    }

    /// Message type from option 53, if present and valid.
    pub fn message_type(&self) -> Option<MessageType> {
        let value = self.options.get(DHO_DHCP_MESSAGE_TYPE)?.as_u8()?;
        MessageType::try_from(value).ok()
    }

    pub fn set_type(&mut self, msg_type: MessageType) {
        self.options.remove(DHO_DHCP_MESSAGE_TYPE);
        self.options
            .insert(DhcpOption::uint8(DHO_DHCP_MESSAGE_TYPE, msg_type as u8));
    }

    pub fn get_option(&self, code: u8) -> Option<&DhcpOption> {
        self.options.get(code)
    }

    /// Relayed means a nonzero, non-broadcast giaddr.
    pub fn is_relayed(&self) -> bool {
        !self.giaddr.is_unspecified() && !self.giaddr.is_broadcast()
    }

    pub fn client_id(&self) -> Option<Vec<u8>> {
        self.options
            .get(DHO_DHCP_CLIENT_IDENTIFIER)
            .and_then(|o| o.as_bytes())
            .filter(|b| !b.is_empty())
    }

    /// Identification label used in log lines.
    pub fn label(&self) -> String {
        let cid = match self.client_id() {
            Some(id) => id
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(":"),
            None => "no info".to_string(),
        };
        format!(
            "[{}], cid=[{}], tid=0x{:x}",
            self.hwaddr.to_text(),
            cid,
            self.xid
        )
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "local_address={}:{}, remote_address={}:{}, msg_type=",
            self.local_addr, self.local_port, self.remote_addr, self.remote_port
        )?;
        match self.message_type() {
            Some(ty) => write!(f, "{} ({})", ty, ty as u8)?,
            None => write!(f, "(missing)")?,
        }
        write!(f, ", {}", self.hwaddr)?;
        if !self.yiaddr.is_unspecified() {
            write!(f, ", yiaddr={}", self.yiaddr)?;
        }
        write!(f, ", transid=0x{:x}", self.xid)
    }
}

fn write_padded(buf: &mut WriteBuffer, data: &[u8], len: usize) {
    let used = data.len().min(len);
    buf.write_slice(&data[..used]);
    buf.write_slice(&vec![0; len - used]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::option::code::*;

    fn registry() -> OptionDefRegistry {
        OptionDefRegistry::with_std_defs()
    }

    fn minimal_discover() -> Vec<u8> {
        let mut msg = Message::new(MessageType::Discover, 0x1234_5678);
        msg.hwaddr = HardwareAddr::ethernet(&[1, 2, 3, 4, 5, 6]);
        msg.pack().unwrap()
    }

    #[test]
    fn short_buffer_is_truncated_header() {
        assert_eq!(
            Message::unpack(&[0u8; 200], &registry()),
            Err(DecodeError::TruncatedHeader(200))
        );
    }

    #[test]
    fn header_only_is_bootp() {
        let wire = minimal_discover();
        assert_eq!(
            Message::unpack(&wire[..PKT_HDR_LEN], &registry()),
            Err(DecodeError::BootpNotSupported)
        );
    }

    #[test]
    fn bad_cookie_is_rejected() {
        let mut wire = minimal_discover();
        wire[PKT_HDR_LEN] = 0x42;
        assert_eq!(
            Message::unpack(&wire, &registry()),
            Err(DecodeError::MissingCookie)
        );
    }

    #[test]
    fn unpack_round_trip() {
        let wire = minimal_discover();
        let msg = Message::unpack(&wire, &registry()).unwrap();

        assert_eq!(msg.op, OpCode::BootRequest);
        assert_eq!(msg.xid, 0x1234_5678);
        assert_eq!(msg.message_type(), Some(MessageType::Discover));
        assert_eq!(msg.hwaddr.to_text(), "01:02:03:04:05:06");

        assert_eq!(msg.pack().unwrap(), wire);
    }

    #[test]
    fn trailing_garbage_after_end_is_ignored() {
        let mut wire = minimal_discover();
        wire.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        assert!(Message::unpack(&wire, &registry()).is_ok());
    }

    #[test]
    fn truncated_option_is_rejected() {
        let mut wire = minimal_discover();
        // Truncate away the END terminator and the last payload byte of
        // the message type option.
        wire.truncate(wire.len() - 2);
        assert!(matches!(
            Message::unpack(&wire, &registry()),
            Err(DecodeError::TruncatedOption { code: 53, .. })
        ));
    }

    #[test]
    fn pad_bytes_are_skipped() {
        let mut wire = minimal_discover();
        // Insert PAD bytes before END: find END (last byte) and splice.
        let end = wire.pop().unwrap();
        assert_eq!(end, DHO_END);
        wire.extend_from_slice(&[DHO_PAD, DHO_PAD, DHO_END]);

        let msg = Message::unpack(&wire, &registry()).unwrap();
        assert_eq!(msg.options.len(), 1);
    }

    #[test]
    fn chaddr_padded_to_sixteen_bytes() {
        let wire = minimal_discover();
        // chaddr occupies bytes 28..44; hlen is 6.
        assert_eq!(wire[2], 6);
        assert_eq!(&wire[28..34], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(&wire[34..44], &[0; 10]);
    }
}
