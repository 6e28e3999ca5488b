use std::fmt::Display;

use thiserror::Error;

use crate::types::OpCode;

#[derive(Debug, Error)]
#[error("Invalid DHCP message type: {0}")]
pub struct InvalidMessageType(pub u8);

/// DHCPv4 message types carried in option 53.
///
/// `ConflictIp` is a server-internal type used on the synthetic decline the
/// slave sends master-ward after a ping probe found the offered address in
/// use. It never appears in client traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
    ConflictIp = 18,
}

impl MessageType {
    /// The BOOTP opcode a message of this type travels under.
    pub fn bootp_type(&self) -> OpCode {
        match self {
            Self::Discover
            | Self::Request
            | Self::Decline
            | Self::Release
            | Self::Inform
            | Self::ConflictIp => OpCode::BootRequest,
            Self::Offer | Self::Ack | Self::Nak => OpCode::BootReply,
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = InvalidMessageType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Discover),
            2 => Ok(Self::Offer),
            3 => Ok(Self::Request),
            4 => Ok(Self::Decline),
            5 => Ok(Self::Ack),
            6 => Ok(Self::Nak),
            7 => Ok(Self::Release),
            8 => Ok(Self::Inform),
            18 => Ok(Self::ConflictIp),
            other => Err(InvalidMessageType(other)),
        }
    }
}

impl Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Discover => "DHCPDISCOVER",
            Self::Offer => "DHCPOFFER",
            Self::Request => "DHCPREQUEST",
            Self::Decline => "DHCPDECLINE",
            Self::Ack => "DHCPACK",
            Self::Nak => "DHCPNAK",
            Self::Release => "DHCPRELEASE",
            Self::Inform => "DHCPINFORM",
            Self::ConflictIp => "DHCPCONFLICTIP",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootp_type_mapping() {
        assert_eq!(MessageType::Discover.bootp_type(), OpCode::BootRequest);
        assert_eq!(MessageType::Request.bootp_type(), OpCode::BootRequest);
        assert_eq!(MessageType::Release.bootp_type(), OpCode::BootRequest);
        assert_eq!(MessageType::Offer.bootp_type(), OpCode::BootReply);
        assert_eq!(MessageType::Ack.bootp_type(), OpCode::BootReply);
        assert_eq!(MessageType::Nak.bootp_type(), OpCode::BootReply);
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(MessageType::try_from(0).is_err());
        assert!(MessageType::try_from(9).is_err());
    }
}
