use std::net::Ipv4Addr;

use crate::rpc::{LeaseRequest, RequestType};
use crate::subnet::{Subnet, SubnetId};
use crate::types::option::code::{DHO_DHCP_REQUESTED_ADDRESS, DHO_HOST_NAME};
use crate::types::{Message, MessageType};

/// Per-request working state, carried from ingress through allocation to
/// response emission.
#[derive(Debug, Clone)]
pub struct ClientContext {
    query: Message,
    subnet: Subnet,
    your_addr: Ipv4Addr,
    shared_subnet_id: Option<SubnetId>,
    retry_count: u32,
}

impl ClientContext {
    pub fn new(query: Message, subnet: Subnet) -> Self {
        Self {
            query,
            subnet,
            your_addr: Ipv4Addr::UNSPECIFIED,
            shared_subnet_id: None,
            retry_count: 0,
        }
    }

    pub fn query(&self) -> &Message {
        &self.query
    }

    pub fn query_type(&self) -> Option<MessageType> {
        self.query.message_type()
    }

    pub fn subnet(&self) -> &Subnet {
        &self.subnet
    }

    pub fn your_addr(&self) -> Ipv4Addr {
        self.your_addr
    }

    /// Subnet id the master answered with, when it differs from the
    /// elected subnet this is a shared-subnet override.
    pub fn shared_subnet_id(&self) -> Option<SubnetId> {
        self.shared_subnet_id
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn add_retry(&mut self) {
        self.retry_count += 1;
    }

    pub fn apply_reply(&mut self, addr: Ipv4Addr, subnet_id: SubnetId) {
        self.your_addr = addr;
        self.shared_subnet_id = if subnet_id != 0 { Some(subnet_id) } else { None };
    }

    /// The address the client is asking about: the requested-address
    /// option when present, the client address field otherwise.
    pub fn request_addr(&self) -> Ipv4Addr {
        self.query
            .get_option(DHO_DHCP_REQUESTED_ADDRESS)
            .and_then(|o| o.as_ipv4())
            .unwrap_or(self.query.ciaddr)
    }

    pub fn hostname(&self) -> String {
        self.query
            .get_option(DHO_HOST_NAME)
            .and_then(|o| o.as_str())
            .unwrap_or_default()
    }

    /// The allocation request sent master-ward for this context.
    pub fn lease_request(&self) -> LeaseRequest {
        let request_type = match self.query_type() {
            Some(MessageType::Discover) => RequestType::Discover,
            Some(MessageType::Release) => RequestType::Release,
            Some(MessageType::Decline) => RequestType::Decline,
            Some(MessageType::ConflictIp) => RequestType::ConflictIp,
            _ => RequestType::Request,
        };

        LeaseRequest {
            request_type: request_type as i32,
            subnet_id: self.subnet.id(),
            client_id: self.query.client_id().unwrap_or_default(),
            mac: self.query.hwaddr.bytes().to_vec(),
            hostname: self.hostname(),
            request_addr: u32::from(self.request_addr()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subnet::Triplet;
    use crate::types::option::DhcpOption;
    use crate::types::HardwareAddr;

    fn subnet() -> Subnet {
        Subnet::new(
            7,
            "192.0.2.0/24".parse().unwrap(),
            Triplet::from_default(3600),
        )
        .unwrap()
    }

    #[test]
    fn lease_request_carries_client_identity() {
        let mut query = Message::new(MessageType::Discover, 1);
        query.hwaddr = HardwareAddr::ethernet(&[1, 2, 3, 4, 5, 6]);
        query
            .options
            .insert(DhcpOption::binary(61, vec![0x01, 0xaa, 0xbb]));
        query.options.insert(DhcpOption::string(12, "printer-9"));
        query.options.insert(DhcpOption::ipv4(
            DHO_DHCP_REQUESTED_ADDRESS,
            "192.0.2.33".parse().unwrap(),
        ));

        let ctx = ClientContext::new(query, subnet());
        let request = ctx.lease_request();

        assert_eq!(request.request_type, RequestType::Discover as i32);
        assert_eq!(request.subnet_id, 7);
        assert_eq!(request.client_id, vec![0x01, 0xaa, 0xbb]);
        assert_eq!(request.mac, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(request.hostname, "printer-9");
        assert_eq!(
            request.request_addr,
            u32::from("192.0.2.33".parse::<Ipv4Addr>().unwrap())
        );
    }

    #[test]
    fn request_addr_falls_back_to_ciaddr() {
        let mut query = Message::new(MessageType::Release, 1);
        query.ciaddr = "192.0.2.55".parse().unwrap();

        let ctx = ClientContext::new(query, subnet());
        assert_eq!(ctx.request_addr(), "192.0.2.55".parse::<Ipv4Addr>().unwrap());
        assert_eq!(ctx.lease_request().request_type, RequestType::Release as i32);
    }

    #[test]
    fn reply_with_zero_subnet_is_not_an_override() {
        let query = Message::new(MessageType::Discover, 1);
        let mut ctx = ClientContext::new(query, subnet());

        ctx.apply_reply("192.0.2.100".parse().unwrap(), 0);
        assert_eq!(ctx.shared_subnet_id(), None);

        ctx.apply_reply("192.0.2.100".parse().unwrap(), 9);
        assert_eq!(ctx.shared_subnet_id(), Some(9));
    }
}
