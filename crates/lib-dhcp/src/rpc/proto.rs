//! Wire messages of the allocation protocol spoken with the master.
//! Every frame is a 2-byte big-endian length followed by one of these
//! length-delimited messages.

use std::net::Ipv4Addr;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
)]
#[repr(i32)]
pub enum RequestType {
    Discover = 0,
    Request = 1,
    Release = 2,
    Decline = 3,
    ConflictIp = 4,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaseRequest {
    #[prost(enumeration = "RequestType", tag = "1")]
    pub request_type: i32,

    #[prost(uint32, tag = "2")]
    pub subnet_id: u32,

    #[prost(bytes = "vec", tag = "3")]
    pub client_id: Vec<u8>,

    #[prost(bytes = "vec", tag = "4")]
    pub mac: Vec<u8>,

    #[prost(string, tag = "5")]
    pub hostname: String,

    /// IPv4 address in host byte order.
    #[prost(uint32, tag = "6")]
    pub request_addr: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct LeaseReply {
    #[prost(bool, tag = "1")]
    pub succeeded: bool,

    /// Allocated IPv4 address in host byte order.
    #[prost(uint32, tag = "2")]
    pub addr: u32,

    #[prost(uint32, tag = "3")]
    pub subnet_id: u32,
}

impl LeaseReply {
    pub fn addr_v4(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.addr)
    }

    /// A failed reply or a zero/broadcast address both mean "allocation
    /// failed".
    pub fn is_allocation_failure(&self) -> bool {
        let addr = self.addr_v4();
        !self.succeeded || addr.is_unspecified() || addr.is_broadcast()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn request_round_trip() {
        let request = LeaseRequest {
            request_type: RequestType::Discover as i32,
            subnet_id: 7,
            client_id: vec![0x01, 0xaa],
            mac: vec![1, 2, 3, 4, 5, 6],
            hostname: "client-1".to_string(),
            request_addr: u32::from(Ipv4Addr::new(192, 0, 2, 100)),
        };

        let bytes = request.encode_to_vec();
        let decoded = LeaseRequest::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn failure_replies() {
        let failed = LeaseReply {
            succeeded: false,
            addr: u32::from(Ipv4Addr::new(192, 0, 2, 100)),
            subnet_id: 1,
        };
        assert!(failed.is_allocation_failure());

        let zero = LeaseReply {
            succeeded: true,
            addr: 0,
            subnet_id: 1,
        };
        assert!(zero.is_allocation_failure());

        let broadcast = LeaseReply {
            succeeded: true,
            addr: u32::from(Ipv4Addr::BROADCAST),
            subnet_id: 1,
        };
        assert!(broadcast.is_allocation_failure());

        let good = LeaseReply {
            succeeded: true,
            addr: u32::from(Ipv4Addr::new(192, 0, 2, 100)),
            subnet_id: 1,
        };
        assert!(!good.is_allocation_failure());
    }
}
