//! Response assembly for OFFER, ACK and NAK.

use std::net::Ipv4Addr;

use crate::subnet::Subnet;
use crate::types::option::code::{
    DHO_DHCP_AGENT_OPTIONS, DHO_DHCP_CLIENT_IDENTIFIER, DHO_DHCP_LEASE_TIME,
    DHO_DHCP_PARAMETER_REQUEST_LIST, DHO_DHCP_REBINDING_TIME, DHO_DHCP_RENEWAL_TIME,
    DHO_DHCP_SERVER_IDENTIFIER, DHO_DOMAIN_NAME, DHO_DOMAIN_NAME_SERVERS, DHO_ROUTERS,
    DHO_SUBNET_MASK, DHO_VENDOR_CLASS_IDENTIFIER, DHO_SUBNET_SELECTION,
};
use crate::types::option::DhcpOption;
use crate::types::{Message, MessageType};
use crate::{CLIENT_PORT, FLAG_BROADCAST_MASK, SERVER_PORT};

/// Options always offered when the subnet configures them.
const REQUIRED_OPTIONS: [u8; 4] = [
    DHO_ROUTERS,
    DHO_DOMAIN_NAME_SERVERS,
    DHO_DOMAIN_NAME,
    DHO_VENDOR_CLASS_IDENTIFIER,
];

/// UDP sockets cannot unicast to a host that does not have the address
/// configured yet, so replies to bare DISCOVER/REQUEST go to broadcast.
const DIRECT_RESPONSE_SUPPORTED: bool = false;

pub fn gen_ack_response(query: &Message, yiaddr: Ipv4Addr, subnet: &Subnet) -> Message {
    let mut response = init_response(query);
    response.yiaddr = yiaddr;
    append_basic_options(query, &mut response, subnet);
    append_requested_options(query, &mut response, subnet);
    append_iface_data(query, &mut response);
    response
}

pub fn gen_nak_response(query: &Message) -> Message {
    let mut response = init_response(query);
    response.set_type(MessageType::Nak);
    response.op = MessageType::Nak.bootp_type();
    response.yiaddr = Ipv4Addr::UNSPECIFIED;
    append_iface_data(query, &mut response);
    response
}

/// A response skeleton: type derived from the query, header fields copied
/// over, client identification and relay state echoed unchanged.
fn init_response(query: &Message) -> Message {
    let response_type = match query.message_type() {
        Some(MessageType::Discover) => MessageType::Offer,
        _ => MessageType::Ack,
    };

    let mut response = Message::new(response_type, query.xid);
    response.iface = query.iface.clone();
    response.hops = query.hops;
    response.hwaddr = query.hwaddr.clone();
    response.giaddr = query.giaddr;
    response.flags = query.flags;

    for code in [
        DHO_DHCP_CLIENT_IDENTIFIER,
        DHO_DHCP_AGENT_OPTIONS,
        DHO_SUBNET_SELECTION,
    ] {
        if let Some(option) = query.get_option(code) {
            response.options.insert(option.clone());
        }
    }

    response
}

fn append_basic_options(query: &Message, response: &mut Message, subnet: &Subnet) {
    response.siaddr = subnet.siaddr();
    if query.message_type() != Some(MessageType::Discover) {
        response.ciaddr = query.ciaddr;
    }

    if query.message_type() != Some(MessageType::Inform) {
        let mut valid = subnet.valid_lifetime().get();
        if let Some(hint) = query
            .get_option(DHO_DHCP_LEASE_TIME)
            .and_then(|o| o.as_u32())
        {
            valid = subnet.valid_lifetime().clamp(hint);
        }

        response
            .options
            .insert(DhcpOption::uint32(DHO_DHCP_LEASE_TIME, valid));

        if subnet.t1().is_some() {
            response
                .options
                .insert(DhcpOption::uint32(DHO_DHCP_RENEWAL_TIME, valid / 2));
        }
        if subnet.t2().is_some() {
            response
                .options
                .insert(DhcpOption::uint32(DHO_DHCP_REBINDING_TIME, valid * 3 / 4));
        }
    }

    response
        .options
        .insert(DhcpOption::ipv4(DHO_SUBNET_MASK, subnet.netmask()));

    for code in REQUIRED_OPTIONS {
        if !response.options.contains(code) {
            if let Some(option) = subnet.option_data().get(code) {
                response.options.insert(option.clone());
            }
        }
    }
}

/// Options the client asked for through option 55, in the order the
/// client requested them, limited to what the subnet configures.
fn append_requested_options(query: &Message, response: &mut Message, subnet: &Subnet) {
    let Some(prl) = query.get_option(DHO_DHCP_PARAMETER_REQUEST_LIST) else {
        return;
    };

    for code in prl.requested_codes() {
        if response.options.contains(code) {
            continue;
        }
        if let Some(option) = subnet.option_data().get(code) {
            response.options.insert(option.clone());
        }
    }
}

/// Destination bookkeeping per RFC 2131 section 4.1.
fn adjust_remote_addr(query: &Message, response: &mut Message) {
    if query.message_type() == Some(MessageType::Inform) {
        if !query.ciaddr.is_unspecified() {
            response.remote_addr = query.ciaddr;
        } else if query.is_relayed() {
            response.remote_addr = query.giaddr;
            response.flags |= FLAG_BROADCAST_MASK;
        } else {
            response.remote_addr = query.remote_addr;
        }
        return;
    }

    if query.is_relayed() {
        response.remote_addr = query.giaddr;
    } else if !query.ciaddr.is_unspecified() {
        response.remote_addr = query.ciaddr;
    } else if response.message_type() == Some(MessageType::Nak) {
        response.remote_addr = Ipv4Addr::BROADCAST;
    } else if !response.yiaddr.is_unspecified() {
        let bcast_flag = query.flags & FLAG_BROADCAST_MASK != 0;
        if !DIRECT_RESPONSE_SUPPORTED || bcast_flag {
            response.remote_addr = Ipv4Addr::BROADCAST;
        } else {
            response.remote_addr = response.yiaddr;
        }
    } else {
        response.remote_addr = query.remote_addr;
    }
}

fn append_iface_data(query: &Message, response: &mut Message) {
    adjust_remote_addr(query, response);
    response.remote_port = if query.is_relayed() {
        SERVER_PORT
    } else {
        CLIENT_PORT
    };

    response.local_addr = query.local_addr;
    response.local_port = query.local_port;
    response.iface = query.iface.clone();

    response.options.insert(DhcpOption::ipv4(
        DHO_DHCP_SERVER_IDENTIFIER,
        response.local_addr,
    ));
}
