//! Wire codec properties: pack/unpack round trips over the definition
//! registry.

use dhcp::defs::OptionDefRegistry;
use dhcp::types::option::code::*;
use dhcp::types::option::{DhcpOption, OptionValue};
use dhcp::types::{HardwareAddr, Message, MessageType};
use dhcp::{MAGIC_COOKIE_ARR, PKT_HDR_LEN};

fn registry() -> OptionDefRegistry {
    OptionDefRegistry::with_std_defs()
}

fn base_message() -> Message {
    let mut message = Message::new(MessageType::Request, 0xdead_beef);
    message.hwaddr = HardwareAddr::ethernet(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    message.secs = 7;
    message.flags = 0x8000;
    message.ciaddr = "192.0.2.40".parse().unwrap();
    message
}

#[test]
fn full_message_round_trip() {
    let defs = registry();

    let mut message = base_message();
    message
        .options
        .insert(DhcpOption::ipv4(DHO_DHCP_REQUESTED_ADDRESS, "192.0.2.50".parse().unwrap()));
    message.options.insert(DhcpOption::addr_list(
        DHO_ROUTERS,
        vec!["192.0.2.1".parse().unwrap(), "192.0.2.2".parse().unwrap()],
    ));
    message
        .options
        .insert(DhcpOption::string(DHO_HOST_NAME, "round-trip"));
    message
        .options
        .insert(DhcpOption::uint32(DHO_DHCP_LEASE_TIME, 7200));

    let wire = message.pack().unwrap();
    let parsed = Message::unpack(&wire, &defs).unwrap();

    assert_eq!(parsed.xid, message.xid);
    assert_eq!(parsed.secs, message.secs);
    assert_eq!(parsed.flags, message.flags);
    assert_eq!(parsed.ciaddr, message.ciaddr);
    assert_eq!(parsed.hwaddr, message.hwaddr);
    assert_eq!(parsed.options.len(), message.options.len());

    // Idempotent: packing the parsed message reproduces the wire bytes.
    assert_eq!(parsed.pack().unwrap(), wire);
}

#[test]
fn cookie_sits_after_fixed_header() {
    let wire = base_message().pack().unwrap();
    assert_eq!(&wire[PKT_HDR_LEN..PKT_HDR_LEN + 4], &MAGIC_COOKIE_ARR);
}

#[test]
fn unknown_code_payload_round_trip() {
    let defs = registry();

    // Non-standard codes with payload lengths across the range.
    for (code, len) in [(222u8, 0usize), (230, 1), (240, 100), (250, 255)] {
        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();

        let mut message = base_message();
        message
            .options
            .insert(DhcpOption::new(code, OptionValue::Opaque(payload.clone())));

        let wire = message.pack().unwrap();
        let parsed = Message::unpack(&wire, &defs).unwrap();
        let option = parsed.get_option(code).unwrap();
        assert_eq!(option.value, OptionValue::Opaque(payload), "code {code}");
    }
}

#[test]
fn options_reordered_to_ascending_codes() {
    let defs = registry();

    let mut message = base_message();
    // Insert in descending order; the wire must come out ascending.
    message
        .options
        .insert(DhcpOption::uint32(DHO_DHCP_LEASE_TIME, 60));
    message
        .options
        .insert(DhcpOption::ipv4(DHO_SUBNET_MASK, "255.255.255.0".parse().unwrap()));

    let wire = message.pack().unwrap();
    let parsed = Message::unpack(&wire, &defs).unwrap();

    let codes: Vec<u8> = parsed.options.iter().map(|o| o.code).collect();
    let mut sorted = codes.clone();
    sorted.sort_unstable();
    assert_eq!(codes, sorted);

    // Option 1 appears before option 51 on the wire.
    let options_area = &wire[PKT_HDR_LEN + 4..];
    let mask_pos = options_area.iter().position(|&b| b == DHO_SUBNET_MASK).unwrap();
    assert_eq!(mask_pos, 0);
}

#[test]
fn pad_stripping_preserves_options() {
    let defs = registry();

    let mut wire = base_message().pack().unwrap();
    // Replace END with PAD, PAD, END.
    assert_eq!(wire.pop(), Some(DHO_END));
    wire.extend_from_slice(&[DHO_PAD, DHO_PAD, DHO_END, 0x99, 0x99]);

    let parsed = Message::unpack(&wire, &defs).unwrap();
    assert_eq!(parsed.message_type(), Some(MessageType::Request));

    // Re-packing drops the padding and the post-END garbage.
    let repacked = parsed.pack().unwrap();
    assert_eq!(*repacked.last().unwrap(), DHO_END);
    assert!(repacked.len() < wire.len());
}

#[test]
fn oversized_option_is_a_fatal_encoding_error() {
    let mut message = base_message();
    message
        .options
        .insert(DhcpOption::new(43, OptionValue::Opaque(vec![0u8; 300])));
    assert!(message.pack().is_err());
}

#[test]
fn client_fqdn_option_round_trip() {
    let defs = registry();

    let mut payload = vec![0x04u8, 0, 0]; // E flag, canonical form
    payload.extend_from_slice(b"\x02pc\x07example\x03org\x00");

    let mut message = base_message();
    let fqdn_def = defs.get_by_code("dhcp4", DHO_FQDN).unwrap();
    let option = fqdn_def.option_factory(DHO_FQDN, &payload, &defs).unwrap();
    message.options.insert(option);

    let wire = message.pack().unwrap();
    let parsed = Message::unpack(&wire, &defs).unwrap();

    match &parsed.get_option(DHO_FQDN).unwrap().value {
        OptionValue::Fqdn(fqdn) => {
            assert_eq!(fqdn.domain.to_text(), "pc.example.org.");
        }
        other => panic!("expected FQDN option, got {other:?}"),
    }
    assert_eq!(parsed.pack().unwrap(), wire);
}
