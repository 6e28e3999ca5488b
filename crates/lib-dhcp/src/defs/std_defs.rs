//! The built-in definition table for the `dhcp4` option space and the
//! relay agent sub-option space.

use crate::types::option::code::*;
use crate::types::option::OptionDataType::*;
use crate::defs::OptionDefinition;
use crate::VENDOR_ENCAPSULATED_OPTIONS_SPACE;

use crate::DHCP_AGENT_OPTIONS_SPACE;

/// Standard DHCPv4 option definitions, RFC 2132 and friends.
pub fn std_option_defs() -> Vec<OptionDefinition> {
    vec![
        OptionDefinition::new("subnet-mask", DHO_SUBNET_MASK, Ipv4Address),
        OptionDefinition::new("time-offset", DHO_TIME_OFFSET, Int32),
        OptionDefinition::new_array("routers", DHO_ROUTERS, Ipv4Address),
        OptionDefinition::new_array("time-servers", DHO_TIME_SERVERS, Ipv4Address),
        OptionDefinition::new_array("name-servers", DHO_NAME_SERVERS, Ipv4Address),
        OptionDefinition::new_array("domain-name-servers", DHO_DOMAIN_NAME_SERVERS, Ipv4Address),
        OptionDefinition::new_array("log-servers", DHO_LOG_SERVERS, Ipv4Address),
        OptionDefinition::new_array("cookie-servers", DHO_COOKIE_SERVERS, Ipv4Address),
        OptionDefinition::new_array("lpr-servers", DHO_LPR_SERVERS, Ipv4Address),
        OptionDefinition::new_array("impress-servers", DHO_IMPRESS_SERVERS, Ipv4Address),
        OptionDefinition::new_array(
            "resource-location-servers",
            DHO_RESOURCE_LOCATION_SERVERS,
            Ipv4Address,
        ),
        OptionDefinition::new("host-name", DHO_HOST_NAME, String),
        OptionDefinition::new("boot-size", DHO_BOOT_SIZE, Uint16),
        OptionDefinition::new("merit-dump", DHO_MERIT_DUMP, String),
        OptionDefinition::new("domain-name", DHO_DOMAIN_NAME, String),
        OptionDefinition::new("swap-server", DHO_SWAP_SERVER, Ipv4Address),
        OptionDefinition::new("root-path", DHO_ROOT_PATH, String),
        OptionDefinition::new("extensions-path", DHO_EXTENSIONS_PATH, String),
        OptionDefinition::new("ip-forwarding", DHO_IP_FORWARDING, Boolean),
        OptionDefinition::new("non-local-source-routing", DHO_NON_LOCAL_SOURCE_ROUTING, Boolean),
        OptionDefinition::new_array("policy-filter", DHO_POLICY_FILTER, Ipv4Address),
        OptionDefinition::new("max-dgram-reassembly", DHO_MAX_DGRAM_REASSEMBLY, Uint16),
        OptionDefinition::new("default-ip-ttl", DHO_DEFAULT_IP_TTL, Uint8),
        OptionDefinition::new("path-mtu-aging-timeout", DHO_PATH_MTU_AGING_TIMEOUT, Uint32),
        OptionDefinition::new_array("path-mtu-plateau-table", DHO_PATH_MTU_PLATEAU_TABLE, Uint16),
        OptionDefinition::new("interface-mtu", DHO_INTERFACE_MTU, Uint16),
        OptionDefinition::new("all-subnets-local", DHO_ALL_SUBNETS_LOCAL, Boolean),
        OptionDefinition::new("broadcast-address", DHO_BROADCAST_ADDRESS, Ipv4Address),
        OptionDefinition::new("perform-mask-discovery", DHO_PERFORM_MASK_DISCOVERY, Boolean),
        OptionDefinition::new("mask-supplier", DHO_MASK_SUPPLIER, Boolean),
        OptionDefinition::new("router-discovery", DHO_ROUTER_DISCOVERY, Boolean),
        OptionDefinition::new(
            "router-solicitation-address",
            DHO_ROUTER_SOLICITATION_ADDRESS,
            Ipv4Address,
        ),
        OptionDefinition::new_array("static-routes", DHO_STATIC_ROUTES, Ipv4Address),
        OptionDefinition::new("trailer-encapsulation", DHO_TRAILER_ENCAPSULATION, Boolean),
        OptionDefinition::new("arp-cache-timeout", DHO_ARP_CACHE_TIMEOUT, Uint32),
        OptionDefinition::new("ieee802-3-encapsulation", DHO_IEEE802_3_ENCAPSULATION, Boolean),
        OptionDefinition::new("default-tcp-ttl", DHO_DEFAULT_TCP_TTL, Uint8),
        OptionDefinition::new("tcp-keepalive-interval", DHO_TCP_KEEPALIVE_INTERVAL, Uint32),
        OptionDefinition::new("tcp-keepalive-garbage", DHO_TCP_KEEPALIVE_GARBAGE, Boolean),
        OptionDefinition::new("nis-domain", DHO_NIS_DOMAIN, String),
        OptionDefinition::new_array("nis-servers", DHO_NIS_SERVERS, Ipv4Address),
        OptionDefinition::new_array("ntp-servers", DHO_NTP_SERVERS, Ipv4Address),
        OptionDefinition::with_space(
            "vendor-encapsulated-options",
            DHO_VENDOR_ENCAPSULATED_OPTIONS,
            Empty,
            VENDOR_ENCAPSULATED_OPTIONS_SPACE,
        ),
        OptionDefinition::new_array("netbios-name-servers", DHO_NETBIOS_NAME_SERVERS, Ipv4Address),
        OptionDefinition::new_array("netbios-dd-server", DHO_NETBIOS_DD_SERVER, Ipv4Address),
        OptionDefinition::new("netbios-node-type", DHO_NETBIOS_NODE_TYPE, Uint8),
        OptionDefinition::new("netbios-scope", DHO_NETBIOS_SCOPE, String),
        OptionDefinition::new_array("font-servers", DHO_FONT_SERVERS, Ipv4Address),
        OptionDefinition::new_array("x-display-manager", DHO_X_DISPLAY_MANAGER, Ipv4Address),
        OptionDefinition::new("dhcp-requested-address", DHO_DHCP_REQUESTED_ADDRESS, Ipv4Address),
        OptionDefinition::new("dhcp-lease-time", DHO_DHCP_LEASE_TIME, Uint32),
        OptionDefinition::new("dhcp-option-overload", DHO_DHCP_OPTION_OVERLOAD, Uint8),
        OptionDefinition::new("dhcp-message-type", DHO_DHCP_MESSAGE_TYPE, Uint8),
        OptionDefinition::new(
            "dhcp-server-identifier",
            DHO_DHCP_SERVER_IDENTIFIER,
            Ipv4Address,
        ),
        OptionDefinition::new_array(
            "dhcp-parameter-request-list",
            DHO_DHCP_PARAMETER_REQUEST_LIST,
            Uint8,
        ),
        OptionDefinition::new("dhcp-message", DHO_DHCP_MESSAGE, String),
        OptionDefinition::new("dhcp-max-message-size", DHO_DHCP_MAX_MESSAGE_SIZE, Uint16),
        OptionDefinition::new("dhcp-renewal-time", DHO_DHCP_RENEWAL_TIME, Uint32),
        OptionDefinition::new("dhcp-rebinding-time", DHO_DHCP_REBINDING_TIME, Uint32),
        OptionDefinition::new(
            "vendor-class-identifier",
            DHO_VENDOR_CLASS_IDENTIFIER,
            String,
        ),
        OptionDefinition::new("dhcp-client-identifier", DHO_DHCP_CLIENT_IDENTIFIER, Binary),
        OptionDefinition::new("nwip-domain-name", DHO_NWIP_DOMAIN_NAME, String),
        OptionDefinition::new("nwip-suboptions", DHO_NWIP_SUBOPTIONS, Binary),
        OptionDefinition::new("nisplus-domain-name", DHO_NISP_DOMAIN_NAME, String),
        OptionDefinition::new_array("nisplus-servers", DHO_NISP_SERVER_ADDR, Ipv4Address),
        OptionDefinition::new("tftp-server-name", DHO_TFTP_SERVER_NAME, String),
        OptionDefinition::new("boot-file-name", DHO_BOOT_FILE_NAME, String),
        OptionDefinition::new_array("mobile-ip-home-agent", DHO_HOME_AGENT_ADDRS, Ipv4Address),
        OptionDefinition::new_array("smtp-server", DHO_SMTP_SERVER, Ipv4Address),
        OptionDefinition::new_array("pop-server", DHO_POP3_SERVER, Ipv4Address),
        OptionDefinition::new_array("nntp-server", DHO_NNTP_SERVER, Ipv4Address),
        OptionDefinition::new_array("www-server", DHO_WWW_SERVER, Ipv4Address),
        OptionDefinition::new_array("finger-server", DHO_FINGER_SERVER, Ipv4Address),
        OptionDefinition::new_array("irc-server", DHO_IRC_SERVER, Ipv4Address),
        OptionDefinition::new_array("streettalk-server", DHO_STREETTALK_SERVER, Ipv4Address),
        OptionDefinition::new_array(
            "streettalk-directory-assistance-server",
            DHO_STDASERVER,
            Ipv4Address,
        ),
        OptionDefinition::new("user-class", DHO_USER_CLASS, Binary),
        OptionDefinition::record("fqdn", DHO_FQDN, vec![Uint8, Uint8, Uint8, Fqdn]),
        OptionDefinition::with_space(
            "dhcp-agent-options",
            DHO_DHCP_AGENT_OPTIONS,
            Empty,
            DHCP_AGENT_OPTIONS_SPACE,
        ),
        // The AUTHENTICATE option carries a 64-bit replay-detection field
        // which no record field type can express, so it stays binary.
        OptionDefinition::new("authenticate", DHO_AUTHENTICATE, Binary),
        OptionDefinition::new(
            "client-last-transaction-time",
            DHO_CLIENT_LAST_TRANSACTION_TIME,
            Uint32,
        ),
        OptionDefinition::new_array("associated-ip", DHO_ASSOCIATED_IP, Ipv4Address),
        OptionDefinition::new_array("client-system", DHO_SYSTEM, Uint16),
        OptionDefinition::record("client-ndi", DHO_NDI, vec![Uint8, Uint8, Uint8]),
        OptionDefinition::record("uuid-guid", DHO_UUID_GUID, vec![Uint8, Binary]),
        OptionDefinition::new("subnet-selection", DHO_SUBNET_SELECTION, Ipv4Address),
        OptionDefinition::new_array("domain-search", DHO_DOMAIN_SEARCH, Fqdn),
        OptionDefinition::record("vivco-suboptions", DHO_VIVCO_SUBOPTIONS, vec![Uint32, Binary]),
        OptionDefinition::new("vivso-suboptions", DHO_VIVSO_SUBOPTIONS, Uint32),
    ]
}

/// Relay Agent Information sub-option definitions, RFC 3046 and RFC 3527.
pub fn agent_option_defs() -> Vec<OptionDefinition> {
    vec![
        OptionDefinition::new("circuit-id", RAI_OPTION_AGENT_CIRCUIT_ID, Binary),
        OptionDefinition::new("remote-id", RAI_OPTION_REMOTE_ID, Binary),
        OptionDefinition::new("link-selection", RAI_OPTION_LINK_SELECTION, Ipv4Address),
        OptionDefinition::new("subscriber-id", RAI_OPTION_SUBSCRIBER_ID, Binary),
        OptionDefinition::new(
            "server-id-override",
            RAI_OPTION_SERVER_ID_OVERRIDE,
            Ipv4Address,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_std_defs_are_valid() {
        for def in std_option_defs() {
            assert!(def.validate().is_ok(), "invalid def {}", def.name());
        }
        for def in agent_option_defs() {
            assert!(def.validate().is_ok(), "invalid def {}", def.name());
        }
    }

    #[test]
    fn std_table_has_no_duplicate_codes() {
        let defs = std_option_defs();
        let mut codes: Vec<u8> = defs.iter().map(|d| d.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), defs.len());
    }
}
