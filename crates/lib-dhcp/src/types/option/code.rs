//! DHCPv4 option codes, as assigned by RFC 2132 and its successors.

pub const DHO_PAD: u8 = 0;
pub const DHO_SUBNET_MASK: u8 = 1;
pub const DHO_TIME_OFFSET: u8 = 2;
pub const DHO_ROUTERS: u8 = 3;
pub const DHO_TIME_SERVERS: u8 = 4;
pub const DHO_NAME_SERVERS: u8 = 5;
pub const DHO_DOMAIN_NAME_SERVERS: u8 = 6;
pub const DHO_LOG_SERVERS: u8 = 7;
pub const DHO_COOKIE_SERVERS: u8 = 8;
pub const DHO_LPR_SERVERS: u8 = 9;
pub const DHO_IMPRESS_SERVERS: u8 = 10;
pub const DHO_RESOURCE_LOCATION_SERVERS: u8 = 11;
pub const DHO_HOST_NAME: u8 = 12;
pub const DHO_BOOT_SIZE: u8 = 13;
pub const DHO_MERIT_DUMP: u8 = 14;
pub const DHO_DOMAIN_NAME: u8 = 15;
pub const DHO_SWAP_SERVER: u8 = 16;
pub const DHO_ROOT_PATH: u8 = 17;
pub const DHO_EXTENSIONS_PATH: u8 = 18;
pub const DHO_IP_FORWARDING: u8 = 19;
pub const DHO_NON_LOCAL_SOURCE_ROUTING: u8 = 20;
pub const DHO_POLICY_FILTER: u8 = 21;
pub const DHO_MAX_DGRAM_REASSEMBLY: u8 = 22;
pub const DHO_DEFAULT_IP_TTL: u8 = 23;
pub const DHO_PATH_MTU_AGING_TIMEOUT: u8 = 24;
pub const DHO_PATH_MTU_PLATEAU_TABLE: u8 = 25;
pub const DHO_INTERFACE_MTU: u8 = 26;
pub const DHO_ALL_SUBNETS_LOCAL: u8 = 27;
pub const DHO_BROADCAST_ADDRESS: u8 = 28;
pub const DHO_PERFORM_MASK_DISCOVERY: u8 = 29;
pub const DHO_MASK_SUPPLIER: u8 = 30;
pub const DHO_ROUTER_DISCOVERY: u8 = 31;
pub const DHO_ROUTER_SOLICITATION_ADDRESS: u8 = 32;
pub const DHO_STATIC_ROUTES: u8 = 33;
pub const DHO_TRAILER_ENCAPSULATION: u8 = 34;
pub const DHO_ARP_CACHE_TIMEOUT: u8 = 35;
pub const DHO_IEEE802_3_ENCAPSULATION: u8 = 36;
pub const DHO_DEFAULT_TCP_TTL: u8 = 37;
pub const DHO_TCP_KEEPALIVE_INTERVAL: u8 = 38;
pub const DHO_TCP_KEEPALIVE_GARBAGE: u8 = 39;
pub const DHO_NIS_DOMAIN: u8 = 40;
pub const DHO_NIS_SERVERS: u8 = 41;
pub const DHO_NTP_SERVERS: u8 = 42;
pub const DHO_VENDOR_ENCAPSULATED_OPTIONS: u8 = 43;
pub const DHO_NETBIOS_NAME_SERVERS: u8 = 44;
pub const DHO_NETBIOS_DD_SERVER: u8 = 45;
pub const DHO_NETBIOS_NODE_TYPE: u8 = 46;
pub const DHO_NETBIOS_SCOPE: u8 = 47;
pub const DHO_FONT_SERVERS: u8 = 48;
pub const DHO_X_DISPLAY_MANAGER: u8 = 49;
pub const DHO_DHCP_REQUESTED_ADDRESS: u8 = 50;
pub const DHO_DHCP_LEASE_TIME: u8 = 51;
pub const DHO_DHCP_OPTION_OVERLOAD: u8 = 52;
pub const DHO_DHCP_MESSAGE_TYPE: u8 = 53;
pub const DHO_DHCP_SERVER_IDENTIFIER: u8 = 54;
pub const DHO_DHCP_PARAMETER_REQUEST_LIST: u8 = 55;
pub const DHO_DHCP_MESSAGE: u8 = 56;
pub const DHO_DHCP_MAX_MESSAGE_SIZE: u8 = 57;
pub const DHO_DHCP_RENEWAL_TIME: u8 = 58;
pub const DHO_DHCP_REBINDING_TIME: u8 = 59;
pub const DHO_VENDOR_CLASS_IDENTIFIER: u8 = 60;
pub const DHO_DHCP_CLIENT_IDENTIFIER: u8 = 61;
pub const DHO_NWIP_DOMAIN_NAME: u8 = 62;
pub const DHO_NWIP_SUBOPTIONS: u8 = 63;
pub const DHO_NISP_DOMAIN_NAME: u8 = 64;
pub const DHO_NISP_SERVER_ADDR: u8 = 65;
pub const DHO_TFTP_SERVER_NAME: u8 = 66;
pub const DHO_BOOT_FILE_NAME: u8 = 67;
pub const DHO_HOME_AGENT_ADDRS: u8 = 68;
pub const DHO_SMTP_SERVER: u8 = 69;
pub const DHO_POP3_SERVER: u8 = 70;
pub const DHO_NNTP_SERVER: u8 = 71;
pub const DHO_WWW_SERVER: u8 = 72;
pub const DHO_FINGER_SERVER: u8 = 73;
pub const DHO_IRC_SERVER: u8 = 74;
pub const DHO_STREETTALK_SERVER: u8 = 75;
pub const DHO_STDASERVER: u8 = 76;
pub const DHO_USER_CLASS: u8 = 77;
pub const DHO_FQDN: u8 = 81;
pub const DHO_DHCP_AGENT_OPTIONS: u8 = 82;
pub const DHO_AUTHENTICATE: u8 = 90;
pub const DHO_CLIENT_LAST_TRANSACTION_TIME: u8 = 91;
pub const DHO_ASSOCIATED_IP: u8 = 92;
pub const DHO_SYSTEM: u8 = 93;
pub const DHO_NDI: u8 = 94;
pub const DHO_UUID_GUID: u8 = 97;
pub const DHO_SUBNET_SELECTION: u8 = 118;
pub const DHO_DOMAIN_SEARCH: u8 = 119;
pub const DHO_VIVCO_SUBOPTIONS: u8 = 124;
pub const DHO_VIVSO_SUBOPTIONS: u8 = 125;
pub const DHO_END: u8 = 255;

/// Relay Agent Information sub-option codes (`dhcp-agent-options-space`).
pub const RAI_OPTION_AGENT_CIRCUIT_ID: u8 = 1;
pub const RAI_OPTION_REMOTE_ID: u8 = 2;
pub const RAI_OPTION_LINK_SELECTION: u8 = 5;
pub const RAI_OPTION_SUBSCRIBER_ID: u8 = 6;
pub const RAI_OPTION_SERVER_ID_OVERRIDE: u8 = 11;
