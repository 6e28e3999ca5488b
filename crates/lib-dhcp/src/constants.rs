pub const SERVER_PORT: u16 = 67;
pub const CLIENT_PORT: u16 = 68;

pub const MAGIC_COOKIE: u32 = 0x6382_5363;
pub const MAGIC_COOKIE_ARR: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

/// Fixed DHCPv4 header length, up to but not including the magic cookie.
pub const PKT_HDR_LEN: usize = 236;
/// Minimum length of a DHCPv4 message: fixed header plus magic cookie.
pub const MIN_PKT_LEN: usize = PKT_HDR_LEN + 4;

pub const MAX_CHADDR_LEN: usize = 16;
pub const MAX_SNAME_LEN: usize = 64;
pub const MAX_FILE_LEN: usize = 128;

/// One-byte code plus one-byte length.
pub const OPTION_HDR_LEN: usize = 2;
pub const MAX_OPTION_PAYLOAD_LEN: usize = 255;

pub const HTYPE_ETHER: u8 = 1;

pub const FLAG_BROADCAST_MASK: u16 = 0x8000;

/// How many times a conflicting allocation is retried before giving up.
pub const MAX_ALLOCATE_RETRY: u32 = 5;
/// Transaction id used on the synthetic decline sent after a ping conflict.
pub const DECLINE_CONFLICT_XID: u32 = 1234;

/// 2000-01-01T00:00:00Z, the DUID time epoch.
pub const DUID_TIME_EPOCH: u64 = 946_684_800;

pub const DHCP4_OPTION_SPACE: &str = "dhcp4";
pub const DHCP_AGENT_OPTIONS_SPACE: &str = "dhcp-agent-options-space";
pub const VENDOR_ENCAPSULATED_OPTIONS_SPACE: &str = "vendor-encapsulated-options-space";

pub const DEFAULT_MASTER_IP: &str = "127.0.0.1";
pub const DEFAULT_MASTER_PORT: u16 = 5555;

/// Queue capacity per worker for the ingress and egress queues.
pub const QUEUE_SIZE_PER_WORKER: usize = 1000;

pub const VENDOR_CLASS_PREFIX: &str = "VENDOR_CLASS_";
pub const DOCSIS3_CLASS_MODEM: &str = "docsis3.0";
pub const DOCSIS3_CLASS_EROUTER: &str = "eRouter1.0";
