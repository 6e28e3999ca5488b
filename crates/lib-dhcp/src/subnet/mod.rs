use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use thiserror::Error;

mod registry;

pub use registry::*;

use crate::classify::ClientClasses;
use crate::types::option::OptionCollection;

pub type SubnetId = u32;

#[derive(Debug, Error)]
pub enum SubnetError {
    #[error("Subnet id must be nonzero")]
    ZeroId,

    #[error("Invalid pool range {first}-{last}")]
    InvalidPoolRange { first: Ipv4Addr, last: Ipv4Addr },

    #[error("Pool {first}-{last} does not match the prefix of subnet {prefix}")]
    PoolOutOfRange {
        first: Ipv4Addr,
        last: Ipv4Addr,
        prefix: Ipv4Net,
    },

    #[error("ID of IPv4 subnet {0} is already in use")]
    DuplicateId(SubnetId),
}

/// A contiguous inclusive range of IPv4 addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    first: Ipv4Addr,
    last: Ipv4Addr,
}

impl Pool {
    pub fn new(first: Ipv4Addr, last: Ipv4Addr) -> Result<Self, SubnetError> {
        if u32::from(first) > u32::from(last) {
            return Err(SubnetError::InvalidPoolRange { first, last });
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> Ipv4Addr {
        self.first
    }

    pub fn last(&self) -> Ipv4Addr {
        self.last
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let addr = u32::from(addr);
        u32::from(self.first) <= addr && addr <= u32::from(self.last)
    }

    pub fn capacity(&self) -> u64 {
        u64::from(u32::from(self.last) - u32::from(self.first)) + 1
    }
}

/// A min/default/max triple of lifetime seconds. Out-of-order bounds are
/// widened around the default, the way the configuration parser always
/// treated them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triplet {
    min: u32,
    default: u32,
    max: u32,
}

impl Triplet {
    pub fn new(min: u32, default: u32, max: u32) -> Self {
        Self {
            min: min.min(default),
            default,
            max: max.max(default),
        }
    }

    pub fn from_default(default: u32) -> Self {
        Self::new(default, default, default)
    }

    pub fn get(&self) -> u32 {
        self.default
    }

    /// Clamp a client-requested value into the configured bounds.
    pub fn clamp(&self, hint: u32) -> u32 {
        hint.clamp(self.min, self.max)
    }
}

/// One configured IPv4 subnet: prefix, lifetimes, relay and interface
/// bindings, address pools, client class filters, and per-subnet option
/// data handed out in responses.
#[derive(Debug, Clone)]
pub struct Subnet {
    id: SubnetId,
    net: Ipv4Net,
    valid: Triplet,
    t1: Option<u32>,
    t2: Option<u32>,
    siaddr: Ipv4Addr,
    relay_addr: Option<Ipv4Addr>,
    iface: Option<String>,
    pools: Vec<Pool>,
    white_list: BTreeSet<String>,
    black_list: BTreeSet<String>,
    option_data: OptionCollection,
}

impl Subnet {
    pub fn new(id: SubnetId, net: Ipv4Net, valid: Triplet) -> Result<Self, SubnetError> {
        if id == 0 {
            return Err(SubnetError::ZeroId);
        }
        Ok(Self {
            id,
            net,
            valid,
            t1: None,
            t2: None,
            siaddr: Ipv4Addr::UNSPECIFIED,
            relay_addr: None,
            iface: None,
            pools: Vec::new(),
            white_list: BTreeSet::new(),
            black_list: BTreeSet::new(),
            option_data: OptionCollection::new(),
        })
    }

    pub fn id(&self) -> SubnetId {
        self.id
    }

    pub fn prefix(&self) -> Ipv4Net {
        self.net
    }

    pub fn netmask(&self) -> Ipv4Addr {
        self.net.netmask()
    }

    pub fn valid_lifetime(&self) -> &Triplet {
        &self.valid
    }

    pub fn t1(&self) -> Option<u32> {
        self.t1
    }

    pub fn t2(&self) -> Option<u32> {
        self.t2
    }

    pub fn set_timers(&mut self, t1: Option<u32>, t2: Option<u32>) {
        self.t1 = t1;
        self.t2 = t2;
    }

    pub fn siaddr(&self) -> Ipv4Addr {
        self.siaddr
    }

    pub fn set_siaddr(&mut self, siaddr: Ipv4Addr) {
        self.siaddr = siaddr;
    }

    pub fn relay_addr(&self) -> Option<Ipv4Addr> {
        self.relay_addr
    }

    pub fn set_relay_addr(&mut self, addr: Ipv4Addr) {
        self.relay_addr = Some(addr);
    }

    pub fn iface(&self) -> Option<&str> {
        self.iface.as_deref()
    }

    pub fn set_iface(&mut self, name: impl Into<String>) {
        self.iface = Some(name.into());
    }

    pub fn in_range(&self, addr: Ipv4Addr) -> bool {
        self.net.contains(&addr)
    }

    pub fn add_pool(&mut self, pool: Pool) -> Result<(), SubnetError> {
        if !self.in_range(pool.first()) || !self.in_range(pool.last()) {
            return Err(SubnetError::PoolOutOfRange {
                first: pool.first(),
                last: pool.last(),
                prefix: self.net,
            });
        }
        self.pools.push(pool);
        Ok(())
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn in_pool(&self, addr: Ipv4Addr) -> bool {
        self.in_range(addr) && self.pools.iter().any(|p| p.contains(addr))
    }

    pub fn pool_capacity(&self) -> u64 {
        self.pools
            .iter()
            .fold(0u64, |sum, p| sum.saturating_add(p.capacity()))
    }

    pub fn allow_client_class(&mut self, class: impl Into<String>) {
        self.white_list.insert(class.into());
    }

    pub fn deny_client_class(&mut self, class: impl Into<String>) {
        self.black_list.insert(class.into());
    }

    /// Class admission: a non-empty white list must intersect the packet's
    /// classes; otherwise a non-empty black list must not; otherwise any
    /// client is admitted.
    pub fn client_supported(&self, classes: &ClientClasses) -> bool {
        if !self.white_list.is_empty() {
            return self.white_list.iter().any(|c| classes.contains(c));
        }
        if !self.black_list.is_empty() {
            return !self.black_list.iter().any(|c| classes.contains(c));
        }
        true
    }

    pub fn option_data(&self) -> &OptionCollection {
        &self.option_data
    }

    pub fn option_data_mut(&mut self) -> &mut OptionCollection {
        &mut self.option_data
    }

    pub fn to_text(&self) -> String {
        self.net.to_string()
    }
}
