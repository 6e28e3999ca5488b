use std::net::Ipv4Addr;

use crate::classify::ClientClasses;
use crate::subnet::{Subnet, SubnetError, SubnetId};

/// Everything subnet selection may depend on. The selector is a pure
/// function of these inputs and the registry contents.
#[derive(Debug, Clone)]
pub struct SubnetSelector {
    pub ciaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub local_addr: Ipv4Addr,
    pub remote_addr: Ipv4Addr,
    pub iface_name: String,
    /// First usable IPv4 address of the receiving interface.
    pub iface_addr: Option<Ipv4Addr>,
    /// Address from the subnet-selection option or the RAI link-selection
    /// sub-option.
    pub option_select: Ipv4Addr,
    pub client_classes: ClientClasses,
}

impl Default for SubnetSelector {
    fn default() -> Self {
        Self {
            ciaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            local_addr: Ipv4Addr::UNSPECIFIED,
            remote_addr: Ipv4Addr::UNSPECIFIED,
            iface_name: String::new(),
            iface_addr: None,
            option_select: Ipv4Addr::UNSPECIFIED,
            client_classes: ClientClasses::default(),
        }
    }
}

/// The configured subnet collection. Built at configuration time, shared
/// read-only across workers afterwards.
#[derive(Debug, Clone, Default)]
pub struct SubnetRegistry {
    subnets: Vec<Subnet>,
}

impl SubnetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, subnet: Subnet) -> Result<(), SubnetError> {
        if self.by_id(subnet.id()).is_some() {
            return Err(SubnetError::DuplicateId(subnet.id()));
        }
        self.subnets.push(subnet);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.subnets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subnets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subnet> {
        self.subnets.iter()
    }

    pub fn by_id(&self, id: SubnetId) -> Option<&Subnet> {
        self.subnets.iter().find(|s| s.id() == id)
    }

    /// Pick a subnet for a packet, stopping at the first match:
    ///
    /// 1. the subnet-select address, when present;
    /// 2. a relay binding equal to giaddr, regardless of prefix;
    /// 3. a candidate address derived from giaddr, ciaddr, the remote
    ///    address or the receiving interface, matched against prefixes.
    ///    On the interface fallback, interface-name bound subnets are
    ///    tried before prefix matches.
    pub fn select(&self, selector: &SubnetSelector) -> Option<&Subnet> {
        if !selector.option_select.is_unspecified() {
            return self.select_by_addr(selector.option_select, &selector.client_classes);
        }

        if !selector.giaddr.is_unspecified() {
            for subnet in &self.subnets {
                if subnet.relay_addr() != Some(selector.giaddr) {
                    continue;
                }
                if subnet.client_supported(&selector.client_classes) {
                    return Some(subnet);
                }
            }
        }

        let mut address = Ipv4Addr::UNSPECIFIED;
        if !selector.giaddr.is_unspecified() {
            address = selector.giaddr;
        } else if !selector.ciaddr.is_unspecified() && !selector.local_addr.is_broadcast() {
            address = selector.ciaddr;
        } else if !selector.remote_addr.is_unspecified() && !selector.local_addr.is_broadcast() {
            address = selector.remote_addr;
        } else if !selector.iface_name.is_empty() {
            if let Some(subnet) =
                self.select_by_iface(&selector.iface_name, &selector.client_classes)
            {
                return Some(subnet);
            }
            if let Some(iface_addr) = selector.iface_addr {
                address = iface_addr;
            }
        }

        if address.is_unspecified() {
            return None;
        }
        self.select_by_addr(address, &selector.client_classes)
    }

    pub fn select_by_addr(
        &self,
        address: Ipv4Addr,
        classes: &ClientClasses,
    ) -> Option<&Subnet> {
        self.subnets
            .iter()
            .find(|s| s.in_range(address) && s.client_supported(classes))
    }

    pub fn select_by_iface(&self, iface: &str, classes: &ClientClasses) -> Option<&Subnet> {
        self.subnets
            .iter()
            .find(|s| s.iface() == Some(iface) && s.client_supported(classes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subnet::Triplet;

    fn subnet(id: SubnetId, prefix: &str) -> Subnet {
        Subnet::new(id, prefix.parse().unwrap(), Triplet::from_default(3600)).unwrap()
    }

    fn registry() -> SubnetRegistry {
        let mut registry = SubnetRegistry::new();

        let mut relayed = subnet(1, "192.0.2.0/24");
        relayed.set_relay_addr("10.0.0.1".parse().unwrap());
        registry.add(relayed).unwrap();

        let mut bound = subnet(2, "198.51.100.0/24");
        bound.set_iface("eth1");
        registry.add(bound).unwrap();

        registry.add(subnet(3, "203.0.113.0/24")).unwrap();
        registry
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut registry = registry();
        assert!(matches!(
            registry.add(subnet(1, "10.0.0.0/8")),
            Err(SubnetError::DuplicateId(1))
        ));
    }

    #[test]
    fn option_select_takes_priority() {
        let registry = registry();
        let selector = SubnetSelector {
            option_select: "203.0.113.7".parse().unwrap(),
            giaddr: "10.0.0.1".parse().unwrap(),
            ..Default::default()
        };
        assert_eq!(registry.select(&selector).unwrap().id(), 3);
    }

    #[test]
    fn relay_binding_beats_prefix_match() {
        let registry = registry();
        // giaddr matches subnet 1's relay binding even though the address
        // lies in no subnet prefix.
        let selector = SubnetSelector {
            giaddr: "10.0.0.1".parse().unwrap(),
            ..Default::default()
        };
        assert_eq!(registry.select(&selector).unwrap().id(), 1);
    }

    #[test]
    fn giaddr_prefix_match_without_relay_binding() {
        let registry = registry();
        let selector = SubnetSelector {
            giaddr: "203.0.113.1".parse().unwrap(),
            ..Default::default()
        };
        assert_eq!(registry.select(&selector).unwrap().id(), 3);
    }

    #[test]
    fn ciaddr_used_when_local_not_broadcast() {
        let registry = registry();
        let selector = SubnetSelector {
            ciaddr: "203.0.113.99".parse().unwrap(),
            local_addr: "203.0.113.1".parse().unwrap(),
            ..Default::default()
        };
        assert_eq!(registry.select(&selector).unwrap().id(), 3);
    }

    #[test]
    fn iface_binding_tried_before_iface_addr() {
        let registry = registry();
        let selector = SubnetSelector {
            local_addr: Ipv4Addr::BROADCAST,
            iface_name: "eth1".to_string(),
            iface_addr: Some("203.0.113.1".parse().unwrap()),
            ..Default::default()
        };
        assert_eq!(registry.select(&selector).unwrap().id(), 2);
    }

    #[test]
    fn iface_addr_fallback() {
        let registry = registry();
        let selector = SubnetSelector {
            local_addr: Ipv4Addr::BROADCAST,
            iface_name: "eth9".to_string(),
            iface_addr: Some("203.0.113.1".parse().unwrap()),
            ..Default::default()
        };
        assert_eq!(registry.select(&selector).unwrap().id(), 3);
    }

    #[test]
    fn no_match_returns_none() {
        let registry = registry();
        let selector = SubnetSelector::default();
        assert!(registry.select(&selector).is_none());
    }

    #[test]
    fn class_filter_applies_during_selection() {
        let mut registry = SubnetRegistry::new();
        let mut gold_only = subnet(1, "192.0.2.0/24");
        gold_only.allow_client_class("gold");
        registry.add(gold_only).unwrap();
        registry.add(subnet(2, "192.0.2.0/24")).unwrap();

        let mut selector = SubnetSelector {
            ciaddr: "192.0.2.5".parse().unwrap(),
            ..Default::default()
        };
        assert_eq!(registry.select(&selector).unwrap().id(), 2);

        selector.client_classes.insert("gold");
        assert_eq!(registry.select(&selector).unwrap().id(), 1);
    }
}
