use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use ipnet::Ipv4Net;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::classify::{ClassParseError, Classifier};
use crate::defs::{DefinitionError, FactoryError, OptionDefRegistry, OptionDefinition};
use crate::subnet::{Pool, Subnet, SubnetError, SubnetRegistry, Triplet};
use crate::types::option::{decode_hex, OptionDataType, UnknownDataType};
use crate::{DEFAULT_MASTER_IP, DEFAULT_MASTER_PORT, DHCP4_OPTION_SPACE, SERVER_PORT};

const DEFAULT_VALID_LIFETIME: u32 = 4800;
const DEFAULT_TIMER: u32 = 4000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error while reading JSON config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Error while deserializing JSON: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Option definition error: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Unknown option data type: {0}")]
    DataType(#[from] UnknownDataType),

    #[error("Client class '{name}': {source}")]
    ClientClass {
        name: String,
        source: ClassParseError,
    },

    #[error("Subnet error: {0}")]
    Subnet(#[from] SubnetError),

    #[error("The format of subnet '{0}' should be address/mask")]
    BadSubnetPrefix(String),

    #[error("The format of pool '{0}' should be first-last")]
    BadPoolRange(String),

    #[error("Option data for '{entry}' does not parse: {source}")]
    OptionData {
        entry: String,
        source: FactoryError,
    },

    #[error("Option data entry names neither a known code nor a known name")]
    UnknownOptionData,

    #[error("Option data for '{0}' is not valid hex")]
    BadHexData(String),
}

/// Top-level configuration document. Everything the core consumes lives
/// under the `dhcp4` key.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub dhcp4: Dhcp4Config,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dhcp4Config {
    #[serde(rename = "interfaces-config", default)]
    pub interfaces_config: InterfacesConfig,

    #[serde(rename = "worker-count")]
    pub worker_count: Option<usize>,

    #[serde(rename = "kea-master-ip")]
    pub master_ip: Option<String>,

    #[serde(rename = "kea-master-port")]
    pub master_port: Option<u16>,

    #[serde(rename = "ping-check", default)]
    pub ping_check: PingCheckConfig,

    #[serde(rename = "option-def", default)]
    pub option_defs: Vec<OptionDefConfig>,

    #[serde(rename = "client-classes", default)]
    pub client_classes: Vec<ClientClassConfig>,

    #[serde(rename = "subnet4", default)]
    pub subnets: Vec<SubnetConfig>,

    #[serde(rename = "hooks-libraries", default)]
    pub hooks_libraries: Vec<HooksLibraryConfig>,

    pub logging: Option<LoggingConfig>,

    #[serde(rename = "duid-file")]
    pub duid_file: Option<PathBuf>,
}

impl Dhcp4Config {
    pub fn listen_port(&self) -> u16 {
        self.interfaces_config.port.unwrap_or(SERVER_PORT)
    }

    pub fn master_endpoint(&self) -> (String, u16) {
        (
            self.master_ip
                .clone()
                .unwrap_or_else(|| DEFAULT_MASTER_IP.to_string()),
            self.master_port.unwrap_or(DEFAULT_MASTER_PORT),
        )
    }

    /// The built-in definition tables plus every configured custom
    /// definition.
    pub fn build_option_defs(&self) -> Result<OptionDefRegistry, ConfigError> {
        let mut registry = OptionDefRegistry::with_std_defs();

        for def_config in &self.option_defs {
            let data_type = OptionDataType::from_name(&def_config.data_type)?;
            let def = if data_type == OptionDataType::Record {
                let mut fields = Vec::new();
                if let Some(record_types) = &def_config.record_types {
                    for field in record_types.split(',') {
                        fields.push(OptionDataType::from_name(field.trim())?);
                    }
                }
                OptionDefinition::record(&def_config.name, def_config.code, fields)
            } else if def_config.array {
                OptionDefinition::new_array(&def_config.name, def_config.code, data_type)
            } else {
                OptionDefinition::new(&def_config.name, def_config.code, data_type)
            };

            let space = def_config.space.as_deref().unwrap_or(DHCP4_OPTION_SPACE);
            registry.add(space, def)?;
        }

        Ok(registry)
    }

    pub fn build_classifier(
        &self,
        registry: &OptionDefRegistry,
    ) -> Result<Classifier, ConfigError> {
        let mut classifier = Classifier::new();
        for class in &self.client_classes {
            classifier
                .add_class(&class.name, &class.test, registry)
                .map_err(|source| ConfigError::ClientClass {
                    name: class.name.clone(),
                    source,
                })?;
        }
        Ok(classifier)
    }

    pub fn build_subnets(
        &self,
        registry: &OptionDefRegistry,
    ) -> Result<SubnetRegistry, ConfigError> {
        let mut subnets = SubnetRegistry::new();
        for subnet_config in &self.subnets {
            subnets.add(subnet_config.build(registry)?)?;
        }
        Ok(subnets)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterfacesConfig {
    #[serde(default)]
    pub interfaces: Vec<String>,

    pub port: Option<u16>,
}

impl InterfacesConfig {
    /// Parsed `<ifname>/<ipv4>` pairs; malformed entries are logged and
    /// skipped.
    pub fn bindings(&self) -> Vec<(String, Ipv4Addr)> {
        let mut bindings = Vec::new();
        for entry in &self.interfaces {
            match entry.split_once('/') {
                Some((name, addr)) => match addr.parse() {
                    Ok(addr) if !name.is_empty() => bindings.push((name.to_string(), addr)),
                    _ => warn!(entry = %entry, "ignoring malformed interface binding"),
                },
                None => warn!(entry = %entry, "ignoring malformed interface binding"),
            }
        }
        bindings
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PingCheckConfig {
    #[serde(default)]
    pub enable: bool,

    pub timeout: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionDefConfig {
    pub name: String,
    pub code: u8,

    #[serde(rename = "type")]
    pub data_type: String,

    #[serde(default)]
    pub array: bool,

    #[serde(rename = "record-types")]
    pub record_types: Option<String>,

    pub space: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientClassConfig {
    pub name: String,
    pub test: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubnetConfig {
    pub subnet: String,
    pub id: u32,

    #[serde(rename = "default-valid-lifetime")]
    pub default_valid_lifetime: Option<u32>,

    #[serde(rename = "min-valid-lifetime")]
    pub min_valid_lifetime: Option<u32>,

    #[serde(rename = "max-valid-lifetime")]
    pub max_valid_lifetime: Option<u32>,

    #[serde(rename = "renew-timer")]
    pub renew_timer: Option<u32>,

    #[serde(rename = "rebind-timer")]
    pub rebind_timer: Option<u32>,

    #[serde(rename = "next-server")]
    pub next_server: Option<Ipv4Addr>,

    pub relay: Option<RelayConfig>,

    pub interface: Option<String>,

    #[serde(default)]
    pub pools: Vec<PoolConfig>,

    #[serde(rename = "white-client-class", default)]
    pub white_client_class: Vec<String>,

    #[serde(rename = "black-client-class", default)]
    pub black_client_class: Vec<String>,

    #[serde(rename = "option-data", default)]
    pub option_data: Vec<OptionDataConfig>,
}

impl SubnetConfig {
    fn build(&self, registry: &OptionDefRegistry) -> Result<Subnet, ConfigError> {
        let net: Ipv4Net = self
            .subnet
            .trim()
            .parse()
            .map_err(|_| ConfigError::BadSubnetPrefix(self.subnet.clone()))?;

        let default = self.default_valid_lifetime.unwrap_or(DEFAULT_VALID_LIFETIME);
        let valid = Triplet::new(
            self.min_valid_lifetime.unwrap_or(default),
            default,
            self.max_valid_lifetime.unwrap_or(default),
        );

        let mut subnet = Subnet::new(self.id, net, valid)?;
        subnet.set_timers(
            Some(self.renew_timer.unwrap_or(DEFAULT_TIMER)),
            Some(self.rebind_timer.unwrap_or(DEFAULT_TIMER)),
        );

        if let Some(next_server) = self.next_server {
            subnet.set_siaddr(next_server);
        }
        if let Some(relay) = &self.relay {
            subnet.set_relay_addr(relay.ip_address);
        }
        if let Some(interface) = &self.interface {
            subnet.set_iface(interface);
        }

        for pool in &self.pools {
            subnet.add_pool(pool.parse()?)?;
        }
        for class in &self.white_client_class {
            subnet.allow_client_class(class);
        }
        for class in &self.black_client_class {
            subnet.deny_client_class(class);
        }

        for data in &self.option_data {
            match data.build(registry) {
                Ok(option) => {
                    if subnet.option_data().contains(option.code) {
                        warn!(code = option.code, subnet = %self.subnet,
                            "duplicate option-data entry ignored");
                    } else {
                        subnet.option_data_mut().insert(option);
                    }
                }
                Err(error) => {
                    warn!(subnet = %self.subnet, %error, "ignoring bad option-data entry");
                }
            }
        }

        Ok(subnet)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(rename = "ip-address")]
    pub ip_address: Ipv4Addr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    pub pool: String,
}

impl PoolConfig {
    fn parse(&self) -> Result<Pool, ConfigError> {
        let bad = || ConfigError::BadPoolRange(self.pool.clone());
        let (first, last) = self.pool.split_once('-').ok_or_else(bad)?;
        let first: Ipv4Addr = first.trim().parse().map_err(|_| bad())?;
        let last: Ipv4Addr = last.trim().parse().map_err(|_| bad())?;
        Ok(Pool::new(first, last)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionDataConfig {
    pub name: Option<String>,
    pub code: Option<u8>,
    pub data: String,

    #[serde(rename = "csv-format", default = "default_csv_format")]
    pub csv_format: bool,
}

fn default_csv_format() -> bool {
    true
}

impl OptionDataConfig {
    fn build(
        &self,
        registry: &OptionDefRegistry,
    ) -> Result<crate::types::option::DhcpOption, ConfigError> {
        let def = match (self.code, &self.name) {
            (Some(code), _) => registry.get_by_code(DHCP4_OPTION_SPACE, code),
            (None, Some(name)) => registry.get_by_name(DHCP4_OPTION_SPACE, name),
            (None, None) => None,
        }
        .ok_or(ConfigError::UnknownOptionData)?;

        let entry = self
            .name
            .clone()
            .unwrap_or_else(|| def.code().to_string());

        if self.csv_format {
            let values: Vec<String> = self.data.split(',').map(|v| v.to_string()).collect();
            def.option_from_values(&values, registry)
                .map_err(|source| ConfigError::OptionData { entry, source })
        } else {
            let binary =
                decode_hex(&self.data).ok_or_else(|| ConfigError::BadHexData(entry.clone()))?;
            def.option_factory(def.code(), &binary, registry)
                .map_err(|source| ConfigError::OptionData { entry, source })
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HooksLibraryConfig {
    pub library: PathBuf,

    pub parameters: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(rename = "log-enable", default)]
    pub enable: bool,

    #[serde(rename = "log-file-dir")]
    pub dir: Option<PathBuf>,

    #[serde(rename = "log-level")]
    pub level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        let text = r#"{
            "dhcp4": {
                "interfaces-config": {
                    "interfaces": ["eth0/192.0.2.1", "bogus"],
                    "port": 6700
                },
                "worker-count": 2,
                "kea-master-ip": "192.0.2.53",
                "kea-master-port": 5566,
                "ping-check": { "enable": true, "timeout": 2 },
                "option-def": [
                    { "name": "acme-marker", "code": 223, "type": "uint32" },
                    { "name": "acme-pair", "code": 224, "type": "record",
                      "record-types": "uint16,string" }
                ],
                "client-classes": [
                    { "name": "gateways", "test": "substring(option[61],0,2) == \"gw\"" }
                ],
                "subnet4": [
                    {
                        "subnet": "192.0.2.0/24",
                        "id": 1,
                        "default-valid-lifetime": 3600,
                        "min-valid-lifetime": 1800,
                        "max-valid-lifetime": 7200,
                        "pools": [ { "pool": "192.0.2.100 - 192.0.2.109" } ],
                        "relay": { "ip-address": "10.0.0.1" },
                        "white-client-class": ["gateways"],
                        "option-data": [
                            { "name": "routers", "data": "192.0.2.254", "csv-format": true },
                            { "code": 6, "data": "192.0.2.2, 192.0.2.3", "csv-format": true }
                        ]
                    }
                ]
            }
        }"#;
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn bindings_skip_malformed_entries() {
        let config = sample_config();
        let bindings = config.dhcp4.interfaces_config.bindings();
        assert_eq!(
            bindings,
            vec![("eth0".to_string(), "192.0.2.1".parse().unwrap())]
        );
        assert_eq!(config.dhcp4.listen_port(), 6700);
    }

    #[test]
    fn master_endpoint_defaults() {
        let config = sample_config();
        assert_eq!(
            config.dhcp4.master_endpoint(),
            ("192.0.2.53".to_string(), 5566)
        );

        let empty: Config =
            serde_json::from_str(r#"{ "dhcp4": {} }"#).unwrap();
        assert_eq!(
            empty.dhcp4.master_endpoint(),
            (DEFAULT_MASTER_IP.to_string(), DEFAULT_MASTER_PORT)
        );
        assert_eq!(empty.dhcp4.listen_port(), SERVER_PORT);
    }

    #[test]
    fn custom_option_defs_are_registered() {
        let config = sample_config();
        let registry = config.dhcp4.build_option_defs().unwrap();

        let marker = registry.get_by_code(DHCP4_OPTION_SPACE, 223).unwrap();
        assert_eq!(marker.name(), "acme-marker");

        let pair = registry.get_by_name(DHCP4_OPTION_SPACE, "acme-pair").unwrap();
        assert_eq!(
            pair.record_fields(),
            &[OptionDataType::Uint16, OptionDataType::String]
        );
    }

    #[test]
    fn subnets_carry_pools_classes_and_options() {
        let config = sample_config();
        let registry = config.dhcp4.build_option_defs().unwrap();
        let subnets = config.dhcp4.build_subnets(&registry).unwrap();

        let subnet = subnets.by_id(1).unwrap();
        assert!(subnet.in_pool("192.0.2.105".parse().unwrap()));
        assert_eq!(subnet.relay_addr(), Some("10.0.0.1".parse().unwrap()));
        assert_eq!(subnet.valid_lifetime().clamp(60), 1800);

        let routers = subnet.option_data().get(3).unwrap();
        assert_eq!(routers.text_value(), b"192.0.2.254".to_vec());

        let dns = subnet.option_data().get(6).unwrap();
        assert_eq!(dns.text_value(), b"192.0.2.2,192.0.2.3".to_vec());
    }

    #[test]
    fn classifier_builds_from_config() {
        let config = sample_config();
        let registry = config.dhcp4.build_option_defs().unwrap();
        let classifier = config.dhcp4.build_classifier(&registry).unwrap();
        assert_eq!(classifier.len(), 1);
    }

    #[test]
    fn bad_class_test_is_a_config_error() {
        let text = r#"{
            "dhcp4": {
                "client-classes": [ { "name": "broken", "test": "option ==" } ]
            }
        }"#;
        let config: Config = serde_json::from_str(text).unwrap();
        let registry = config.dhcp4.build_option_defs().unwrap();
        assert!(matches!(
            config.dhcp4.build_classifier(&registry),
            Err(ConfigError::ClientClass { .. })
        ));
    }

    #[test]
    fn duplicate_subnet_id_is_a_config_error() {
        let text = r#"{
            "dhcp4": {
                "subnet4": [
                    { "subnet": "192.0.2.0/24", "id": 1 },
                    { "subnet": "198.51.100.0/24", "id": 1 }
                ]
            }
        }"#;
        let config: Config = serde_json::from_str(text).unwrap();
        let registry = config.dhcp4.build_option_defs().unwrap();
        assert!(matches!(
            config.dhcp4.build_subnets(&registry),
            Err(ConfigError::Subnet(SubnetError::DuplicateId(1)))
        ));
    }
}
