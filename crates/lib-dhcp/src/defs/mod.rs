use std::collections::HashMap;

use tracing::warn;

mod definition;
mod space;
mod std_defs;

pub use definition::*;
pub use space::*;
pub use std_defs::*;

use crate::types::option::code::{DHO_END, DHO_PAD};
use crate::types::option::{DhcpOption, OptionCollection, OptionValue};
use crate::types::DecodeError;
use crate::{DHCP4_OPTION_SPACE, DHCP_AGENT_OPTIONS_SPACE};

/// All option definitions known to the server: the built-in `dhcp4` table,
/// the relay agent sub-option space, runtime user spaces, and one table per
/// vendor enterprise id. Built at configuration time, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct OptionDefRegistry {
    spaces: HashMap<String, OptionSpaceTable>,
    vendor: HashMap<u32, OptionSpaceTable>,
}

impl OptionDefRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the standard tables.
    pub fn with_std_defs() -> Self {
        let mut registry = Self::new();
        for def in std_option_defs() {
            registry
                .add(DHCP4_OPTION_SPACE, def)
                .expect("static std table is valid");
        }
        for def in agent_option_defs() {
            registry
                .add(DHCP_AGENT_OPTIONS_SPACE, def)
                .expect("static agent table is valid");
        }
        registry
    }

    pub fn add(&mut self, space: &str, def: OptionDefinition) -> Result<(), DefinitionError> {
        if let Some(vendor_id) = Self::space_to_vendor_id(space) {
            return self.vendor.entry(vendor_id).or_default().add(space, def);
        }
        self.spaces
            .entry(space.to_string())
            .or_default()
            .add(space, def)
    }

    pub fn get_by_code(&self, space: &str, code: u8) -> Option<&OptionDefinition> {
        if let Some(vendor_id) = Self::space_to_vendor_id(space) {
            return self.vendor.get(&vendor_id)?.get_by_code(code);
        }
        self.spaces.get(space)?.get_by_code(code)
    }

    pub fn get_by_name(&self, space: &str, name: &str) -> Option<&OptionDefinition> {
        if let Some(vendor_id) = Self::space_to_vendor_id(space) {
            return self.vendor.get(&vendor_id)?.get_by_name(name);
        }
        self.spaces.get(space)?.get_by_name(name)
    }

    pub fn vendor_table(&self, vendor_id: u32) -> Option<&OptionSpaceTable> {
        self.vendor.get(&vendor_id)
    }

    /// Enterprise id of a `vendor-<decimal>` space name, if it is one.
    pub fn space_to_vendor_id(space: &str) -> Option<u32> {
        space.strip_prefix("vendor-")?.parse().ok()
    }

    /// Whether the code is assigned by a standards-track document. The
    /// unassigned ranges are enumerated by hand, matching IANA as of the
    /// original implementation.
    pub fn is_standard_option(code: u8) -> bool {
        !(code == 84
            || code == 96
            || (102..112).contains(&code)
            || code == 115
            || code == 126
            || code == 127
            || (147..150).contains(&code)
            || (178..208).contains(&code)
            || (214..220).contains(&code)
            || (222..255).contains(&code))
    }
}

/// Walk a TLV option stream and populate `options`, consulting the
/// definition registry for the given space. PAD bytes are consumed
/// silently, END terminates the scan, and an option claiming more bytes
/// than remain rejects the stream. A payload its definition cannot parse
/// is logged and skipped; the rest of the stream survives.
pub fn unpack_options(
    buf: &[u8],
    space: &str,
    registry: &OptionDefRegistry,
    options: &mut OptionCollection,
) -> Result<(), DecodeError> {
    let mut offset = 0;

    while offset < buf.len() {
        let code = buf[offset];
        offset += 1;

        if code == DHO_END {
            return Ok(());
        }
        if code == DHO_PAD {
            continue;
        }

        if offset >= buf.len() {
            return Err(DecodeError::TruncatedOption { code, offset });
        }
        let len = buf[offset] as usize;
        offset += 1;

        if offset + len > buf.len() {
            return Err(DecodeError::TruncatedOption { code, offset });
        }
        let payload = &buf[offset..offset + len];
        offset += len;

        match registry.get_by_code(space, code) {
            Some(def) => match def.option_factory(code, payload, registry) {
                Ok(option) => options.insert(option),
                Err(error) => {
                    warn!(code, space, %error, "dropping option with malformed payload");
                }
            },
            None => {
                let mut option = DhcpOption::new(code, OptionValue::Opaque(payload.to_vec()));
                option.encapsulated_space = Some(space.to_string());
                options.insert(option);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::option::code::*;
    use crate::types::option::{OptionDataType, ScalarValue};

    #[test]
    fn std_registry_resolves_both_keys() {
        let registry = OptionDefRegistry::with_std_defs();
        let by_code = registry.get_by_code(DHCP4_OPTION_SPACE, DHO_ROUTERS).unwrap();
        let by_name = registry.get_by_name(DHCP4_OPTION_SPACE, "routers").unwrap();
        assert_eq!(by_code, by_name);
        assert!(by_code.is_array());
    }

    #[test]
    fn vendor_space_names() {
        assert_eq!(OptionDefRegistry::space_to_vendor_id("vendor-4491"), Some(4491));
        assert_eq!(OptionDefRegistry::space_to_vendor_id("vendor-"), None);
        assert_eq!(OptionDefRegistry::space_to_vendor_id("dhcp4"), None);
        assert_eq!(OptionDefRegistry::space_to_vendor_id("vendor-x"), None);
    }

    #[test]
    fn standard_option_ranges() {
        assert!(OptionDefRegistry::is_standard_option(1));
        assert!(OptionDefRegistry::is_standard_option(53));
        assert!(OptionDefRegistry::is_standard_option(82));
        assert!(OptionDefRegistry::is_standard_option(125));
        for code in [84u8, 96, 102, 111, 115, 126, 127, 147, 149, 178, 207, 214, 219, 222, 254] {
            assert!(!OptionDefRegistry::is_standard_option(code), "{code}");
        }
    }

    #[test]
    fn unpack_typed_and_opaque_options() {
        let registry = OptionDefRegistry::with_std_defs();
        let mut options = OptionCollection::new();
        // lease time (51) = 3600, unknown option 222 with 2 bytes
        let stream = [51, 4, 0, 0, 0x0e, 0x10, 222, 2, 0xaa, 0xbb, 255];
        unpack_options(&stream, DHCP4_OPTION_SPACE, &registry, &mut options).unwrap();

        assert_eq!(options.get(51).unwrap().as_u32(), Some(3600));
        let opaque = options.get(222).unwrap();
        assert_eq!(opaque.value, OptionValue::Opaque(vec![0xaa, 0xbb]));
        assert_eq!(opaque.encapsulated_space.as_deref(), Some(DHCP4_OPTION_SPACE));
    }

    #[test]
    fn unpack_truncated_option_rejects_stream() {
        let registry = OptionDefRegistry::with_std_defs();
        let mut options = OptionCollection::new();
        let stream = [51, 4, 0, 0];
        assert!(matches!(
            unpack_options(&stream, DHCP4_OPTION_SPACE, &registry, &mut options),
            Err(DecodeError::TruncatedOption { code: 51, .. })
        ));
    }

    #[test]
    fn malformed_payload_skips_only_that_option() {
        let registry = OptionDefRegistry::with_std_defs();
        let mut options = OptionCollection::new();
        // ip-forwarding (19) with an out-of-range boolean, then lease time
        let stream = [19, 1, 7, 51, 4, 0, 0, 0, 60, 255];
        unpack_options(&stream, DHCP4_OPTION_SPACE, &registry, &mut options).unwrap();

        assert!(options.get(19).is_none());
        assert_eq!(options.get(51).unwrap().as_u32(), Some(60));
    }

    #[test]
    fn relay_agent_options_recurse() {
        let registry = OptionDefRegistry::with_std_defs();
        let mut options = OptionCollection::new();
        // RAI with circuit-id "AB" and link-selection 10.1.2.0
        let stream = [82, 10, 1, 2, 0x41, 0x42, 5, 4, 10, 1, 2, 0, 255];
        unpack_options(&stream, DHCP4_OPTION_SPACE, &registry, &mut options).unwrap();

        let rai = options.get(DHO_DHCP_AGENT_OPTIONS).unwrap();
        assert_eq!(
            rai.encapsulated_space.as_deref(),
            Some(DHCP_AGENT_OPTIONS_SPACE)
        );
        let link = rai.get_sub_option(RAI_OPTION_LINK_SELECTION).unwrap();
        assert_eq!(link.as_ipv4(), Some("10.1.2.0".parse().unwrap()));
    }

    #[test]
    fn vendor_options_recurse_into_vendor_space() {
        let mut registry = OptionDefRegistry::with_std_defs();
        registry
            .add(
                "vendor-4491",
                OptionDefinition::new("tftp-servers", 2, OptionDataType::Ipv4Address),
            )
            .unwrap();

        let mut options = OptionCollection::new();
        // VIVSO: enterprise 4491, block of one sub-option (2, len 4, addr)
        let stream = [
            125, 11, 0, 0, 0x11, 0x8b, 6, 2, 4, 192, 0, 2, 9, 255,
        ];
        unpack_options(&stream, DHCP4_OPTION_SPACE, &registry, &mut options).unwrap();

        let vivso = options.get(DHO_VIVSO_SUBOPTIONS).unwrap();
        match &vivso.value {
            OptionValue::Vendor(vendor) => {
                assert_eq!(vendor.enterprise_id, 4491);
                let tftp = vendor.sub_options.get(2).unwrap();
                assert_eq!(
                    tftp.value,
                    OptionValue::Scalar(ScalarValue::Ipv4("192.0.2.9".parse().unwrap()))
                );
            }
            other => panic!("expected vendor option, got {other:?}"),
        }
    }
}
