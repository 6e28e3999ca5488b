use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use netbuf::WriteBuffer;
use thiserror::Error;

pub mod code;

mod data_type;
mod fqdn;
mod value;
mod vendor;

pub use data_type::*;
pub use fqdn::*;
pub use value::*;
pub use vendor::*;

use crate::MAX_OPTION_PAYLOAD_LEN;
use code::DHO_DHCP_AGENT_OPTIONS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Option {code} payload is {len} bytes, at most 255 are supported")]
    OptionTooLong { code: u8, len: usize },
}

/// A single DHCPv4 option: a code, a typed payload, and an ordered set of
/// sub-options for the encapsulating option codes. Codes 0 (PAD) and 255
/// (END) are wire artifacts and never appear as [`DhcpOption`] values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhcpOption {
    pub code: u8,
    pub value: OptionValue,
    pub sub_options: OptionCollection,
    /// Name of the option space sub-options of this option live in.
    pub encapsulated_space: Option<String>,
}

impl DhcpOption {
    pub fn new(code: u8, value: OptionValue) -> Self {
        Self {
            code,
            value,
            sub_options: OptionCollection::new(),
            encapsulated_space: None,
        }
    }

    pub fn uint8(code: u8, value: u8) -> Self {
        Self::new(code, OptionValue::Scalar(ScalarValue::Uint8(value)))
    }

    pub fn uint32(code: u8, value: u32) -> Self {
        Self::new(code, OptionValue::Scalar(ScalarValue::Uint32(value)))
    }

    pub fn ipv4(code: u8, addr: Ipv4Addr) -> Self {
        Self::new(code, OptionValue::Scalar(ScalarValue::Ipv4(addr)))
    }

    pub fn addr_list(code: u8, addrs: Vec<Ipv4Addr>) -> Self {
        Self::new(
            code,
            OptionValue::Array(addrs.into_iter().map(ScalarValue::Ipv4).collect()),
        )
    }

    pub fn string(code: u8, value: impl Into<String>) -> Self {
        Self::new(code, OptionValue::Scalar(ScalarValue::Str(value.into())))
    }

    pub fn binary(code: u8, value: Vec<u8>) -> Self {
        Self::new(code, OptionValue::Scalar(ScalarValue::Binary(value)))
    }

    /// The serialized payload: own data followed by packed sub-options.
    pub fn encode_payload(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = WriteBuffer::new();
        buf.write_slice(&self.value.to_bytes());
        self.sub_options.pack(&mut buf)?;
        Ok(buf.into_bytes())
    }

    /// Serialize header and payload into `buf`. A payload longer than 255
    /// bytes is a fatal encoding error.
    pub fn pack(&self, buf: &mut WriteBuffer) -> Result<(), EncodeError> {
        let payload = self.encode_payload()?;
        if payload.len() > MAX_OPTION_PAYLOAD_LEN {
            return Err(EncodeError::OptionTooLong {
                code: self.code,
                len: payload.len(),
            });
        }

        buf.push(self.code);
        buf.push(payload.len() as u8);
        buf.write_slice(&payload);
        Ok(())
    }

    pub fn get_sub_option(&self, code: u8) -> Option<&DhcpOption> {
        self.sub_options.get(code)
    }

    /// The option's own data bytes, without sub-options.
    pub fn data_bytes(&self) -> Vec<u8> {
        self.value.to_bytes()
    }

    pub fn as_u8(&self) -> Option<u8> {
        match &self.value {
            OptionValue::Scalar(ScalarValue::Uint8(v)) => Some(*v),
            OptionValue::Opaque(b) => b.first().copied(),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match &self.value {
            OptionValue::Scalar(ScalarValue::Uint32(v)) => Some(*v),
            OptionValue::Opaque(b) if b.len() >= 4 => {
                Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
            _ => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match &self.value {
            OptionValue::Scalar(ScalarValue::Ipv4(v)) => Some(*v),
            OptionValue::Opaque(b) if b.len() == 4 => Some(Ipv4Addr::new(b[0], b[1], b[2], b[3])),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<String> {
        match &self.value {
            OptionValue::Scalar(ScalarValue::Str(v)) => Some(v.clone()),
            OptionValue::Opaque(b) => Some(String::from_utf8_lossy(b).into_owned()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match &self.value {
            OptionValue::Scalar(ScalarValue::Binary(b)) => Some(b.clone()),
            OptionValue::Opaque(b) => Some(b.clone()),
            _ => None,
        }
    }

    /// The value as the class matcher sees it: typed options render their
    /// text form (addresses dotted, integers decimal), opaque payloads
    /// stay raw bytes.
    pub fn text_value(&self) -> Vec<u8> {
        fn scalar_text(value: &ScalarValue) -> Vec<u8> {
            match value {
                ScalarValue::Binary(b) => b.clone(),
                ScalarValue::Bool(v) => if *v { b"true".to_vec() } else { b"false".to_vec() },
                ScalarValue::Int8(v) => v.to_string().into_bytes(),
                ScalarValue::Int16(v) => v.to_string().into_bytes(),
                ScalarValue::Int32(v) => v.to_string().into_bytes(),
                ScalarValue::Uint8(v) => v.to_string().into_bytes(),
                ScalarValue::Uint16(v) => v.to_string().into_bytes(),
                ScalarValue::Uint32(v) => v.to_string().into_bytes(),
                ScalarValue::Ipv4(v) => v.to_string().into_bytes(),
                ScalarValue::Str(v) => v.clone().into_bytes(),
                ScalarValue::Fqdn(v) => v.to_text().into_bytes(),
            }
        }

        match &self.value {
            OptionValue::Empty => Vec::new(),
            OptionValue::Scalar(v) => scalar_text(v),
            OptionValue::Array(vs) | OptionValue::Record(vs) => {
                vs.iter().map(|v| scalar_text(v)).collect::<Vec<_>>().join(&b","[..])
            }
            OptionValue::Opaque(b) => b.clone(),
            OptionValue::Fqdn(f) => f.domain.to_text().into_bytes(),
            OptionValue::Vendor(v) => v.to_bytes(),
            OptionValue::VendorClass(v) => v.to_bytes(),
        }
    }

    /// Codes the client asked for through the parameter request list.
    pub fn requested_codes(&self) -> Vec<u8> {
        match &self.value {
            OptionValue::Array(vs) => vs
                .iter()
                .filter_map(|v| match v {
                    ScalarValue::Uint8(c) => Some(*c),
                    _ => None,
                })
                .collect(),
            OptionValue::Opaque(b) => b.clone(),
            _ => Vec::new(),
        }
    }
}

/// An ordered multimap of option code to option instances. Iteration walks
/// codes in ascending order, instances of the same code in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionCollection {
    options: BTreeMap<u8, Vec<DhcpOption>>,
}

impl OptionCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn len(&self) -> usize {
        self.options.values().map(Vec::len).sum()
    }

    pub fn contains(&self, code: u8) -> bool {
        self.options.contains_key(&code)
    }

    /// The first instance of the given code, if any.
    pub fn get(&self, code: u8) -> Option<&DhcpOption> {
        self.options.get(&code).and_then(|v| v.first())
    }

    pub fn get_all(&self, code: u8) -> impl Iterator<Item = &DhcpOption> {
        self.options.get(&code).into_iter().flatten()
    }

    pub fn insert(&mut self, option: DhcpOption) {
        self.options.entry(option.code).or_default().push(option);
    }

    pub fn remove(&mut self, code: u8) -> bool {
        self.options.remove(&code).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DhcpOption> {
        self.options.values().flatten()
    }

    /// Serialize all options in ascending code order. Relay Agent
    /// Information (82) is deferred past every other option; the END
    /// terminator is the caller's concern since it never exists as an
    /// option instance.
    pub fn pack(&self, buf: &mut WriteBuffer) -> Result<(), EncodeError> {
        let mut agent = Vec::new();
        for option in self.iter() {
            if option.code == DHO_DHCP_AGENT_OPTIONS {
                agent.push(option);
            } else {
                option.pack(buf)?;
            }
        }

        for option in agent {
            option.pack(buf)?;
        }
        Ok(())
    }
}

impl FromIterator<DhcpOption> for OptionCollection {
    fn from_iter<T: IntoIterator<Item = DhcpOption>>(iter: T) -> Self {
        let mut collection = Self::new();
        for option in iter {
            collection.insert(option);
        }
        collection
    }
}
