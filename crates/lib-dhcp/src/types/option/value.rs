use std::net::Ipv4Addr;

use netbuf::{ReadBuffer, Readable, WriteBuffer};
use thiserror::Error;

use crate::types::option::{
    ClientFqdn, FqdnError, FqdnName, OptionDataType, VendorClassOption, VendorOption,
};

#[derive(Debug, Error)]
pub enum ValueParseError {
    #[error("Truncated {0} value")]
    Truncated(OptionDataType),

    #[error("Invalid boolean value: {0}")]
    BadBoolean(u8),

    #[error("Invalid domain name: {0}")]
    BadDomainName(#[from] FqdnError),

    #[error("{0} cannot be read as a scalar value")]
    NotAScalar(OptionDataType),

    #[error("Unable to convert '{text}' to {ty}")]
    BadText { ty: OptionDataType, text: String },
}

/// A single typed value carried in an option payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarValue {
    Binary(Vec<u8>),
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Ipv4(Ipv4Addr),
    Str(String),
    Fqdn(FqdnName),
}

impl ScalarValue {
    /// Read one value of the given type. `binary` and `string` absorb the
    /// rest of the buffer; the fixed-size types fail on short input.
    pub fn read(ty: OptionDataType, buf: &mut ReadBuffer<'_>) -> Result<Self, ValueParseError> {
        let truncated = |_| ValueParseError::Truncated(ty);
        match ty {
            OptionDataType::Binary => Ok(Self::Binary(buf.read_vec(buf.len()).map_err(truncated)?)),
            OptionDataType::Boolean => match buf.pop().map_err(truncated)? {
                0 => Ok(Self::Bool(false)),
                1 => Ok(Self::Bool(true)),
                other => Err(ValueParseError::BadBoolean(other)),
            },
            OptionDataType::Int8 => Ok(Self::Int8(buf.pop().map_err(truncated)? as i8)),
            OptionDataType::Int16 => Ok(Self::Int16(buf.read_u16().map_err(truncated)? as i16)),
            OptionDataType::Int32 => Ok(Self::Int32(buf.read_u32().map_err(truncated)? as i32)),
            OptionDataType::Uint8 => Ok(Self::Uint8(buf.pop().map_err(truncated)?)),
            OptionDataType::Uint16 => Ok(Self::Uint16(buf.read_u16().map_err(truncated)?)),
            OptionDataType::Uint32 => Ok(Self::Uint32(buf.read_u32().map_err(truncated)?)),
            OptionDataType::Ipv4Address => {
                Ok(Self::Ipv4(Ipv4Addr::read(buf).map_err(truncated)?))
            }
            OptionDataType::String => {
                let bytes = buf.read_vec(buf.len()).map_err(truncated)?;
                // Non-UTF-8 payloads keep their exact bytes so packing
                // reproduces the wire form.
                match String::from_utf8(bytes) {
                    Ok(text) => Ok(Self::Str(text)),
                    Err(err) => Ok(Self::Binary(err.into_bytes())),
                }
            }
            OptionDataType::Fqdn => Ok(Self::Fqdn(FqdnName::read(buf)?)),
            OptionDataType::Empty | OptionDataType::Record => Err(ValueParseError::NotAScalar(ty)),
        }
    }

    pub fn write(&self, buf: &mut WriteBuffer) {
        match self {
            Self::Binary(b) => buf.write_slice(b),
            Self::Bool(v) => buf.push(u8::from(*v)),
            Self::Int8(v) => buf.push(*v as u8),
            Self::Int16(v) => buf.write_u16(*v as u16),
            Self::Int32(v) => buf.write_u32(*v as u32),
            Self::Uint8(v) => buf.push(*v),
            Self::Uint16(v) => buf.write_u16(*v),
            Self::Uint32(v) => buf.write_u32(*v),
            Self::Ipv4(v) => buf.write_slice(&v.octets()),
            Self::Str(v) => buf.write_slice(v.as_bytes()),
            Self::Fqdn(v) => v.write(buf),
        }
    }

    /// Parse one value of the given type from its csv-format text form.
    pub fn from_text(ty: OptionDataType, text: &str) -> Result<Self, ValueParseError> {
        let text = text.trim();
        let bad = || ValueParseError::BadText {
            ty,
            text: text.to_string(),
        };
        match ty {
            OptionDataType::Binary => decode_hex(text).map(Self::Binary).ok_or_else(bad),
            OptionDataType::Boolean => match text {
                _ if text.eq_ignore_ascii_case("true") || text == "1" => Ok(Self::Bool(true)),
                _ if text.eq_ignore_ascii_case("false") || text == "0" => Ok(Self::Bool(false)),
                _ => Err(bad()),
            },
            OptionDataType::Int8 => text.parse().map(Self::Int8).map_err(|_| bad()),
            OptionDataType::Int16 => text.parse().map(Self::Int16).map_err(|_| bad()),
            OptionDataType::Int32 => text.parse().map(Self::Int32).map_err(|_| bad()),
            OptionDataType::Uint8 => text.parse().map(Self::Uint8).map_err(|_| bad()),
            OptionDataType::Uint16 => text.parse().map(Self::Uint16).map_err(|_| bad()),
            OptionDataType::Uint32 => text.parse().map(Self::Uint32).map_err(|_| bad()),
            OptionDataType::Ipv4Address => text.parse().map(Self::Ipv4).map_err(|_| bad()),
            OptionDataType::String => Ok(Self::Str(text.to_string())),
            OptionDataType::Fqdn => FqdnName::from_text(text).map(Self::Fqdn).map_err(|_| bad()),
            OptionDataType::Empty | OptionDataType::Record => Err(ValueParseError::NotAScalar(ty)),
        }
    }

    pub fn data_type(&self) -> OptionDataType {
        match self {
            Self::Binary(_) => OptionDataType::Binary,
            Self::Bool(_) => OptionDataType::Boolean,
            Self::Int8(_) => OptionDataType::Int8,
            Self::Int16(_) => OptionDataType::Int16,
            Self::Int32(_) => OptionDataType::Int32,
            Self::Uint8(_) => OptionDataType::Uint8,
            Self::Uint16(_) => OptionDataType::Uint16,
            Self::Uint32(_) => OptionDataType::Uint32,
            Self::Ipv4(_) => OptionDataType::Ipv4Address,
            Self::Str(_) => OptionDataType::String,
            Self::Fqdn(_) => OptionDataType::Fqdn,
        }
    }
}

/// The payload of an option, dispatched on at pack and to-text time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Empty,
    Scalar(ScalarValue),
    Array(Vec<ScalarValue>),
    Record(Vec<ScalarValue>),
    Opaque(Vec<u8>),
    Fqdn(ClientFqdn),
    Vendor(VendorOption),
    VendorClass(VendorClassOption),
}

impl OptionValue {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = WriteBuffer::new();
        match self {
            Self::Empty => {}
            Self::Scalar(v) => v.write(&mut buf),
            Self::Array(vs) | Self::Record(vs) => {
                for v in vs {
                    v.write(&mut buf);
                }
            }
            Self::Opaque(b) => buf.write_slice(b),
            Self::Fqdn(f) => buf.write_slice(&f.to_bytes()),
            Self::Vendor(v) => buf.write_slice(&v.to_bytes()),
            Self::VendorClass(v) => buf.write_slice(&v.to_bytes()),
        }
        buf.into_bytes()
    }
}

pub(crate) fn decode_hex(text: &str) -> Option<Vec<u8>> {
    let text = text.strip_prefix("0x").unwrap_or(text);
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_uint32() {
        let d = [0x00, 0x00, 0x0e, 0x10];
        let mut buf = ReadBuffer::new(&d);
        assert_eq!(
            ScalarValue::read(OptionDataType::Uint32, &mut buf).unwrap(),
            ScalarValue::Uint32(3600)
        );
    }

    #[test]
    fn bad_boolean_is_a_cast_failure() {
        let d = [2];
        let mut buf = ReadBuffer::new(&d);
        assert!(matches!(
            ScalarValue::read(OptionDataType::Boolean, &mut buf),
            Err(ValueParseError::BadBoolean(2))
        ));
    }

    #[test]
    fn string_absorbs_rest() {
        let d = b"hostname";
        let mut buf = ReadBuffer::new(d);
        assert_eq!(
            ScalarValue::read(OptionDataType::String, &mut buf).unwrap(),
            ScalarValue::Str("hostname".into())
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn text_values() {
        assert_eq!(
            ScalarValue::from_text(OptionDataType::Ipv4Address, "192.0.2.254").unwrap(),
            ScalarValue::Ipv4("192.0.2.254".parse().unwrap())
        );
        assert_eq!(
            ScalarValue::from_text(OptionDataType::Boolean, "true").unwrap(),
            ScalarValue::Bool(true)
        );
        assert!(ScalarValue::from_text(OptionDataType::Uint8, "300").is_err());
    }

    #[test]
    fn hex_decoding() {
        assert_eq!(decode_hex("0a0b0c"), Some(vec![10, 11, 12]));
        assert_eq!(decode_hex("0x0a0b"), Some(vec![10, 11]));
        assert_eq!(decode_hex("abc"), None);
        assert_eq!(decode_hex("zz"), None);
    }
}
