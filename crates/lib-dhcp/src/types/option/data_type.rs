use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("Unknown option data type: {0}")]
pub struct UnknownDataType(pub String);

/// Scalar data types an option definition can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionDataType {
    Empty,
    Binary,
    Boolean,
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Ipv4Address,
    String,
    Fqdn,
    Record,
}

impl OptionDataType {
    pub fn from_name(name: &str) -> Result<Self, UnknownDataType> {
        match name {
            "empty" => Ok(Self::Empty),
            "binary" => Ok(Self::Binary),
            "boolean" => Ok(Self::Boolean),
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            "int32" => Ok(Self::Int32),
            "uint8" => Ok(Self::Uint8),
            "uint16" => Ok(Self::Uint16),
            "uint32" => Ok(Self::Uint32),
            "ipv4-address" => Ok(Self::Ipv4Address),
            "string" => Ok(Self::String),
            "fqdn" => Ok(Self::Fqdn),
            "record" => Ok(Self::Record),
            other => Err(UnknownDataType(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Binary => "binary",
            Self::Boolean => "boolean",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Ipv4Address => "ipv4-address",
            Self::String => "string",
            Self::Fqdn => "fqdn",
            Self::Record => "record",
        }
    }

    /// Wire length of a value of this type, for the fixed-size types.
    pub fn fixed_len(&self) -> Option<usize> {
        match self {
            Self::Empty => Some(0),
            Self::Boolean | Self::Int8 | Self::Uint8 => Some(1),
            Self::Int16 | Self::Uint16 => Some(2),
            Self::Int32 | Self::Uint32 | Self::Ipv4Address => Some(4),
            _ => None,
        }
    }
}

impl Display for OptionDataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trip() {
        for name in [
            "empty",
            "binary",
            "boolean",
            "int8",
            "int16",
            "int32",
            "uint8",
            "uint16",
            "uint32",
            "ipv4-address",
            "string",
            "fqdn",
            "record",
        ] {
            let ty = OptionDataType::from_name(name).unwrap();
            assert_eq!(ty.name(), name);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!(OptionDataType::from_name("uint64").is_err());
    }
}
