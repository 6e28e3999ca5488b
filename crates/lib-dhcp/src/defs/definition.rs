use netbuf::ReadBuffer;
use thiserror::Error;

use crate::defs::OptionDefRegistry;
use crate::types::option::code::{DHO_FQDN, DHO_VIVCO_SUBOPTIONS, DHO_VIVSO_SUBOPTIONS};
use crate::types::option::{
    ClientFqdn, DhcpOption, FqdnError, OptionCollection, OptionDataType, OptionValue,
    ScalarValue, ValueParseError, VendorClassOption, VendorOption,
};
use crate::types::DecodeError;

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Invalid option name '{0}'")]
    InvalidName(String),

    #[error("Invalid encapsulated option space name '{0}'")]
    InvalidSpaceName(String),

    #[error("Option code {0} is reserved")]
    ReservedCode(u8),

    #[error("Array of {0} is not a valid option definition")]
    InvalidArrayType(OptionDataType),

    #[error("A record needs at least 2 data fields, got {0}")]
    TooFewRecordFields(usize),

    #[error("{0} data field can only be the last field of a record")]
    VariableFieldNotLast(OptionDataType),

    #[error("Empty data type cannot be a record field")]
    EmptyRecordField,

    #[error("Record fields given for non-record option type {0}")]
    UnexpectedRecordFields(OptionDataType),

    #[error("Duplicate option definition for code {code} in space '{space}'")]
    Duplicate { space: String, code: u8 },

    #[error("Duplicate option definition name '{name}' in space '{space}'")]
    DuplicateName { space: String, name: String },
}

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error(transparent)]
    Value(#[from] ValueParseError),

    #[error(transparent)]
    Fqdn(#[from] FqdnError),

    #[error("Truncated {0} record field")]
    TruncatedRecord(OptionDataType),

    #[error("Truncated vendor option payload")]
    TruncatedVendor,

    #[error("Trailing bytes after {0} value")]
    TrailingData(OptionDataType),

    #[error(transparent)]
    SubOptions(#[from] DecodeError),
}

/// A typed option descriptor: everything the codec needs to turn raw
/// payload bytes into a typed option and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDefinition {
    name: String,
    code: u8,
    data_type: OptionDataType,
    array: bool,
    encapsulated_space: String,
    record_fields: Vec<OptionDataType>,
}

impl OptionDefinition {
    pub fn new(name: &str, code: u8, data_type: OptionDataType) -> Self {
        Self {
            name: name.to_string(),
            code,
            data_type,
            array: false,
            encapsulated_space: String::new(),
            record_fields: Vec::new(),
        }
    }

    pub fn new_array(name: &str, code: u8, data_type: OptionDataType) -> Self {
        Self {
            array: true,
            ..Self::new(name, code, data_type)
        }
    }

    pub fn with_space(name: &str, code: u8, data_type: OptionDataType, space: &str) -> Self {
        Self {
            encapsulated_space: space.to_string(),
            ..Self::new(name, code, data_type)
        }
    }

    pub fn record(name: &str, code: u8, fields: Vec<OptionDataType>) -> Self {
        Self {
            record_fields: fields,
            ..Self::new(name, code, OptionDataType::Record)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn data_type(&self) -> OptionDataType {
        self.data_type
    }

    pub fn is_array(&self) -> bool {
        self.array
    }

    pub fn encapsulated_space(&self) -> Option<&str> {
        if self.encapsulated_space.is_empty() {
            None
        } else {
            Some(&self.encapsulated_space)
        }
    }

    pub fn record_fields(&self) -> &[OptionDataType] {
        &self.record_fields
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        if !valid_name(&self.name) {
            return Err(DefinitionError::InvalidName(self.name.clone()));
        }
        if !self.encapsulated_space.is_empty() && !valid_name(&self.encapsulated_space) {
            return Err(DefinitionError::InvalidSpaceName(
                self.encapsulated_space.clone(),
            ));
        }
        if self.code == 0 || self.code == 255 {
            return Err(DefinitionError::ReservedCode(self.code));
        }

        if self.array {
            match self.data_type {
                OptionDataType::String | OptionDataType::Binary | OptionDataType::Empty => {
                    return Err(DefinitionError::InvalidArrayType(self.data_type));
                }
                _ => {}
            }
        }

        if self.data_type == OptionDataType::Record {
            if self.record_fields.len() < 2 {
                return Err(DefinitionError::TooFewRecordFields(self.record_fields.len()));
            }
            let last = self.record_fields.len() - 1;
            for (i, field) in self.record_fields.iter().enumerate() {
                match field {
                    OptionDataType::Empty | OptionDataType::Record => {
                        return Err(DefinitionError::EmptyRecordField);
                    }
                    OptionDataType::String | OptionDataType::Binary if i < last => {
                        return Err(DefinitionError::VariableFieldNotLast(*field));
                    }
                    _ => {}
                }
            }
        } else if !self.record_fields.is_empty() {
            return Err(DefinitionError::UnexpectedRecordFields(self.data_type));
        }

        Ok(())
    }

    /// Produce a typed option from raw payload bytes. The special-form
    /// options are handled by dedicated sub-parsers regardless of the
    /// definition's record shape.
    pub fn option_factory(
        &self,
        code: u8,
        payload: &[u8],
        registry: &OptionDefRegistry,
    ) -> Result<DhcpOption, FactoryError> {
        match code {
            DHO_FQDN => {
                let fqdn = ClientFqdn::parse(payload)?;
                return Ok(DhcpOption::new(code, OptionValue::Fqdn(fqdn)));
            }
            DHO_VIVSO_SUBOPTIONS => {
                let vendor = parse_vendor_option(payload, registry)?;
                return Ok(DhcpOption::new(code, OptionValue::Vendor(vendor)));
            }
            DHO_VIVCO_SUBOPTIONS => {
                let vendor_class = parse_vendor_class_option(payload)?;
                return Ok(DhcpOption::new(code, OptionValue::VendorClass(vendor_class)));
            }
            _ => {}
        }

        let mut buf = ReadBuffer::new(payload);
        let value = match self.data_type {
            OptionDataType::Empty => OptionValue::Empty,
            OptionDataType::Record => {
                let mut fields = Vec::with_capacity(self.record_fields.len());
                for field in &self.record_fields {
                    // A trailing string or binary field absorbs the rest of
                    // the payload, possibly zero bytes.
                    let value = ScalarValue::read(*field, &mut buf)
                        .map_err(|_| FactoryError::TruncatedRecord(*field))?;
                    fields.push(value);
                }
                OptionValue::Record(fields)
            }
            ty if self.array => {
                let mut values = Vec::new();
                loop {
                    if buf.is_empty() {
                        break;
                    }
                    if let Some(len) = ty.fixed_len() {
                        // Truncated trailing elements are silently dropped.
                        if buf.len() < len {
                            break;
                        }
                    }
                    match ScalarValue::read(ty, &mut buf) {
                        Ok(value) => values.push(value),
                        Err(_) => break,
                    }
                }
                OptionValue::Array(values)
            }
            ty => {
                let value = ScalarValue::read(ty, &mut buf)?;
                OptionValue::Scalar(value)
            }
        };

        let mut option = DhcpOption::new(code, value);
        if let Some(space) = self.encapsulated_space() {
            option.encapsulated_space = Some(space.to_string());
            // Whatever follows the fixed data is a nested option stream.
            if !buf.is_empty() {
                let rest = buf.read_slice(buf.len()).expect("remainder");
                let mut sub_options = OptionCollection::new();
                crate::defs::unpack_options(rest, space, registry, &mut sub_options)?;
                option.sub_options = sub_options;
            }
        }
        Ok(option)
    }

    /// Build an option from config-time text values (csv-format).
    pub fn option_from_values(
        &self,
        values: &[String],
        registry: &OptionDefRegistry,
    ) -> Result<DhcpOption, FactoryError> {
        let mut buf = Vec::new();
        if self.data_type == OptionDataType::Record {
            for (field, value) in self.record_fields.iter().zip(values.iter()) {
                let scalar = ScalarValue::from_text(*field, value)?;
                let mut out = netbuf::WriteBuffer::new();
                scalar.write(&mut out);
                buf.extend_from_slice(out.bytes());
            }
        } else if self.data_type == OptionDataType::Empty {
            // nothing to write
        } else {
            let values = if self.array { values } else { &values[..values.len().min(1)] };
            for value in values {
                let scalar = ScalarValue::from_text(self.data_type, value)?;
                let mut out = netbuf::WriteBuffer::new();
                scalar.write(&mut out);
                buf.extend_from_slice(out.bytes());
            }
        }
        self.option_factory(self.code, &buf, registry)
    }
}

fn valid_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return false;
    }
    let first = name.chars().next().expect("non-empty");
    let last = name.chars().next_back().expect("non-empty");
    !matches!(first, '-' | '_') && !matches!(last, '-' | '_')
}

/// Vendor-specific option 125: enterprise id, then a length-prefixed block
/// of sub-options parsed in the matching `vendor-<id>` space.
pub fn parse_vendor_option(
    payload: &[u8],
    registry: &OptionDefRegistry,
) -> Result<VendorOption, FactoryError> {
    if payload.len() < 4 {
        return Err(FactoryError::TruncatedVendor);
    }
    let enterprise_id = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let rest = &payload[4..];

    let mut sub_options = OptionCollection::new();
    if !rest.is_empty() {
        let data_len = rest[0] as usize;
        if 1 + data_len > rest.len() {
            return Err(FactoryError::TruncatedVendor);
        }
        let space = format!("vendor-{enterprise_id}");
        crate::defs::unpack_options(&rest[1..1 + data_len], &space, registry, &mut sub_options)?;
    }

    Ok(VendorOption {
        enterprise_id,
        sub_options,
    })
}

fn parse_vendor_class_option(payload: &[u8]) -> Result<VendorClassOption, FactoryError> {
    if payload.len() < 4 {
        return Err(FactoryError::TruncatedVendor);
    }
    Ok(VendorClassOption {
        enterprise_id: u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]),
        data: payload[4..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_charset_is_enforced() {
        assert!(OptionDefinition::new("foo-bar_2", 200, OptionDataType::Uint8)
            .validate()
            .is_ok());
        for bad in ["", "-foo", "foo-", "_foo", "foo_", "foo.bar", "foo bar"] {
            assert!(
                OptionDefinition::new(bad, 200, OptionDataType::Uint8)
                    .validate()
                    .is_err(),
                "{bad:?} should be invalid"
            );
        }
    }

    #[test]
    fn array_of_variable_size_types_is_invalid() {
        for ty in [
            OptionDataType::String,
            OptionDataType::Binary,
            OptionDataType::Empty,
        ] {
            assert!(matches!(
                OptionDefinition::new_array("foo", 200, ty).validate(),
                Err(DefinitionError::InvalidArrayType(_))
            ));
        }
        assert!(OptionDefinition::new_array("foo", 200, OptionDataType::Uint16)
            .validate()
            .is_ok());
    }

    #[test]
    fn record_shape_rules() {
        assert!(matches!(
            OptionDefinition::record("foo", 200, vec![OptionDataType::Uint8]).validate(),
            Err(DefinitionError::TooFewRecordFields(1))
        ));
        assert!(matches!(
            OptionDefinition::record(
                "foo",
                200,
                vec![OptionDataType::String, OptionDataType::Uint8]
            )
            .validate(),
            Err(DefinitionError::VariableFieldNotLast(_))
        ));
        assert!(matches!(
            OptionDefinition::record(
                "foo",
                200,
                vec![OptionDataType::Uint8, OptionDataType::Empty]
            )
            .validate(),
            Err(DefinitionError::EmptyRecordField)
        ));
        assert!(OptionDefinition::record(
            "foo",
            200,
            vec![OptionDataType::Uint16, OptionDataType::String]
        )
        .validate()
        .is_ok());
    }

    #[test]
    fn reserved_codes_are_rejected() {
        assert!(OptionDefinition::new("foo", 0, OptionDataType::Uint8)
            .validate()
            .is_err());
        assert!(OptionDefinition::new("foo", 255, OptionDataType::Uint8)
            .validate()
            .is_err());
    }
}
