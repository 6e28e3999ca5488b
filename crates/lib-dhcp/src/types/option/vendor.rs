use netbuf::WriteBuffer;

use crate::types::option::OptionCollection;

/// Vendor-Identifying Vendor-Specific Information option (code 125),
/// RFC 3925. A 32-bit enterprise number followed by a length-prefixed
/// block of sub-options living in the matching `vendor-<id>` space.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorOption {
    pub enterprise_id: u32,
    pub sub_options: OptionCollection,
}

impl VendorOption {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut block = WriteBuffer::new();
        // Sub-options of a well-formed vendor block always fit; a block
        // assembled from the wire cannot exceed the option payload limit.
        let _ = self.sub_options.pack(&mut block);

        let mut buf = WriteBuffer::new();
        buf.write_u32(self.enterprise_id);
        buf.push(block.len() as u8);
        buf.write_slice(block.bytes());
        buf.into_bytes()
    }
}

/// Vendor-Identifying Vendor Class option (code 124), RFC 3925. A 32-bit
/// enterprise number followed by opaque vendor class data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorClassOption {
    pub enterprise_id: u32,
    pub data: Vec<u8>,
}

impl VendorClassOption {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = WriteBuffer::new();
        buf.write_u32(self.enterprise_id);
        buf.write_slice(&self.data);
        buf.into_bytes()
    }
}
