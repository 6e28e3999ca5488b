use std::fmt::Display;

use netbuf::{ReadBuffer, WriteBuffer};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FqdnError {
    #[error("Domain name label exceeds 63 bytes")]
    LabelTooLong,

    #[error("Domain name exceeds 255 bytes on the wire")]
    NameTooLong,

    #[error("Empty label in domain name")]
    EmptyLabel,

    #[error("Truncated domain name label")]
    TruncatedLabel,

    #[error("Trailing data after the root label")]
    TrailingData,

    #[error("Truncated client FQDN option")]
    TruncatedOption,
}

/// A DNS name in RFC 1035 wire form: length-prefixed labels, terminated by
/// the zero-length root label. Partial names omit the terminating label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FqdnName {
    labels: Vec<String>,
    fully_qualified: bool,
}

impl FqdnName {
    pub fn root() -> Self {
        Self {
            labels: Vec::new(),
            fully_qualified: true,
        }
    }

    pub fn is_fully_qualified(&self) -> bool {
        self.fully_qualified
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Parse a name from its text form. A trailing dot marks the name as
    /// fully qualified.
    pub fn from_text(text: &str) -> Result<Self, FqdnError> {
        if text.is_empty() {
            return Ok(Self {
                labels: Vec::new(),
                fully_qualified: false,
            });
        }
        if text == "." {
            return Ok(Self::root());
        }

        let (body, fully_qualified) = match text.strip_suffix('.') {
            Some(body) => (body, true),
            None => (text, false),
        };

        let mut labels = Vec::new();
        for label in body.split('.') {
            if label.is_empty() {
                return Err(FqdnError::EmptyLabel);
            }
            if label.len() > 63 {
                return Err(FqdnError::LabelTooLong);
            }
            labels.push(label.to_string());
        }

        let name = Self {
            labels,
            fully_qualified,
        };
        if name.wire_len() > 255 {
            return Err(FqdnError::NameTooLong);
        }
        Ok(name)
    }

    /// Read a name in canonical wire form. The name is fully qualified when
    /// a root label is found; running off the end of the buffer yields a
    /// partial name.
    pub fn read(buf: &mut ReadBuffer<'_>) -> Result<Self, FqdnError> {
        let mut labels = Vec::new();
        let mut fully_qualified = false;

        while let Some(len) = buf.peek() {
            buf.skip().map_err(|_| FqdnError::TruncatedLabel)?;
            if len == 0 {
                fully_qualified = true;
                break;
            }
            if len > 63 {
                return Err(FqdnError::LabelTooLong);
            }
            let label = buf
                .read_slice(len as usize)
                .map_err(|_| FqdnError::TruncatedLabel)?;
            labels.push(String::from_utf8_lossy(label).into_owned());
        }

        let name = Self {
            labels,
            fully_qualified,
        };
        if name.wire_len() > 255 {
            return Err(FqdnError::NameTooLong);
        }
        Ok(name)
    }

    pub fn write(&self, buf: &mut WriteBuffer) {
        for label in &self.labels {
            buf.push(label.len() as u8);
            buf.write_slice(label.as_bytes());
        }
        if self.fully_qualified {
            buf.push(0);
        }
    }

    pub fn wire_len(&self) -> usize {
        let labels: usize = self.labels.iter().map(|l| l.len() + 1).sum();
        labels + usize::from(self.fully_qualified)
    }

    pub fn to_text(&self) -> String {
        let mut out = self.labels.join(".");
        if self.fully_qualified {
            out.push('.');
        }
        out
    }
}

impl Display for FqdnName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

/// Client FQDN option (code 81), RFC 4702.
///
/// Three fixed bytes (flags, rcode1, rcode2) followed by the domain name.
/// With flag E set the name uses the RFC 1035 canonical form, otherwise it
/// is plain ASCII where a trailing dot marks a fully qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFqdn {
    pub flags: u8,
    pub rcode1: u8,
    pub rcode2: u8,
    pub domain: FqdnName,
}

impl ClientFqdn {
    pub const FLAG_S: u8 = 0x01;
    pub const FLAG_O: u8 = 0x02;
    pub const FLAG_E: u8 = 0x04;
    pub const FLAG_N: u8 = 0x08;
    pub const FLAG_MASK: u8 = 0x0F;

    pub fn parse(payload: &[u8]) -> Result<Self, FqdnError> {
        if payload.len() < 3 {
            return Err(FqdnError::TruncatedOption);
        }

        let flags = payload[0];
        let rcode1 = payload[1];
        let rcode2 = payload[2];
        let rest = &payload[3..];

        let domain = if flags & Self::FLAG_E != 0 {
            let mut buf = ReadBuffer::new(rest);
            let name = FqdnName::read(&mut buf)?;
            if !buf.is_empty() {
                return Err(FqdnError::TrailingData);
            }
            name
        } else {
            FqdnName::from_text(&String::from_utf8_lossy(rest))?
        };

        Ok(Self {
            flags,
            rcode1,
            rcode2,
            domain,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = WriteBuffer::new();
        buf.push(self.flags);
        buf.push(self.rcode1);
        buf.push(self.rcode2);
        if self.flags & Self::FLAG_E != 0 {
            self.domain.write(&mut buf);
        } else {
            buf.write_slice(self.domain.to_text().as_bytes());
        }
        buf.into_bytes()
    }

    pub fn flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_round_trip() {
        let full = FqdnName::from_text("host.example.org.").unwrap();
        assert!(full.is_fully_qualified());
        assert_eq!(full.to_text(), "host.example.org.");

        let partial = FqdnName::from_text("host").unwrap();
        assert!(!partial.is_fully_qualified());
        assert_eq!(partial.to_text(), "host");
    }

    #[test]
    fn empty_inner_label_is_rejected() {
        assert_eq!(
            FqdnName::from_text("host..org"),
            Err(FqdnError::EmptyLabel)
        );
    }

    #[test]
    fn wire_round_trip_full() {
        let name = FqdnName::from_text("host.example.org.").unwrap();
        let mut out = WriteBuffer::new();
        name.write(&mut out);
        assert_eq!(
            out.bytes(),
            b"\x04host\x07example\x03org\x00".as_slice()
        );

        let mut buf = ReadBuffer::new(out.bytes());
        let parsed = FqdnName::read(&mut buf).unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn wire_partial_has_no_root_label() {
        let name = FqdnName::from_text("host.example").unwrap();
        let mut out = WriteBuffer::new();
        name.write(&mut out);
        assert_eq!(out.bytes(), b"\x04host\x07example".as_slice());

        let mut buf = ReadBuffer::new(out.bytes());
        let parsed = FqdnName::read(&mut buf).unwrap();
        assert!(!parsed.is_fully_qualified());
    }

    #[test]
    fn oversized_label_is_rejected() {
        let label = "a".repeat(64);
        assert_eq!(
            FqdnName::from_text(&label),
            Err(FqdnError::LabelTooLong)
        );
    }

    #[test]
    fn client_fqdn_canonical_form() {
        // E flag set, canonical name
        let mut payload = vec![ClientFqdn::FLAG_E, 0, 0];
        payload.extend_from_slice(b"\x06client\x07example\x03com\x00");

        let opt = ClientFqdn::parse(&payload).unwrap();
        assert!(opt.flag(ClientFqdn::FLAG_E));
        assert_eq!(opt.domain.to_text(), "client.example.com.");
        assert_eq!(opt.to_bytes(), payload);
    }

    #[test]
    fn client_fqdn_ascii_form() {
        let mut payload = vec![0u8, 255, 255];
        payload.extend_from_slice(b"client.example.com");

        let opt = ClientFqdn::parse(&payload).unwrap();
        assert!(!opt.domain.is_fully_qualified());

        let mut full = vec![0u8, 0, 0];
        full.extend_from_slice(b"client.example.com.");
        assert!(ClientFqdn::parse(&full)
            .unwrap()
            .domain
            .is_fully_qualified());
    }

    #[test]
    fn client_fqdn_too_short() {
        assert_eq!(
            ClientFqdn::parse(&[0, 0]),
            Err(FqdnError::TruncatedOption)
        );
    }
}
