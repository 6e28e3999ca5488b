use std::fmt::Display;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use network_interface::{NetworkInterface, NetworkInterfaceConfig};
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::{DUID_TIME_EPOCH, HTYPE_ETHER};

/// Enterprise number used for generated DUID-EN identities.
const ENTERPRISE_ID_ISC: u32 = 2495;
const DUID_EN_IDENTIFIER_LEN: usize = 6;

#[derive(Debug, Error)]
pub enum DuidError {
    #[error("A DUID must have at least {min} bytes, got {got}", min = Duid::MIN_LEN)]
    TooShort { got: usize },

    #[error("Invalid DUID text form: '{0}'")]
    BadText(String),

    #[error("No usable interface for generating a DUID-LLT")]
    NoInterface,

    #[error("io error on DUID file: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuidType {
    /// Link-layer address plus time, type 1.
    Llt,
    /// Enterprise number plus identifier, type 2.
    En,
    /// Link-layer address, type 3.
    Ll,
    Unknown(u16),
}

/// The server identity: an opaque byte string, persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duid {
    bytes: Vec<u8>,
}

impl Duid {
    pub const MIN_LEN: usize = 3;

    pub fn new(bytes: Vec<u8>) -> Result<Self, DuidError> {
        if bytes.len() < Self::MIN_LEN {
            return Err(DuidError::TooShort { got: bytes.len() });
        }
        Ok(Self { bytes })
    }

    pub fn duid_type(&self) -> DuidType {
        match u16::from_be_bytes([self.bytes[0], self.bytes[1]]) {
            1 => DuidType::Llt,
            2 => DuidType::En,
            3 => DuidType::Ll,
            other => DuidType::Unknown(other),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex-with-colons representation, e.g. `00:01:00:01:28:..`.
    pub fn to_text(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    pub fn from_text(text: &str) -> Result<Self, DuidError> {
        let text = text.trim();
        let bad = || DuidError::BadText(text.to_string());

        let mut bytes = Vec::new();
        for part in text.split(':') {
            if part.len() != 2 {
                return Err(bad());
            }
            bytes.push(u8::from_str_radix(part, 16).map_err(|_| bad())?);
        }
        Self::new(bytes)
    }
}

impl Display for Duid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

/// Creates the server DUID and keeps it in sync with its storage file.
///
/// On startup the file is read back; if it is absent or malformed a
/// DUID-LLT is generated from the first usable interface, falling back to
/// DUID-EN with a random identifier when no interface qualifies. The file
/// is written atomically (write to a temporary, then rename).
pub struct DuidFactory {
    storage_path: PathBuf,
    duid: Option<Duid>,
}

impl DuidFactory {
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            duid: None,
        }
    }

    pub fn get(&mut self) -> Result<Duid, DuidError> {
        if let Some(duid) = &self.duid {
            return Ok(duid.clone());
        }

        if let Some(duid) = self.read_from_file() {
            debug!(duid = %duid, "loaded server DUID");
            self.duid = Some(duid.clone());
            return Ok(duid);
        }

        match self.create_llt() {
            Ok(duid) => Ok(duid),
            Err(_) => self.create_en(),
        }
    }

    fn read_from_file(&self) -> Option<Duid> {
        let contents = fs::read_to_string(&self.storage_path).ok()?;
        Duid::from_text(&contents).ok()
    }

    fn create_llt(&mut self) -> Result<Duid, DuidError> {
        let (htype, identifier) = link_layer_id()?;
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs().saturating_sub(DUID_TIME_EPOCH))
            .unwrap_or(0) as u32;

        let mut bytes = Vec::with_capacity(8 + identifier.len());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&htype.to_be_bytes());
        bytes.extend_from_slice(&elapsed.to_be_bytes());
        bytes.extend_from_slice(&identifier);
        self.set(bytes)
    }

    fn create_en(&mut self) -> Result<Duid, DuidError> {
        let mut bytes = Vec::with_capacity(6 + DUID_EN_IDENTIFIER_LEN);
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&ENTERPRISE_ID_ISC.to_be_bytes());

        let mut rng = rand::thread_rng();
        for _ in 0..DUID_EN_IDENTIFIER_LEN {
            bytes.push(rng.gen());
        }
        self.set(bytes)
    }

    fn set(&mut self, bytes: Vec<u8>) -> Result<Duid, DuidError> {
        let duid = Duid::new(bytes)?;

        let file_name = self
            .storage_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "duid".to_string());
        let tmp_path = self.storage_path.with_file_name(format!("{file_name}.tmp"));

        fs::write(&tmp_path, duid.to_text())?;
        fs::rename(&tmp_path, &self.storage_path)?;

        self.duid = Some(duid.clone());
        Ok(duid)
    }
}

fn link_layer_id() -> Result<(u16, Vec<u8>), DuidError> {
    let interfaces = NetworkInterface::show().map_err(|_| DuidError::NoInterface)?;

    for interface in interfaces {
        // Loopback and tunnel interfaces carry no stable link-layer id.
        if interface.name.starts_with("lo") || interface.name.starts_with("wg") {
            continue;
        }
        let Some(mac) = &interface.mac_addr else {
            continue;
        };
        let Some(bytes) = parse_mac(mac) else {
            continue;
        };
        if bytes.len() >= 6 && bytes.iter().any(|b| *b != 0) {
            return Ok((HTYPE_ETHER as u16, bytes));
        }
    }

    Err(DuidError::NoInterface)
}

fn parse_mac(text: &str) -> Option<Vec<u8>> {
    text.split(':')
        .map(|part| u8::from_str_radix(part, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("duid-test-{}-{name}", std::process::id()))
    }

    #[test]
    fn text_round_trip() {
        let duid = Duid::new(vec![0x00, 0x02, 0xca, 0xfe, 0xba, 0xbe]).unwrap();
        assert_eq!(duid.to_text(), "00:02:ca:fe:ba:be");
        assert_eq!(Duid::from_text("00:02:ca:fe:ba:be").unwrap(), duid);
        assert_eq!(duid.duid_type(), DuidType::En);
    }

    #[test]
    fn malformed_text_is_rejected() {
        assert!(Duid::from_text("zz:00:01").is_err());
        assert!(Duid::from_text("0001").is_err());
        assert!(Duid::from_text("00:01").is_err());
    }

    #[test]
    fn factory_persists_and_reloads() {
        let path = temp_file("persist");
        let _ = fs::remove_file(&path);

        let generated = DuidFactory::new(&path).get().unwrap();
        assert!(generated.bytes().len() >= Duid::MIN_LEN);

        let reloaded = DuidFactory::new(&path).get().unwrap();
        assert_eq!(generated, reloaded);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn factory_regenerates_on_malformed_file() {
        let path = temp_file("malformed");
        fs::write(&path, "not a duid").unwrap();

        let duid = DuidFactory::new(&path).get().unwrap();
        assert!(matches!(duid.duid_type(), DuidType::Llt | DuidType::En));

        let _ = fs::remove_file(&path);
    }
}
