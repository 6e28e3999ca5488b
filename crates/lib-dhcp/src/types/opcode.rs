use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("Invalid opcode: {0}")]
pub struct InvalidOpCode(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    BootRequest = 1,
    BootReply = 2,
}

impl TryFrom<u8> for OpCode {
    type Error = InvalidOpCode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::BootRequest),
            2 => Ok(Self::BootReply),
            _ => Err(InvalidOpCode(value)),
        }
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpCode::BootRequest => write!(f, "BOOTREQUEST"),
            OpCode::BootReply => write!(f, "BOOTREPLY"),
        }
    }
}
