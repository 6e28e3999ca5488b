use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("Max buffer length overflow")]
    MaxLengthOverflow,

    #[error("Invalid data in buffer")]
    InvalidData,

    #[error("Buffer too short")]
    BufTooShort,
}
