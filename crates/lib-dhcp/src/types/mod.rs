pub mod option;

mod hwaddr;
mod message;
mod message_type;
mod opcode;

pub use hwaddr::*;
pub use message::*;
pub use message_type::*;
pub use opcode::*;
