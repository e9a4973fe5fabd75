//! Serial transport to the microcontroller hub that fans out to wired
//! receivers.
//!
//! - [`protocol`]: opcodes, request framing, streaming response decoder
//! - [`transport`]: the byte-link trait the manager talks through
//! - [`manager`]: boot handshake, registration, acknowledged commands

pub mod manager;
pub mod protocol;
pub mod transport;

pub use manager::SerialManager;
pub use protocol::Opcode;
pub use transport::SerialLink;
