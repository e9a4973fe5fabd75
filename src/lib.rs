//! collarctl library.
//!
//! Drives remote training collars over an SDR and over a serial hub of
//! wired receivers.  The binary is a thin shell around
//! [`app::coordinator::Coordinator`]; everything here is usable and
//! testable without hardware through the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod codec;
pub mod config;
pub mod error;
pub mod receiver;
pub mod scheduler;
pub mod serial;

pub use error::{Error, Result};
