//! Application core.
//!
//! Command validation, normalization, dispatch and the boot sequence.
//! All interaction with hardware happens through the **port traits** in
//! [`ports`], keeping this layer testable without a radio or a hub.

pub mod action;
pub mod commands;
pub mod coordinator;
pub mod dispatcher;
pub mod events;
pub mod ports;
