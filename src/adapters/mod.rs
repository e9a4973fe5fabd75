//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter       | Implements        | Connects to               |
//! |---------------|-------------------|---------------------------|
//! | `dry_run`     | RfTransmitter     | log output only           |
//! | `hardware`    | HardwareProvider  | real or dry-run devices   |
//! | `log_sink`    | EventSink         | `log` facade              |
//! | `serial_port` | SerialLink        | USB CDC serial hub        |
//! | `urh_cli`     | RfTransmitter     | `urh_cli` child process   |

pub mod dry_run;
pub mod hardware;
pub mod log_sink;
pub mod serial_port;
pub mod urh_cli;

pub use hardware::{DryRunHardware, SystemHardware};
pub use log_sink::LogEventSink;
