mod action;
mod error;
mod monitor;
mod notice;

pub use action::StopMode;
pub use error::ConfigurationError;
pub use monitor::AbortMonitor;
pub use notice::AbortNotice;

/// Type name under which the monitor is registered.
pub const TYPE_NAME: &str = "abort";
