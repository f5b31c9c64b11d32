//! Status reporting boundary
//!
//! The pipeline narrates its phases (loading, loaded, fallback, render
//! failure) through a sink the host owns; a web host would write into a
//! status element, the CLI prints.

use log::{error, info, warn};

/// Severity of a status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Receiver for user-facing phase messages
pub trait StatusSink: Send + Sync {
    fn set_status(&self, message: &str, level: StatusLevel);
}

/// Sink that forwards status messages to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn set_status(&self, message: &str, level: StatusLevel) {
        match level {
            StatusLevel::Info | StatusLevel::Success => info!("{}", message),
            StatusLevel::Warning => warn!("{}", message),
            StatusLevel::Error => error!("{}", message),
        }
    }
}
