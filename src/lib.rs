//! Trainer directory service: registration with document uploads, an
//! approved-trainer directory with search, contact requests and templated
//! email notifications.

pub mod admin_cli;
pub mod core;
pub mod email;
pub mod phone;
pub mod render;
pub mod search;
pub mod types;
pub mod upload_validator;
pub mod utils;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

pub use crate::core::{AppContext, ConfigManager};
pub use crate::web::start_web_server;

/// Crate-wide logging entry point, forwarding to `tracing` with the level as
/// the first argument.
#[macro_export]
macro_rules! app_log {
    (trace, $($arg:tt)+) => { ::tracing::trace!($($arg)+) };
    (debug, $($arg:tt)+) => { ::tracing::debug!($($arg)+) };
    (info, $($arg:tt)+) => { ::tracing::info!($($arg)+) };
    (warn, $($arg:tt)+) => { ::tracing::warn!($($arg)+) };
    (error, $($arg:tt)+) => { ::tracing::error!($($arg)+) };
}
