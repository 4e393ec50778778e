//! Logging macros gated by a per-module `ENABLE_LOGS` flag.
//!
//! Chatty subsystems (the scheduler loop, the audio thread) can be silenced
//! at compile time without touching the global `RUST_LOG` filter:
//!
//! ```ignore
//! const ENABLE_LOGS: bool = false;
//!
//! use crate::log_info;
//!
//! log_info!("tick at {}", now);
//! ```

/// `log::info!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// `log::warn!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}
