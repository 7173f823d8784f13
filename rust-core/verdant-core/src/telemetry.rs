//! # Tracing Setup
//!
//! `RUST_LOG` wins when set; otherwise `default_directive` (e.g.
//! `"verdant=info"`) is used. Installing a subscriber twice is a no-op.
//!
//! Both initialisers also route panics through `tracing` with a captured
//! backtrace, so a handler panic recovered by the dispatcher still leaves a
//! stack trace in the log.

use std::backtrace::Backtrace;
use std::panic;
use std::sync::Once;
use tracing::error;
use tracing_subscriber::EnvFilter;

static PANIC_HOOK: Once = Once::new();

fn filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install a human-readable `fmt` subscriber
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(default_directive))
        .with_target(false)
        .try_init()
        .is_ok();
    install_panic_hook();
    installed
}

/// Install a JSON `fmt` subscriber, one object per line
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_json_tracing(default_directive: &str) -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(default_directive))
        .json()
        .try_init()
        .is_ok();
    install_panic_hook();
    installed
}

/// Log every panic as an `error!` event carrying a backtrace
///
/// The backtrace is captured regardless of `RUST_BACKTRACE`. Only the first
/// call installs the hook.
///
/// # Returns
///
/// `true` if this call installed the hook.
pub fn install_panic_hook() -> bool {
    let mut installed = false;
    PANIC_HOOK.call_once(|| {
        panic::set_hook(Box::new(|info| {
            let backtrace = Backtrace::force_capture();
            error!(panic = %info, %backtrace, "Panic");
        }));
        installed = true;
    });
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let _ = init_tracing("verdant=debug");
        assert!(!init_json_tracing("verdant=info"));
    }

    #[test]
    fn test_panic_hook_installs_once() {
        let _ = install_panic_hook();
        assert!(!install_panic_hook());

        let caught = panic::catch_unwind(|| panic!("handler failure"));
        assert!(caught.is_err());
    }
}
