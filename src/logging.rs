//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "warn";

/// Install a stderr fmt subscriber filtered by `RUST_LOG` (default `warn`).
///
/// With `quiet`, nothing is installed unless `RUST_LOG` is set explicitly; the
/// TUI uses this so log lines do not land on the alternate screen.
pub fn init(quiet: bool) {
    let from_env = EnvFilter::try_from_default_env().ok();
    if quiet && from_env.is_none() {
        return;
    }
    let filter = from_env.unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

    // `try_init` so a second call (tests, embedding) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
