//! Diagnostic logging
//!
//! Logs go to stderr through `tracing-subscriber`; stdout is reserved for the JSON
//! envelope. `RUST_LOG` overrides the default level (`warn`, or `debug` with `-v`).

use tracing_subscriber::EnvFilter;

/// Driver internals that drown out connector events at debug level
const NOISY_TARGETS: &[(&str, &str)] =
    &[("mongodb", "warn"), ("hickory_proto", "warn"), ("hickory_resolver", "warn"), ("rustls", "warn")];

/// Build the filter from `RUST_LOG`, falling back to the default level and
/// the noisy-target overrides
pub fn build_env_filter(verbose: bool) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![if verbose { "debug" } else { "warn" }.to_string()];
    directives.extend(NOISY_TARGETS.iter().map(|(target, level)| format!("{target}={level}")));

    let filter = directives.join(",");
    EnvFilter::try_new(&filter).map_err(|e| anyhow::anyhow!("Invalid tracing filter '{filter}': {e}"))
}

/// Install the global stderr subscriber
///
/// Calling it more than once is harmless; later calls keep the first subscriber.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let filter = build_env_filter(verbose)?;

    // Err only means a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();

    Ok(())
}
