// Tracing setup shared by hosts and the CLI harness.

use tracing_subscriber::EnvFilter;

/// Install a global subscriber filtered by `RUST_LOG`, or `default_filter`
/// when it is unset. Safe to call more than once; returns whether this call
/// installed the subscriber.
pub fn init_tracing(json: bool, default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let installed = if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };
    if installed {
        tracing::debug!("Tracing initialized (filter default {:?})", default_filter);
    }
    installed
}
