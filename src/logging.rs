use tracing_subscriber::EnvFilter;

/// Initialise logging. The default level is `info`; enabling debug logging
/// in the settings file raises it to `debug` and additionally lets the
/// `RUST_LOG` environment variable override the filter.
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "info" };

    // With debug logging off we ignore `RUST_LOG` entirely so a stray
    // environment variable cannot make the app verbose.
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
