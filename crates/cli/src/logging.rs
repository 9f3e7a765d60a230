//! Tracing subscriber setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log to stderr so event output on stdout stays clean.
///
/// `RUST_LOG` wins over the default filter; `verbose` raises the default to debug.
pub fn init(verbose: bool) {
    let default = if verbose {
        "mloop_core=debug,mloop_cli=debug"
    } else {
        "mloop_core=warn,mloop_cli=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}
