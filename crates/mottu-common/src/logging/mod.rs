//! Logging initialization for the Mottu binaries
//!
//! Filter priority, highest first:
//! 1. CLI flags (`-v/-q`)
//! 2. `RUST_LOG` environment variable
//! 3. The binary's default filter

use anyhow::Result;
use clap_verbosity_flag::{LogLevel, Verbosity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global subscriber.
///
/// # Example
///
/// ```no_run
/// use clap::Parser;
/// use clap_verbosity_flag::{InfoLevel, Verbosity};
/// use mottu_common::logging;
///
/// #[derive(Parser)]
/// struct Args {
///     #[clap(flatten)]
///     verbosity: Verbosity<InfoLevel>,
/// }
///
/// let args = Args::parse();
/// logging::init_logging(&args.verbosity, "mottu_rental=info").unwrap();
/// ```
pub fn init_logging<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<()> {
    let filter = resolve_filter(verbosity, default_filter)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

fn resolve_filter<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<EnvFilter> {
    if verbosity.is_present() {
        return Ok(EnvFilter::try_new(verbosity.log_level_filter().to_string())?);
    }

    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
}
