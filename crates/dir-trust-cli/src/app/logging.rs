//! Configure the tracing subscriber.

use tracing_subscriber::{fmt, layer::SubscriberExt, registry, util::SubscriberInitExt, EnvFilter};

use super::config::LoggingConfig;

/// Set up logging
///
/// Log messages go to stderr, so that they don't get mixed up with the
/// verdicts we print.
pub(super) fn setup(config: &LoggingConfig, cli: Option<EnvFilter>) {
    let env_filter = cli.unwrap_or_else(|| {
        filt_from_str_verbose(
            config.trace_filter.as_str(),
            "trace_filter configuration option",
        )
    });

    registry()
        .with(fmt::Layer::default().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

/// As [`EnvFilter::new`], but print a message if any directive in the
/// log is invalid.
fn filt_from_str_verbose(s: &str, source: &str) -> EnvFilter {
    EnvFilter::try_new(s).unwrap_or_else(|_| {
        eprintln!("Problem in {}:", source);
        EnvFilter::new(s)
    })
}
