use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding an `EnvFilter` directive that overrides the CLI verbosity.
pub const LOG_ENV_VAR: &str = "LLMMIT_LOG";

pub fn setup_logger(level: LevelFilter, ansi: bool) {
    let indicatif_layer = IndicatifLayer::new();

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    // File and line only help when someone is actually debugging.
    let detailed = level >= LevelFilter::DEBUG;

    let fmt = fmt::layer()
        .with_ansi(ansi)
        .with_target(detailed)
        .with_file(detailed)
        .with_line_number(detailed)
        .with_thread_names(false)
        .with_thread_ids(false)
        .without_time()
        .with_writer(indicatif_layer.get_stderr_writer())
        .compact();

    tracing_subscriber::registry()
        .with(fmt)
        .with(indicatif_layer)
        .with(env_filter)
        .init();
}
