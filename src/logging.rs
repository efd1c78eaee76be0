use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static LOG_ENV_VAR: &str = "FEEDBACK_THEMES_LOG";

/// Install the global subscriber. `FEEDBACK_THEMES_LOG` overrides `default_level`.
pub fn setup_logger(default_level: LevelFilter) {
    let indicatif_layer = IndicatifLayer::new();

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    // Source locations only help when working on the crate itself.
    let fmt = fmt::layer()
        .with_ansi(true)
        .with_target(true)
        .with_file(cfg!(debug_assertions))
        .with_line_number(cfg!(debug_assertions))
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_writer(indicatif_layer.get_stderr_writer())
        .pretty();

    tracing_subscriber::registry()
        .with(fmt)
        .with(indicatif_layer)
        .with(env_filter)
        .init();
}
