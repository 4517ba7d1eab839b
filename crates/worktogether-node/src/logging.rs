use crate::config::LoggingConfig;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn open_log_file(path: &Path) -> anyhow::Result<Mutex<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Mutex::new(file))
}

/// Build the `EnvFilter`: `RUST_LOG` wins, otherwise `-v` counts, otherwise
/// the configured level; module filters are added on top.
pub fn build_filter(config: &LoggingConfig, cli_verbose: u8) -> anyhow::Result<EnvFilter> {
    let log_level = match cli_verbose {
        0 => config.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let mut filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("worktogether={}", log_level)),
    );
    for (module, level) in &config.module_filters {
        filter = filter.add_directive(format!("{}={}", module, level).parse()?);
    }
    Ok(filter)
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig, cli_verbose: u8) -> anyhow::Result<()> {
    let filter = build_filter(config, cli_verbose)?;
    let subscriber = tracing_subscriber::registry().with(filter);
    let file = config
        .file_output
        .as_deref()
        .map(open_log_file)
        .transpose()?;

    match config.format.as_str() {
        "json" => {
            let json_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true);
            let file_layer = file.map(|f| fmt::layer().json().with_writer(f).with_ansi(false));
            subscriber.with(json_layer).with(file_layer).try_init()?;
        }
        "compact" => {
            let compact_layer = fmt::layer()
                .compact()
                .with_target(false)
                .with_line_number(false)
                .with_file(false);
            let file_layer = file.map(|f| fmt::layer().compact().with_writer(f).with_ansi(false));
            subscriber.with(compact_layer).with(file_layer).try_init()?;
        }
        _ => {
            let show_location = cli_verbose > 0 || matches!(config.level.as_str(), "debug" | "trace");
            let pretty_layer = fmt::layer()
                .with_target(show_location)
                .with_line_number(show_location)
                .with_file(show_location);
            let file_layer = file.map(|f| fmt::layer().with_writer(f).with_ansi(false));
            subscriber.with(pretty_layer).with(file_layer).try_init()?;
        }
    }

    Ok(())
}
