use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, one line per event.
    #[default]
    Compact,
    /// JSON lines, for when the CLI runs under a log collector.
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }
}

/// Filter used when `RUST_LOG` is unset. `--verbose` wins over the configured level.
pub fn default_directive(verbose: bool, level: Option<&str>) -> String {
    match (verbose, level.map(str::trim).filter(|l| !l.is_empty())) {
        (true, _) => "clinic_booking=debug,info".to_string(),
        (false, Some(level)) => format!("clinic_booking={},warn", level),
        (false, None) => "clinic_booking=info,warn".to_string(),
    }
}

/// Installs the global subscriber. Events go to stderr so command output on
/// stdout stays clean.
pub fn init_logger(format: LogFormat, verbose: bool, level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, level)));

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(layer.compact())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init(),
    }
}
