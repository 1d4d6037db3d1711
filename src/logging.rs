use std::env;
use tracing_subscriber::EnvFilter;

/// Filter used when neither `GED_LOG` nor `RUST_LOG` is set: dependencies
/// stay quiet unless something breaks, ged itself reports warnings.
const DEFAULT_LOG_FILTER: &str = "error,ged=warn";

pub const LOG_FILTER_ENV: &str = "GED_LOG";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Pretty,
    Json,
}

fn parse_log_format(raw: Option<&str>) -> LogFormat {
    match raw.map(|value| value.trim().to_ascii_lowercase()).as_deref() {
        Some("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    }
}

/// `GED_LOG` wins over `RUST_LOG`; an unparsable or blank directive falls
/// back to the default instead of silencing everything.
fn filter_directive(ged_log: Option<&str>, rust_log: Option<&str>) -> String {
    [ged_log, rust_log]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|directive| !directive.is_empty() && EnvFilter::try_new(directive).is_ok())
        .unwrap_or(DEFAULT_LOG_FILTER)
        .to_string()
}

/// Installs the global subscriber. Logs always go to stderr; stdout is
/// reserved for completions.
pub fn init() {
    let format = parse_log_format(env::var(LOG_FORMAT_ENV).ok().as_deref());
    let directive = filter_directive(
        env::var(LOG_FILTER_ENV).ok().as_deref(),
        env::var(EnvFilter::DEFAULT_ENV).ok().as_deref(),
    );
    let filter = EnvFilter::new(directive);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
