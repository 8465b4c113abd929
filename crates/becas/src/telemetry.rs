use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Per-request chatter from the record client and its HTTP stack, muted below `debug`.
const TRANSPORT_TARGETS: [&str; 4] = ["becas::records", "reqwest", "hyper", "hyper_util"];

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "invalid APP_LOG_LEVEL filter '{}'", value)
            }
            TelemetryError::Subscriber(err) => write!(f, "could not install subscriber: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Expand `APP_LOG_LEVEL` into filter directives.
///
/// A bare level applies to the portal workflows while the record transport stays at `warn`
/// unless the level is `debug` or `trace`. Values that already carry directives are used
/// verbatim.
pub fn filter_directives(log_level: &str) -> String {
    let level = log_level.trim();
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }

    let verbose = matches!(level.to_ascii_lowercase().as_str(), "debug" | "trace");
    let mut directives = vec![level.to_string()];
    if !verbose {
        directives.extend(TRANSPORT_TARGETS.iter().map(|target| format!("{target}=warn")));
    }
    directives.join(",")
}

/// Install the global fmt subscriber. `RUST_LOG` wins over the configured level.
///
/// Targets stay on so workflow events (`becas::workflows::scholarships::intake`, ...) can be
/// filtered per module.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter_directives(&config.log_level)).map_err(|source| {
            TelemetryError::EnvFilter {
                value: config.log_level.clone(),
                source,
            }
        })?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_levels_mute_the_record_transport() {
        assert_eq!(
            filter_directives("info"),
            "info,becas::records=warn,reqwest=warn,hyper=warn,hyper_util=warn"
        );
        assert_eq!(filter_directives(" DEBUG "), "DEBUG");
    }

    #[test]
    fn explicit_directives_pass_through() {
        assert_eq!(
            filter_directives("warn,becas::workflows=debug"),
            "warn,becas::workflows=debug"
        );
    }

    #[test]
    fn expanded_directives_parse() {
        assert!(EnvFilter::try_new(filter_directives("info")).is_ok());
        assert!(EnvFilter::try_new(filter_directives("trace")).is_ok());
    }
}
