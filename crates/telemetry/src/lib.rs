//! Logging/tracing bootstrap.
//!
//! One-shot initialization of the global `tracing` subscriber. The format is
//! driven by settings so local runs stay human-readable while deployed
//! environments emit structured JSON.

use tracing_subscriber::EnvFilter;

use lectern_kernel::settings::{LogFormat, TelemetrySettings};

/// Initialize the tracing pipeline. Safe to call more than once; later
/// calls are no-ops (test binaries hit this path).
pub fn init(settings: &TelemetrySettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match settings.log_format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_does_not_panic() {
        let settings = TelemetrySettings::default();
        init(&settings);
        init(&settings);
    }
}
