//! Reporting of per-tile failures

use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl From<Severity> for log::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

/// Receives every failure caught during a render pass, once each
pub trait FailureSink: Send + Sync {
    fn report(&self, severity: Severity, message: &str, error: &RenderError);
}

/// Forwards failures to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl FailureSink for LogSink {
    fn report(&self, severity: Severity, message: &str, error: &RenderError) {
        log::log!(log::Level::from(severity), "{}: {}", message, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_maps_to_log_level() {
        assert_eq!(log::Level::from(Severity::Warning), log::Level::Warn);
        assert_eq!(log::Level::from(Severity::Error), log::Level::Error);
    }

    #[test]
    fn test_log_sink_accepts_reports() {
        let _ = env_logger::builder().is_test(true).try_init();
        LogSink.report(Severity::Error, "tile 3/1/2", &RenderError::decode("bad header"));
    }
}
