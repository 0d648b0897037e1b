//! Tracing setup.

/// Log level used when `RUST_LOG` is unset.
///
/// Priority: quiet flag > verbose flag > default (warn).
pub(crate) fn default_log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber. Logs go to stderr so command output on
/// stdout (exports, listings) stays machine-readable.
pub(crate) fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::default_log_level;

    #[test]
    fn test_default_log_level_quiet_wins() {
        assert_eq!(default_log_level(3, true), "error");
    }

    #[test]
    fn test_default_log_level_by_verbosity() {
        assert_eq!(default_log_level(0, false), "warn");
        assert_eq!(default_log_level(1, false), "info");
        assert_eq!(default_log_level(2, false), "debug");
        assert_eq!(default_log_level(9, false), "trace");
    }
}
