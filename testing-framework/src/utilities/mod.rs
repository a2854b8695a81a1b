// Testing utilities shared by unit tests, integration tests and fuzz targets.

use std::time::Duration;

/// Route `log` output through the test writer.
///
/// Safe to call from every test, only the first call installs the logger.
/// The level comes from `RUST_LOG` and defaults to `warn`.
pub fn init_test_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .parse_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();
}

/// Render a duration as `1.234s` for log lines
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3}s", elapsed.as_secs_f64())
}
