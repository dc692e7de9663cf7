//! Test configuration helpers

use chart_mirror::{Config, RetryConfig};
use std::path::Path;
use std::time::Duration;
use wiremock::MockServer;

/// Retry policy that gives up quickly so failing tests stay fast
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
        max_elapsed_time: Duration::from_millis(200),
        jitter: false,
    }
}

/// Config mirroring `server` (optionally below `path`) into `local_dir`
pub fn mirror_config(server: &MockServer, path: &str, local_dir: &Path) -> Config {
    let mut config = Config::new(format!("{}{}", server.uri(), path), local_dir);
    config.retry = fast_retry();
    config
}
