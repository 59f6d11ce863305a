//! Server configuration from environment variables.

use std::time::Duration;

/// Get an environment variable with a default value.
pub fn get_env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable and parse it, or use a default value.
pub fn get_env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// Runtime settings for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL used to build absolute share links.
    pub base_url: String,
    /// Delay between streamed response chunks.
    pub stream_pacing: Duration,
}

impl ServerConfig {
    /// Load from `TRIPFLOW_BASE_URL` / `TRIPFLOW_STREAM_DELAY_MS`.
    pub fn from_env() -> Self {
        Self {
            base_url: get_env_or("TRIPFLOW_BASE_URL", "http://localhost:8000"),
            stream_pacing: Duration::from_millis(get_env_parse_or(
                "TRIPFLOW_STREAM_DELAY_MS",
                1000,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_on_garbage() {
        std::env::remove_var("TRIPFLOW_TEST_UNSET");
        assert_eq!(get_env_parse_or::<u16>("TRIPFLOW_TEST_UNSET", 42), 42);
    }
}
