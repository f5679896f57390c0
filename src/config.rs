use std::time::Duration;

use tracing::warn;

use crate::http::connection::{DEFAULT_READ_TIMEOUT, SessionMode};
use crate::http::pipeline::DEFAULT_PIPELINE_DEPTH;

pub const DEFAULT_LISTEN_ADDR: &str = "localhost:8888";

/// Server settings, read from the environment.
///
/// | Variable            | Default          |
/// |---------------------|------------------|
/// | `LISTEN`            | `localhost:8888` |
/// | `READ_TIMEOUT_SECS` | `5`              |
/// | `PIPELINE_DEPTH`    | `50`             |
/// | `SESSION_MODE`      | `pipelined`      |
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub read_timeout: Duration,
    pub pipeline_depth: usize,
    pub mode: SessionMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            pipeline_depth: DEFAULT_PIPELINE_DEPTH,
            mode: SessionMode::default(),
        }
    }
}

impl Config {
    /// Loads settings from the environment; unset or unparsable values keep
    /// their defaults.
    pub fn load() -> Self {
        let defaults = Config::default();

        let listen_addr = std::env::var("LISTEN").unwrap_or(defaults.listen_addr);

        let read_timeout =
            parse_var("READ_TIMEOUT_SECS", |v| v.parse::<u64>().ok().filter(|s| *s > 0))
                .map(Duration::from_secs)
                .unwrap_or(defaults.read_timeout);

        let pipeline_depth =
            parse_var("PIPELINE_DEPTH", |v| v.parse::<usize>().ok().filter(|d| *d > 0))
                .unwrap_or(defaults.pipeline_depth);

        let mode = parse_var("SESSION_MODE", SessionMode::from_name).unwrap_or(defaults.mode);

        Self {
            listen_addr,
            read_timeout,
            pipeline_depth,
            mode,
        }
    }
}

fn parse_var<T>(name: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        warn!(variable = name, value = %raw, "Ignoring invalid setting");
    }
    parsed
}
