//! Development server configuration types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub open: bool,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Path fragments ignored by the file watcher, in addition to the output directory.
    #[serde(default = "default_watch_ignore")]
    pub watch_ignore: Vec<String>,
}

impl Default for DevSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            open: false,
            debounce_ms: default_debounce_ms(),
            watch_ignore: default_watch_ignore(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_watch_ignore() -> Vec<String> {
    vec!["node_modules".to_string(), ".git".to_string()]
}
