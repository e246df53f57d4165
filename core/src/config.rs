use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Newline-delimited list of source URLs.
    #[serde(default = "default_sources_path")]
    pub sources_path: PathBuf,
    /// Directory holding downloaded sources and the built indices.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_concurrent_downloads")]
    pub concurrent_downloads: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_sources_path() -> PathBuf {
    PathBuf::from("./sources.txt")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./sources")
}
fn default_concurrent_downloads() -> usize {
    8
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("mailprovider/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources_path: default_sources_path(),
            data_dir: default_data_dir(),
            concurrent_downloads: default_concurrent_downloads(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Defaults overlaid with `MAIL_PROVIDER_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("MAIL_PROVIDER_SOURCES") {
            config.sources_path = v.into();
        }
        if let Ok(v) = std::env::var("MAIL_PROVIDER_DATA_DIR") {
            config.data_dir = v.into();
        }
        if let Some(n) = std::env::var("MAIL_PROVIDER_CONCURRENCY").ok().and_then(|v| v.parse().ok()) {
            config.concurrent_downloads = n;
        }
        if let Some(n) = std::env::var("MAIL_PROVIDER_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()) {
            config.timeout_secs = n;
        }
        config
    }

    pub fn with_paths(mut self, sources_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Self {
        if let Some(p) = sources_path {
            self.sources_path = p;
        }
        if let Some(d) = data_dir {
            self.data_dir = d;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_paths_override_defaults() {
        let config = Config::default().with_paths(Some("/tmp/list.txt".into()), None);
        assert_eq!(config.sources_path, PathBuf::from("/tmp/list.txt"));
        assert_eq!(config.data_dir, PathBuf::from("./sources"));
        assert_eq!(config.concurrent_downloads, 8);
    }

    #[test]
    fn deserializes_partial_config() {
        let config: Config = serde_json::from_str(r#"{"data_dir": "/var/lib/mp", "timeout_secs": 5}"#).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/mp"));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.sources_path, PathBuf::from("./sources.txt"));
    }
}
