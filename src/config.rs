use std::path::PathBuf;

pub const ENV_WORKSPACE: &str = "TRAININGD_WORKSPACE";
pub const ENV_SEED_ON_OPEN: &str = "TRAININGD_SEED_ON_OPEN";
pub const ENV_LOG: &str = "TRAININGD_LOG";

/// Startup settings. Everything here can also be changed at runtime through
/// `workspace.select`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Workspace opened before the first request, if any.
    pub workspace: Option<PathBuf>,
    /// Load the default catalog whenever a workspace is opened.
    pub seed_on_open: bool,
    /// `tracing` filter directive, e.g. `info` or `trainingd=debug`.
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            seed_on_open: true,
            log_filter: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(ws) = get(ENV_WORKSPACE).filter(|s| !s.trim().is_empty()) {
            cfg.workspace = Some(PathBuf::from(ws.trim()));
        }
        if let Some(flag) = get(ENV_SEED_ON_OPEN).and_then(|s| parse_bool(&s)) {
            cfg.seed_on_open = flag;
        }
        cfg.log_filter = get(ENV_LOG).filter(|s| !s.trim().is_empty());
        cfg
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
