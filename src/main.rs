use std::io::{self, BufRead, Write};

use serde_json::json;
use tracing::{info, warn};
use trainingd::config::Config;
use trainingd::ipc;
use trainingd::logging::init_logging;

fn main() {
    let config = Config::from_env();
    init_logging(config.log_filter.as_deref());

    let startup_workspace = config.workspace.clone();
    let mut state = ipc::AppState::new(config);
    if let Some(path) = startup_workspace {
        if let Err(e) = state.open_workspace(&path) {
            warn!(workspace = %path.to_string_lossy(), error = %format!("{e:#}"), "startup workspace not opened");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "trainingd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to reply to.
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{resp}");
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    info!("stdin closed, shutting down");
}
