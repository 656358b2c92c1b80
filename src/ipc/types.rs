use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::model::Program;
use crate::seed::{self, SeedReport};
use crate::state::ListHolder;
use crate::store::Store;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub store: Option<Store>,
    /// Program list served by `programs.list`, reloaded when the store
    /// generation moves.
    pub programs: ListHolder<Program>,
}

fn program_holder() -> ListHolder<Program> {
    ListHolder::new("programs", |s: &Store| s.list_programs())
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            workspace: None,
            store: None,
            programs: program_holder(),
        }
    }

    /// Open (or create) the workspace database and make it current. Seeds the
    /// default catalog when configured to. If the open fails the previous
    /// workspace is reopened; failing that, no workspace is selected.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<Option<SeedReport>> {
        // Close the old handle before touching the new file.
        self.store = None;
        let previous = self.workspace.take();
        // A new store restarts its generation count.
        self.programs = program_holder();

        match self.open_store(path) {
            Ok((store, report)) => {
                info!(workspace = %path.to_string_lossy(), "workspace opened");
                self.workspace = Some(path.to_path_buf());
                self.store = Some(store);
                Ok(report)
            }
            Err(e) => {
                warn!(workspace = %path.to_string_lossy(), error = %format!("{e:#}"), "workspace open failed");
                if let Some(prev) = previous.filter(|p| p.as_path() != path) {
                    match Store::open(&prev) {
                        Ok(store) => {
                            self.workspace = Some(prev);
                            self.store = Some(store);
                        }
                        Err(e) => {
                            warn!(workspace = %prev.to_string_lossy(), error = %format!("{e:#}"), "previous workspace not reopened");
                        }
                    }
                }
                Err(e)
            }
        }
    }

    fn open_store(&self, path: &Path) -> anyhow::Result<(Store, Option<SeedReport>)> {
        let store = Store::open(path)?;
        let report = if self.config.seed_on_open {
            Some(seed::prepopulate(&store)?)
        } else {
            None
        };
        Ok((store, report))
    }
}
