//! Per-screen state holders.
//!
//! A holder owns one list query. Mutations go through it so the write and
//! the reload that follows run as one sequenced unit.

use crate::error::StoreResult;
use crate::store::Store;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "camelCase")]
pub enum LoadState<T> {
    Loading,
    Success(T),
    Error(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            LoadState::Success(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

impl<T> From<StoreResult<T>> for LoadState<T> {
    fn from(r: StoreResult<T>) -> Self {
        match r {
            Ok(v) => LoadState::Success(v),
            Err(e) => LoadState::Error(e.to_string()),
        }
    }
}

type Loader<T> = Box<dyn Fn(&Store) -> StoreResult<Vec<T>>>;

pub struct ListHolder<T> {
    name: &'static str,
    loader: Loader<T>,
    state: LoadState<Vec<T>>,
    loaded_at: Option<u64>,
}

impl<T> ListHolder<T> {
    pub fn new(
        name: &'static str,
        loader: impl Fn(&Store) -> StoreResult<Vec<T>> + 'static,
    ) -> Self {
        Self {
            name,
            loader: Box::new(loader),
            state: LoadState::Loading,
            loaded_at: None,
        }
    }

    pub fn state(&self) -> &LoadState<Vec<T>> {
        &self.state
    }

    pub fn reload(&mut self, store: &Store) {
        let generation = store.generation();
        self.state = (self.loader)(store).into();
        self.loaded_at = Some(generation);
        debug!(holder = self.name, generation, "reloaded");
    }

    /// Reload only if something was written since the last load.
    pub fn refresh_if_stale(&mut self, store: &Store) -> bool {
        if self.loaded_at == Some(store.generation()) {
            return false;
        }
        self.reload(store);
        true
    }

    /// Run a write, then reload. A failed write leaves its message in the
    /// state and skips the reload.
    pub fn mutate<R>(
        &mut self,
        store: &Store,
        op: impl FnOnce(&Store) -> StoreResult<R>,
    ) -> StoreResult<R> {
        match op(store) {
            Ok(v) => {
                self.reload(store);
                Ok(v)
            }
            Err(e) => {
                self.state = LoadState::Error(e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Program;

    fn holder() -> ListHolder<Program> {
        ListHolder::new("programs", |s: &Store| s.list_programs())
    }

    #[test]
    fn starts_loading_then_succeeds() {
        let store = Store::open_in_memory().expect("store");
        let mut h = holder();
        assert!(h.state().is_loading());
        h.reload(&store);
        assert_eq!(h.state().data().map(Vec::len), Some(0));
    }

    #[test]
    fn mutate_reloads_after_write() {
        let store = Store::open_in_memory().expect("store");
        let mut h = holder();
        h.reload(&store);
        h.mutate(&store, |s| s.create_program("Alpha")).expect("create");
        let names: Vec<&str> = h
            .state()
            .data()
            .expect("loaded")
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha"]);
    }

    #[test]
    fn failed_write_surfaces_message() {
        let store = Store::open_in_memory().expect("store");
        let mut h = holder();
        h.mutate(&store, |s| s.create_program("Alpha")).expect("create");
        assert!(h.mutate(&store, |s| s.create_program("Alpha")).is_err());
        assert_eq!(
            h.state().error(),
            Some("a program with this name already exists")
        );
    }

    #[test]
    fn refresh_only_when_generation_moved() {
        let store = Store::open_in_memory().expect("store");
        let mut h = holder();
        assert!(h.refresh_if_stale(&store));
        assert!(!h.refresh_if_stale(&store));
        store.create_program("Bravo").expect("outside write");
        assert!(h.refresh_if_stale(&store));
        assert_eq!(h.state().data().map(Vec::len), Some(1));
    }
}
