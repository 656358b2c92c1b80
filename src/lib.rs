//! Training-evaluation workspace: a SQLite-backed catalog of programs,
//! POIs, tasks and questions with the people, results and surveys that hang
//! off it, served to a desktop shell over a JSON-lines sidecar protocol.

pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod ipc;
pub mod logging;
pub mod model;
pub mod seed;
pub mod state;
pub mod store;
