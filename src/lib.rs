//! Kanban board sync core for GitHub Projects.
//!
//! - [`cache`]: read-through TTL cache for remote reads
//! - [`board`]: the project model and its derived columns
//! - [`sync`]: the coordinator reconciling local edits with the remote
//! - [`github`]: GraphQL client implementing [`sync::RemoteClient`]

pub mod app;
pub mod board;
pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod logging;
pub mod render;
pub mod retry;
pub mod sync;
