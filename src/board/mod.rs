//! Kanban board state: project snapshot, items and derived columns.

pub mod columns;
mod events;
mod model;

pub use events::{Channel, EventBus, ModelEvent, Subscription};
pub use model::{ProjectModel, DEFAULT_STATUS_FIELD};
