//! CRUD event system for store change notifications
//!
//! This module provides:
//! - `CrudEvent`: typed events emitted after every successful mutation
//! - `EventEmitter`: the sink trait the store emits into
//! - `EventBus`: broadcast channel distributing events to subscribers
//! - `ProjectEvents`: a subscription narrowed to one project

mod bus;
mod types;

pub use bus::{EventBus, ProjectEvents, DEFAULT_CAPACITY};
pub use types::{CrudAction, CrudEvent, EntityType, EventEmitter, RelatedEntity};
