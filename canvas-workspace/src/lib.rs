//! # Canvas Workspace
//!
//! Persistence and widget-lifecycle engine for a free-form, per-tenant
//! widget canvas.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │               WidgetCanvas (controller)         │
//! ├────────────────────┬──────────────┬─────────────┤
//! │  Storage Engine    │  Delete      │  Trash      │
//! │  - CanvasStorage   │  Animation   │  Affordance │
//! │  - DebouncedSaver  │  - tween     │  - FSM      │
//! │  - Memory / File   │  - reduced   │  - zones    │
//! │    backends        │    motion    │             │
//! ├────────────────────┴──────────────┴─────────────┤
//! │   Schema (CanvasState, WidgetState) + TenantKey │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Storage is partitioned by [`TenantKey`]. Records carry
//! [`SCHEMA_VERSION`]; anything else loads as absent. Drag updates are
//! debounced per tenant, discrete changes are saved immediately, and a
//! deletion persists only after its animation completes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animation;
pub mod backend;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod schema;
pub mod storage;
pub mod tenant;
pub mod trash;

pub use animation::{
    animate_widget_delete, AnimatedValue, DeleteFrame, DeleteKeyframes, DeleteOptions,
    DeleteTargets, FRAME_INTERVAL, TOTAL_DURATION,
};
pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use config::{CanvasConfig, DEFAULT_DEBOUNCE};
pub use controller::WidgetCanvas;
pub use debounce::{DebouncedSaver, ErrorHook};
pub use error::{CanvasError, CanvasResult, StorageError};
pub use schema::{AvatarState, CanvasState, WidgetId, WidgetKind, WidgetState, SCHEMA_VERSION};
pub use storage::CanvasStorage;
pub use tenant::TenantKey;
pub use trash::{ReleaseOutcome, TrashAffordance, TrashState, TrashStep, TrashZone, ZoneSignal};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
