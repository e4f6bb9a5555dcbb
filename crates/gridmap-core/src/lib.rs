#![forbid(unsafe_code)]

//! Headless core of the gridmap topology editor.
//!
//! Providers are pins on a world map; connections are polylines between them. This crate owns
//! the editing state machine, link health with blinking, the optimistic sync outbox and the
//! render snapshot. It does not draw anything or talk to the network itself: hosts plug in a
//! [`MapSurface`](surface::MapSurface), a [`BlinkTimers`](health::BlinkTimers) clock and a
//! [`TopologyBackend`](sync::TopologyBackend).
//!
//! Async APIs are runtime-agnostic (no specific executor required).

pub mod config;
pub mod demo;
pub mod dialog;
pub mod editor;
pub mod error;
pub mod geom;
pub mod health;
pub mod model;
pub mod notice;
pub mod popup;
pub mod ready;
pub mod selection;
pub mod snapshot;
pub mod store;
pub mod surface;
pub mod sync;
pub mod wire;

pub use config::EditorConfig;
pub use editor::{Editor, NodeClick};
pub use error::{Error, RemoteError, Result};
pub use geom::{Bounds, LatLng};
pub use gridmap_graphlib::EdgeId;
pub use health::{BlinkTimers, ManualTimers, TimerHandle};
pub use model::{Edge, EdgePath, Node, NodeAttributes, NodeId, Status, SyncState};
pub use selection::SelectionState;
pub use snapshot::Snapshot;
pub use store::TopologyStore;
pub use surface::{MapSurface, SurfacePresenter};
pub use sync::{MemoryBackend, MemorySession, Session, SyncAdapter, TopologyBackend};
