#![forbid(unsafe_code)]

//! `gridmap` is a headless editor for provider topologies drawn on a world map.
//!
//! The editor state, link health and sync outbox live in `gridmap-core`, re-exported here.
//!
//! # Features
//!
//! - `http`: enable the `reqwest` backend for the remote node store (`gridmap::http`)
//!
//! # Example
//!
//! ```
//! use gridmap::{Editor, EditorConfig, LatLng};
//!
//! let mut editor = Editor::headless(EditorConfig::default());
//! editor.mark_map_ready();
//! editor.seed_demo();
//!
//! let snapshot = editor.snapshot();
//! assert_eq!(snapshot.summary.provider_count, 5);
//! assert!(snapshot.controls.connect.visible);
//!
//! editor.toggle_add_node()?;
//! let placed = editor.click_map(LatLng::new(-33.87, 151.21))?;
//! assert!(placed.is_some());
//! # Ok::<(), gridmap::Error>(())
//! ```

pub use gridmap_core::*;

#[cfg(feature = "http")]
pub mod http {
    pub use gridmap_http::{DEFAULT_TIMEOUT, Error, HttpBackend, Result};

    use gridmap_core::EditorConfig;
    use gridmap_core::sync::{Session, SyncAdapter};

    /// Sync adapter talking to `config.api_base_url`.
    pub fn adapter<S: Session>(
        config: &EditorConfig,
        session: S,
    ) -> Result<SyncAdapter<HttpBackend, S>> {
        let backend = HttpBackend::new(&config.api_base_url)?;
        Ok(SyncAdapter::new(backend, session))
    }

}
