//! Host map bindings.
//!
//! A [`MapSurface`] owns the actual pins, polylines and popup of whatever map widget the host
//! embeds. [`SurfacePresenter`] keeps the surface in step with successive [`Snapshot`]s by
//! diffing against what it last drew.

use indexmap::IndexMap;

use crate::geom::LatLng;
use crate::model::NodeId;
use crate::snapshot::{EdgeView, InfoView, NodeView, Snapshot};

pub trait MapSurface {
    type Pin;
    type Line;

    fn place_pin(&mut self, node: &NodeView) -> Self::Pin;
    fn update_pin(&mut self, pin: &mut Self::Pin, node: &NodeView);
    fn remove_pin(&mut self, pin: Self::Pin);

    fn draw_line(&mut self, edge: &EdgeView) -> Self::Line;
    fn update_line(&mut self, line: &mut Self::Line, edge: &EdgeView);
    fn remove_line(&mut self, line: Self::Line);

    fn show_popup(&mut self, info: &InfoView);
    fn hide_popup(&mut self);
}

/// Counts of surface calls made by one [`SurfacePresenter::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresentStats {
    pub placed: usize,
    pub updated: usize,
    pub removed: usize,
    pub popup_changed: bool,
}

struct Drawn<H, V> {
    handle: H,
    view: V,
}

pub struct SurfacePresenter<S: MapSurface> {
    surface: S,
    pins: IndexMap<NodeId, Drawn<S::Pin, NodeView>>,
    lines: IndexMap<u64, Drawn<S::Line, EdgeView>>,
    popup: Option<InfoView>,
}

impl<S: MapSurface> SurfacePresenter<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            pins: IndexMap::new(),
            lines: IndexMap::new(),
            popup: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn apply(&mut self, snapshot: &Snapshot) -> PresentStats {
        let mut stats = PresentStats::default();

        // Lines go first so no line outlives its endpoint pins on the surface.
        let live_lines: Vec<u64> = snapshot.edges.iter().map(|e| e.id).collect();
        let stale: Vec<u64> = self
            .lines
            .keys()
            .filter(|id| !live_lines.contains(id))
            .copied()
            .collect();
        for id in stale {
            if let Some(drawn) = self.lines.shift_remove(&id) {
                self.surface.remove_line(drawn.handle);
                stats.removed += 1;
            }
        }

        let stale: Vec<NodeId> = self
            .pins
            .keys()
            .filter(|id| !snapshot.nodes.iter().any(|n| &n.id == *id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(drawn) = self.pins.shift_remove(&id) {
                self.surface.remove_pin(drawn.handle);
                stats.removed += 1;
            }
        }

        for node in &snapshot.nodes {
            match self.pins.get_mut(&node.id) {
                Some(drawn) if drawn.view == *node => {}
                Some(drawn) => {
                    self.surface.update_pin(&mut drawn.handle, node);
                    drawn.view = node.clone();
                    stats.updated += 1;
                }
                None => {
                    let handle = self.surface.place_pin(node);
                    self.pins.insert(
                        node.id.clone(),
                        Drawn {
                            handle,
                            view: node.clone(),
                        },
                    );
                    stats.placed += 1;
                }
            }
        }

        for edge in &snapshot.edges {
            match self.lines.get_mut(&edge.id) {
                Some(drawn) if drawn.view == *edge => {}
                Some(drawn) => {
                    self.surface.update_line(&mut drawn.handle, edge);
                    drawn.view = edge.clone();
                    stats.updated += 1;
                }
                None => {
                    let handle = self.surface.draw_line(edge);
                    self.lines.insert(
                        edge.id,
                        Drawn {
                            handle,
                            view: edge.clone(),
                        },
                    );
                    stats.placed += 1;
                }
            }
        }

        if self.popup != snapshot.info {
            match &snapshot.info {
                Some(info) => self.surface.show_popup(info),
                None => self.surface.hide_popup(),
            }
            self.popup = snapshot.info.clone();
            stats.popup_changed = true;
        }

        stats
    }

    /// Removes everything this presenter drew.
    pub fn clear(&mut self) {
        for (_, drawn) in self.lines.drain(..) {
            self.surface.remove_line(drawn.handle);
        }
        for (_, drawn) in self.pins.drain(..) {
            self.surface.remove_pin(drawn.handle);
        }
        if self.popup.take().is_some() {
            self.surface.hide_popup();
        }
    }

    pub fn into_surface(mut self) -> S {
        self.clear();
        let Self { surface, .. } = self;
        surface
    }
}

/// Surface that logs calls instead of drawing. Handles are plain counters.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    next: u64,
    pub calls: Vec<String>,
}

impl RecordingSurface {
    fn handle(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    pub fn take_calls(&mut self) -> Vec<String> {
        std::mem::take(&mut self.calls)
    }
}

fn fmt_point(p: LatLng) -> String {
    format!("{:.4},{:.4}", p.lat, p.lng)
}

impl MapSurface for RecordingSurface {
    type Pin = u64;
    type Line = u64;

    fn place_pin(&mut self, node: &NodeView) -> u64 {
        self.calls.push(format!(
            "place {} {} {}",
            node.id,
            fmt_point(node.position),
            node.color
        ));
        self.handle()
    }

    fn update_pin(&mut self, _pin: &mut u64, node: &NodeView) {
        self.calls.push(format!("update-pin {}", node.id));
    }

    fn remove_pin(&mut self, pin: u64) {
        self.calls.push(format!("remove-pin #{pin}"));
    }

    fn draw_line(&mut self, edge: &EdgeView) -> u64 {
        self.calls.push(format!(
            "draw {} {}->{} {}",
            edge.id, edge.from, edge.to, edge.stroke
        ));
        self.handle()
    }

    fn update_line(&mut self, _line: &mut u64, edge: &EdgeView) {
        self.calls.push(format!("update-line {}", edge.id));
    }

    fn remove_line(&mut self, line: u64) {
        self.calls.push(format!("remove-line #{line}"));
    }

    fn show_popup(&mut self, info: &InfoView) {
        self.calls
            .push(format!("popup {}", info.content.title()));
    }

    fn hide_popup(&mut self) {
        self.calls.push("hide-popup".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::editor::Editor;
    use crate::model::{NodeAttributes, Status};
    use std::time::Duration;

    #[test]
    fn first_apply_places_everything() {
        let mut ed = Editor::headless(EditorConfig::default());
        ed.mark_map_ready();
        ed.seed_demo();
        ed.add_edge(&"demo-1".into(), &"demo-2".into()).unwrap();

        let mut presenter = SurfacePresenter::new(RecordingSurface::default());
        let stats = presenter.apply(&ed.snapshot());
        assert_eq!(stats.placed, 6);
        assert_eq!(presenter.pin_count(), 5);
        assert_eq!(presenter.line_count(), 1);
        assert!(!stats.popup_changed);

        let again = presenter.apply(&ed.snapshot());
        assert_eq!(again, PresentStats::default());
    }

    #[test]
    fn blink_ticks_only_touch_the_line() {
        let mut ed = Editor::headless(EditorConfig::default());
        ed.mark_map_ready();
        ed.seed_demo();
        let e = ed.add_edge(&"demo-1".into(), &"demo-2".into()).unwrap();
        for id in ["demo-1", "demo-2"] {
            ed.update_node(&id.into(), &NodeAttributes::status(Status::Stopped))
                .unwrap();
        }
        let mut presenter = SurfacePresenter::new(RecordingSurface::default());
        presenter.apply(&ed.snapshot());
        presenter.surface.take_calls();

        let interval = ed.config().blink_interval();
        assert_eq!(ed.advance_timers(interval + Duration::from_millis(1)), 1);
        let stats = presenter.apply(&ed.snapshot());
        assert_eq!(stats.updated, 1);
        assert_eq!(
            presenter.surface.take_calls(),
            vec![format!("update-line {}", e.get())]
        );
    }

    #[test]
    fn removals_drop_lines_before_pins() {
        let mut ed = Editor::headless(EditorConfig::default());
        ed.mark_map_ready();
        ed.seed_demo();
        ed.add_edge(&"demo-1".into(), &"demo-2".into()).unwrap();
        let mut presenter = SurfacePresenter::new(RecordingSurface::default());
        presenter.apply(&ed.snapshot());

        presenter.surface.take_calls();

        ed.remove_node(&"demo-1".into()).unwrap();
        let stats = presenter.apply(&ed.snapshot());
        assert_eq!(stats.removed, 2);
        let calls = presenter.surface.take_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("remove-line"));
        assert!(calls[1].starts_with("remove-pin"));
    }

    #[test]
    fn popup_follows_info_display() {
        let mut ed = Editor::headless(EditorConfig::default());
        ed.mark_map_ready();
        ed.seed_demo();
        let mut presenter = SurfacePresenter::new(RecordingSurface::default());
        presenter.apply(&ed.snapshot());
        presenter.surface.take_calls();

        ed.click_node(&"demo-3".into()).unwrap();
        assert!(presenter.apply(&ed.snapshot()).popup_changed);
        ed.close_info();
        assert!(presenter.apply(&ed.snapshot()).popup_changed);
        assert_eq!(
            presenter.surface.take_calls(),
            vec!["popup Provider C".to_string(), "hide-popup".to_string()]
        );
    }
}
