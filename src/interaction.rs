//! Pointer and keyboard input turned into camera rotation or host events.
//!
//! A press starts a drag. A release that never moved is a click. Clicks are
//! ignored for a short debounce after a real drag so the release is not
//! read as a click on whatever sits under the pointer.

use std::time::Duration;

use tracing::debug;

use crate::animation::Callout;
use crate::camera::{CameraController, CameraState};
use crate::config::InteractionConfig;
use crate::map::markers::MarkerLayer;

/// What the engine asks of its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobeEvent {
    RecordFocused(String),
    /// The user wants the full detail view
    RecordExpanded(String),
    ResetRequested,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Dragging { last: (f64, f64), moved: bool },
}

/// What a click can land on this frame.
pub struct HitContext<'a> {
    pub markers: &'a MarkerLayer,
    pub callout: Option<&'a Callout>,
    pub focused: Option<&'a str>,
}

pub struct InteractionHandler {
    config: InteractionConfig,
    state: DragState,
    /// Clicks are dropped before this instant (time since start)
    clicks_blocked_until: Duration,
}

impl InteractionHandler {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            state: DragState::Idle,
            clicks_blocked_until: Duration::ZERO,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// Dragging, or still inside the post-drag debounce.
    pub fn is_interacting(&self, now: Duration) -> bool {
        matches!(self.state, DragState::Dragging { .. }) || now < self.clicks_blocked_until
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.state = DragState::Dragging {
            last: (x, y),
            moved: false,
        };
    }

    /// Rotate by the pointer delta. Nothing moves while a record is focused
    /// or the camera is animating. Returns whether the camera rotated.
    pub fn pointer_move(&mut self, x: f64, y: f64, camera: &mut CameraController, focused: bool) -> bool {
        let DragState::Dragging { last, .. } = self.state else {
            return false;
        };
        let (dx, dy) = (x - last.0, y - last.1);
        self.state = DragState::Dragging {
            last: (x, y),
            moved: true,
        };
        if focused || camera.state().path_in_flight() {
            return false;
        }
        camera.apply_drag(dx, dy, self.config.drag_sensitivity)
    }

    /// End of a press. A press that never moved resolves as a click.
    pub fn pointer_up(
        &mut self,
        x: f64,
        y: f64,
        now: Duration,
        camera: &CameraState,
        hits: &HitContext,
    ) -> Option<GlobeEvent> {
        let previous = std::mem::replace(&mut self.state, DragState::Idle);
        match previous {
            DragState::Idle => None,
            DragState::Dragging { moved: true, .. } => {
                self.clicks_blocked_until = now + Duration::from_millis(self.config.click_debounce_ms);
                None
            }
            DragState::Dragging { moved: false, .. } => self.click(x, y, now, camera, hits),
        }
    }

    /// Resolve a click: the callout expands its record, a marker asks for
    /// focus, empty background asks for a reset. Marker and background
    /// clicks are dropped while anything else owns the camera.
    pub fn click(&self, x: f64, y: f64, now: Duration, camera: &CameraState, hits: &HitContext) -> Option<GlobeEvent> {
        if self.is_interacting(now) {
            debug!(x, y, "click ignored during drag debounce");
            return None;
        }
        if let Some(callout) = hits.callout.filter(|c| c.rect.contains(x, y)) {
            return Some(GlobeEvent::RecordExpanded(callout.record_id.clone()));
        }
        let busy = hits.focused.is_some() || camera.path_in_flight();
        match hits.markers.hit_test(x, y, self.config.marker_hit_radius) {
            Some(_) if busy => None,
            Some(marker) => Some(GlobeEvent::RecordFocused(marker.id.clone())),
            None if busy => None,
            None => Some(GlobeEvent::ResetRequested),
        }
    }

    /// Arrow-key rotation, as a drag of `key_rotate_step` pixels per step.
    pub fn rotate_by_keys(&self, steps_x: f64, steps_y: f64, camera: &mut CameraController, focused: bool) -> bool {
        if focused || camera.state().path_in_flight() {
            return false;
        }
        let step = self.config.key_rotate_step;
        camera.apply_drag(steps_x * step, steps_y * step, self.config.drag_sensitivity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::PixelRect;
    use crate::camera::Viewport;
    use crate::config::GlobeConfig;
    use crate::records::sample_records;

    fn setup() -> (InteractionHandler, CameraController, MarkerLayer) {
        let config = GlobeConfig::default();
        let camera = CameraController::new(config.camera, Viewport::new(300.0, 200.0));
        let records = sample_records();
        let mut markers = MarkerLayer::new();
        let visible: Vec<_> = records.iter().collect();
        markers.reconcile(&visible, None);
        markers.update(&camera.state().projection(camera.viewport()), 1.57);
        (InteractionHandler::new(config.interaction), camera, markers)
    }

    fn hits<'a>(markers: &'a MarkerLayer, callout: Option<&'a Callout>, focused: Option<&'a str>) -> HitContext<'a> {
        HitContext {
            markers,
            callout,
            focused,
        }
    }

    const LATER: Duration = Duration::from_secs(10);

    #[test]
    fn test_drag_rotates_camera() {
        let (mut handler, mut camera, _) = setup();
        let before = camera.state().rotation;
        handler.pointer_down(100.0, 100.0);
        assert!(handler.pointer_move(110.0, 96.0, &mut camera, false));
        let after = camera.state().rotation;
        assert!(after.yaw > before.yaw);
        assert!(after.pitch > before.pitch);
    }

    #[test]
    fn test_drag_disabled_when_focused_or_flying() {
        let (mut handler, mut camera, _) = setup();
        let before = camera.state().rotation;
        handler.pointer_down(100.0, 100.0);
        assert!(!handler.pointer_move(120.0, 100.0, &mut camera, true));
        camera.animate_path_segment(0.0, 0.0, 10.0, 10.0);
        let flying = camera.state().rotation;
        assert!(!handler.pointer_move(140.0, 100.0, &mut camera, false));
        assert_eq!(camera.state().rotation, flying);
        assert_eq!(before, flying);
    }

    #[test]
    fn test_move_without_press_does_nothing() {
        let (mut handler, mut camera, _) = setup();
        assert!(!handler.pointer_move(10.0, 10.0, &mut camera, false));
        assert_eq!(handler.state(), DragState::Idle);
    }

    #[test]
    fn test_click_on_marker_requests_focus() {
        let (mut handler, camera, markers) = setup();
        let (x, y) = markers.get("3").unwrap().screen.unwrap();
        handler.pointer_down(x, y);
        let event = handler.pointer_up(x, y, LATER, &camera.state(), &hits(&markers, None, None));
        assert_eq!(event, Some(GlobeEvent::RecordFocused("3".to_string())));
    }

    #[test]
    fn test_marker_click_ignored_when_focused() {
        let (handler, camera, markers) = setup();
        let (x, y) = markers.get("3").unwrap().screen.unwrap();
        let event = handler.click(x, y, LATER, &camera.state(), &hits(&markers, None, Some("1")));
        assert_eq!(event, None);
    }

    #[test]
    fn test_background_click_requests_reset() {
        let (handler, mut camera, markers) = setup();
        let event = handler.click(2.0, 2.0, LATER, &camera.state(), &hits(&markers, None, None));
        assert_eq!(event, Some(GlobeEvent::ResetRequested));

        camera.animate_path_segment(0.0, 0.0, 10.0, 10.0);
        assert_eq!(handler.click(2.0, 2.0, LATER, &camera.state(), &hits(&markers, None, None)), None);
    }

    #[test]
    fn test_drag_release_is_debounced() {
        let (mut handler, mut camera, markers) = setup();
        let (x, y) = markers.get("3").unwrap().screen.unwrap();
        handler.pointer_down(x - 20.0, y);
        handler.pointer_move(x, y, &mut camera, false);
        let now = Duration::from_millis(1000);
        assert_eq!(handler.pointer_up(x, y, now, &camera.state(), &hits(&markers, None, None)), None);
        assert!(handler.is_interacting(now + Duration::from_millis(20)));
        assert_eq!(
            handler.click(2.0, 2.0, now + Duration::from_millis(20), &camera.state(), &hits(&markers, None, None)),
            None
        );
        assert!(!handler.is_interacting(now + Duration::from_millis(60)));
    }

    #[test]
    fn test_callout_click_expands() {
        let (handler, camera, markers) = setup();
        let callout = Callout {
            record_id: "2".to_string(),
            anchor: (150.0, 100.0),
            rect: PixelRect {
                x: 114.0,
                y: 60.0,
                width: 72.0,
                height: 28.0,
            },
        };
        let event = handler.click(150.0, 70.0, LATER, &camera.state(), &hits(&markers, Some(&callout), Some("2")));
        assert_eq!(event, Some(GlobeEvent::RecordExpanded("2".to_string())));
    }

    #[test]
    fn test_keys_rotate_like_drag() {
        let (handler, mut camera, _) = setup();
        let before = camera.state().rotation;
        assert!(handler.rotate_by_keys(-1.0, 0.0, &mut camera, false));
        assert!(camera.state().rotation.yaw < before.yaw);
        assert!(!handler.rotate_by_keys(1.0, 0.0, &mut camera, true));
    }
}
