use std::collections::HashMap;

use tracing::debug;

use crate::braille::BrailleCanvas;
use crate::map::geometry::{draw_box, draw_diamond, fill_diamond};
use crate::map::globe::{angular_distance, LonLat};
use crate::map::palette::{fade, WHITE};
use crate::map::projection::Orthographic;
use crate::records::{Category, Record};

/// Unfocused glyph: outline half-diagonal and inner fill, in pixels
const OUTLINE_RADIUS: i32 = 4;
const FILL_RADIUS: i32 = 2;
/// Focused glyph is scaled up and framed by a square ring
const FOCUSED_OUTLINE_RADIUS: i32 = 5;
const FOCUSED_FILL_RADIUS: i32 = 3;
const FOCUS_RING_HALF: i32 = 7;

#[derive(Debug, Clone)]
pub struct Marker {
    pub id: String,
    pub position: LonLat,
    pub category: Category,
    pub focused: bool,
    /// Screen position this frame; `None` when on the far side
    pub screen: Option<(f64, f64)>,
}

/// One glyph per visible record, keyed by record id. Reconciling against a
/// new visible set only touches the glyphs that changed.
#[derive(Default)]
pub struct MarkerLayer {
    markers: HashMap<String, Marker>,
    /// Draw order, chronological
    order: Vec<String>,
}

impl MarkerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Marker> {
        self.markers.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.order.iter().filter_map(|id| self.markers.get(id))
    }

    /// Bring the glyph set in line with `visible`. Returns (added, removed).
    pub fn reconcile(&mut self, visible: &[&Record], focused: Option<&str>) -> (usize, usize) {
        let before = self.markers.len();
        self.markers.retain(|id, _| visible.iter().any(|r| &r.id == id));
        let removed = before - self.markers.len();

        let mut added = 0;
        for record in visible {
            let marker = self.markers.entry(record.id.clone()).or_insert_with(|| {
                added += 1;
                Marker {
                    id: record.id.clone(),
                    position: record.lon_lat(),
                    category: record.category,
                    focused: false,
                    screen: None,
                }
            });
            // Records are replaced wholesale by the host, so refresh in place
            marker.position = record.lon_lat();
            marker.category = record.category;
            marker.focused = focused == Some(record.id.as_str());
        }

        if added > 0 || removed > 0 || self.order.len() != visible.len() {
            self.order = visible.iter().map(|r| r.id.clone()).collect();
            self.order.dedup();
            debug!(added, removed, total = self.order.len(), "markers reconciled");
        }
        (added, removed)
    }

    /// Re-project every glyph. Points farther than `limit` radians from the
    /// view centre are hidden even if they still project.
    pub fn update(&mut self, projection: &Orthographic, limit: f64) {
        let center = projection.center();
        for marker in self.markers.values_mut() {
            let (lon, lat) = marker.position;
            marker.screen = if angular_distance(marker.position, center) < limit {
                projection.project(lon, lat)
            } else {
                None
            };
        }
    }

    /// Unfocused glyphs first so the focused one sits on top.
    pub fn draw(&self, canvas: &mut BrailleCanvas) {
        for pass_focused in [false, true] {
            for marker in self.iter().filter(|m| m.focused == pass_focused) {
                let Some((x, y)) = marker.screen else {
                    continue;
                };
                let (x, y) = (x.round() as i32, y.round() as i32);
                let rgb = marker.category.rgb();
                if marker.focused {
                    canvas.set_pen(fade(WHITE, 0.9));
                    draw_box(canvas, x, y, FOCUS_RING_HALF);
                    canvas.set_pen(fade(rgb, 1.0));
                    draw_diamond(canvas, x, y, FOCUSED_OUTLINE_RADIUS);
                    fill_diamond(canvas, x, y, FOCUSED_FILL_RADIUS);
                } else {
                    canvas.set_pen(fade(rgb, 0.6));
                    draw_diamond(canvas, x, y, OUTLINE_RADIUS);
                    canvas.set_pen(fade(rgb, 0.85));
                    fill_diamond(canvas, x, y, FILL_RADIUS);
                }
            }
        }
    }

    /// Closest on-screen glyph within `radius` pixels of (x, y).
    pub fn hit_test(&self, x: f64, y: f64, radius: f64) -> Option<&Marker> {
        self.iter()
            .filter_map(|m| {
                let (mx, my) = m.screen?;
                let d2 = (mx - x).powi(2) + (my - y).powi(2);
                (d2 <= radius * radius).then_some((d2, m))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, m)| m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::projection::Rotation;
    use crate::records::{Location, RecordDate};

    fn rec(id: &str, lon: f64, lat: f64) -> Record {
        Record {
            id: id.to_string(),
            title: String::new(),
            description: String::new(),
            images: Vec::new(),
            date: RecordDate::new(2025, 1, 1).unwrap(),
            category: Category::Food,
            location: Location { lat, lon, name: String::new() },
        }
    }

    #[test]
    fn test_reconcile_is_incremental() {
        let a = rec("a", 0.0, 0.0);
        let b = rec("b", 10.0, 0.0);
        let c = rec("c", 20.0, 0.0);
        let mut layer = MarkerLayer::new();
        assert_eq!(layer.reconcile(&[&a, &b], None), (2, 0));
        assert_eq!(layer.reconcile(&[&a, &b], Some("b")), (0, 0));
        assert!(layer.get("b").unwrap().focused);
        assert_eq!(layer.reconcile(&[&b, &c], None), (1, 1));
        let ids: Vec<&str> = layer.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert!(!layer.get("b").unwrap().focused);
    }

    #[test]
    fn test_far_side_markers_hidden() {
        let near = rec("near", 5.0, 5.0);
        let far = rec("far", 180.0, 0.0);
        let mut layer = MarkerLayer::new();
        layer.reconcile(&[&near, &far], None);
        let proj = Orthographic::new(Rotation::centered_on(0.0, 0.0), 50.0, (100.0, 100.0));
        layer.update(&proj, 1.57);
        assert!(layer.get("near").unwrap().screen.is_some());
        assert!(layer.get("far").unwrap().screen.is_none());
    }

    #[test]
    fn test_hit_test_picks_nearest() {
        let a = rec("a", 0.0, 0.0);
        let b = rec("b", 3.0, 0.0);
        let mut layer = MarkerLayer::new();
        layer.reconcile(&[&a, &b], None);
        let proj = Orthographic::new(Rotation::centered_on(0.0, 0.0), 100.0, (100.0, 100.0));
        layer.update(&proj, 1.57);
        let (bx, by) = layer.get("b").unwrap().screen.unwrap();
        assert_eq!(layer.hit_test(bx + 1.0, by, 6.0).unwrap().id, "b");
        assert_eq!(layer.hit_test(100.0, 100.0, 6.0).unwrap().id, "a");
        assert!(layer.hit_test(100.0, 160.0, 6.0).is_none());
    }

    #[test]
    fn test_focused_glyph_drawn_larger() {
        let a = rec("a", 0.0, 0.0);
        let proj = Orthographic::new(Rotation::centered_on(0.0, 0.0), 50.0, (40.0, 40.0));

        let mut plain = MarkerLayer::new();
        plain.reconcile(&[&a], None);
        plain.update(&proj, 1.57);
        let mut small = BrailleCanvas::new(40, 20);
        plain.draw(&mut small);

        let mut focused = MarkerLayer::new();
        focused.reconcile(&[&a], Some("a"));
        focused.update(&proj, 1.57);
        let mut large = BrailleCanvas::new(40, 20);
        focused.draw(&mut large);

        assert!(large.dot_count() > small.dot_count());
        assert!(small.is_set(40, 40) && large.is_set(40, 40));
    }
}
