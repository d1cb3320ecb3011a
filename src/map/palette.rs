//! Terminal stand-ins for canvas opacity: a cell has one color, so
//! "alpha" is expressed by scaling the color toward the black background.

use ratatui::style::Color;

pub type Rgb = [u8; 3];

pub const CYAN: Rgb = [0, 255, 255];
pub const MAGENTA: Rgb = [255, 0, 255];
pub const WHITE: Rgb = [255, 255, 255];

/// `rgb` at the given opacity over black.
#[inline(always)]
pub fn fade(rgb: Rgb, alpha: f64) -> Color {
    let a = alpha.clamp(0.0, 1.0);
    Color::Rgb(
        (rgb[0] as f64 * a).round() as u8,
        (rgb[1] as f64 * a).round() as u8,
        (rgb[2] as f64 * a).round() as u8,
    )
}

/// Linear blend between two colors at `t` in [0, 1].
#[inline(always)]
pub fn mix(a: Rgb, b: Rgb, t: f64) -> Rgb {
    let t = t.clamp(0.0, 1.0);
    let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    [lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2])]
}
