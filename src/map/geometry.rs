use crate::braille::BrailleCanvas;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    bresenham(x0, y0, x1, y1, |x, y| canvas.set_pixel_signed(x, y));
}

/// On/off dash pattern whose phase carries across consecutive segments,
/// so a polyline made of many short pieces still dashes evenly.
#[derive(Clone, Copy, Debug)]
pub struct Dash {
    on: u32,
    off: u32,
    phase: u32,
}

impl Dash {
    pub fn new(on: u32, off: u32) -> Self {
        Self {
            on: on.max(1),
            off,
            phase: 0,
        }
    }

    /// Advance one pixel; true when the pixel is inked.
    #[inline(always)]
    fn step(&mut self) -> bool {
        let inked = self.phase < self.on;
        self.phase = (self.phase + 1) % (self.on + self.off).max(1);
        inked
    }
}

/// Draw a dashed line. The shared endpoint of consecutive segments is only
/// counted once so the pattern does not stutter at joins.
pub fn draw_dashed_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32, dash: &mut Dash) {
    let mut first = true;
    bresenham(x0, y0, x1, y1, |x, y| {
        if first {
            first = false;
            return;
        }
        if dash.step() {
            canvas.set_pixel_signed(x, y);
        }
    });
}

/// Two-pixel-wide dashed line (the active travel segment). Both strands
/// share one dash phase so the gaps line up.
pub fn draw_thick_dashed_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32, dash: &mut Dash) {
    let mut shadow = *dash;
    if (x1 - x0).abs() >= (y1 - y0).abs() {
        draw_dashed_line(canvas, x0, y0 + 1, x1, y1 + 1, &mut shadow);
    } else {
        draw_dashed_line(canvas, x0 + 1, y0, x1 + 1, y1, &mut shadow);
    }
    draw_dashed_line(canvas, x0, y0, x1, y1, dash);
}

fn bresenham(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        plot(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a circle outline (midpoint algorithm)
pub fn draw_circle_outline(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    if radius <= 0 {
        canvas.set_pixel_signed(cx, cy);
        return;
    }
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;
    while x >= y {
        for (px, py) in [
            (x, y), (y, x), (-y, x), (-x, y),
            (-x, -y), (-y, -x), (y, -x), (x, -y),
        ] {
            canvas.set_pixel_signed(cx + px, cy + py);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

/// Diamond outline: |dx| + |dy| == r
pub fn draw_diamond(canvas: &mut BrailleCanvas, cx: i32, cy: i32, r: i32) {
    draw_line(canvas, cx, cy - r, cx + r, cy);
    draw_line(canvas, cx + r, cy, cx, cy + r);
    draw_line(canvas, cx, cy + r, cx - r, cy);
    draw_line(canvas, cx - r, cy, cx, cy - r);
}

/// Filled diamond: |dx| + |dy| <= r
pub fn fill_diamond(canvas: &mut BrailleCanvas, cx: i32, cy: i32, r: i32) {
    for dy in -r..=r {
        let span = r - dy.abs();
        for dx in -span..=span {
            canvas.set_pixel_signed(cx + dx, cy + dy);
        }
    }
}

/// Axis-aligned square outline with half-size `h`
pub fn draw_box(canvas: &mut BrailleCanvas, cx: i32, cy: i32, h: i32) {
    draw_line(canvas, cx - h, cy - h, cx + h, cy - h);
    draw_line(canvas, cx + h, cy - h, cx + h, cy + h);
    draw_line(canvas, cx + h, cy + h, cx - h, cy + h);
    draw_line(canvas, cx - h, cy + h, cx - h, cy - h);
}

/// 4x4 Bayer matrix threshold in (0, 1) for ordered dithering.
/// A pixel is inked when its intensity exceeds the threshold.
#[inline(always)]
pub fn bayer_threshold(x: i32, y: i32) -> f64 {
    const BAYER: [[u8; 4]; 4] = [
        [0, 8, 2, 10],
        [12, 4, 14, 6],
        [3, 11, 1, 9],
        [15, 7, 13, 5],
    ];
    let v = BAYER[y.rem_euclid(4) as usize][x.rem_euclid(4) as usize];
    (v as f64 + 0.5) / 16.0
}
