use ratatui::style::Color;

/// Braille Unicode canvas with one foreground color per character cell.
/// Each character cell represents a 2x4 pixel grid (8 dots).
/// Unicode Braille patterns: U+2800 to U+28FF
///
/// Drawing is back to front: a dot ORs into its cell and the cell takes the
/// current pen color, so the last layer touching a cell decides its color.
#[derive(Clone)]
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    pixels: Vec<Vec<u8>>, // Bit patterns per char
    colors: Vec<Vec<Color>>,
    pen: Color,
}

impl BrailleCanvas {
    /// Create a new canvas with the given character dimensions.
    /// Effective pixel resolution: width*2 x height*4
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![vec![0u8; width]; height],
            colors: vec![vec![Color::Reset; width]; height],
            pen: Color::White,
        }
    }

    /// Character dimensions (columns, rows).
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Pixel dimensions (width*2, height*4).
    pub fn pixel_size(&self) -> (usize, usize) {
        (self.width * 2, self.height * 4)
    }

    /// Wipe every dot and color, keeping the allocation.
    pub fn clear(&mut self) {
        for row in &mut self.pixels {
            row.fill(0);
        }
        for row in &mut self.colors {
            row.fill(Color::Reset);
        }
    }

    /// Color used by subsequent `set_pixel` calls.
    pub fn set_pen(&mut self, color: Color) {
        self.pen = color;
    }

    #[inline(always)]
    fn bit(x: usize, y: usize) -> u8 {
        match (x % 2, y % 4) {
            (0, 0) => 0x01,
            (1, 0) => 0x08,
            (0, 1) => 0x02,
            (1, 1) => 0x10,
            (0, 2) => 0x04,
            (1, 2) => 0x20,
            (0, 3) => 0x40,
            (1, 3) => 0x80,
            _ => 0,
        }
    }

    /// Set a pixel at the given coordinates.
    /// Braille dot layout per character:
    /// ```text
    /// (0,0) (1,0)   bits: 0x01 0x08
    /// (0,1) (1,1)   bits: 0x02 0x10
    /// (0,2) (1,2)   bits: 0x04 0x20
    /// (0,3) (1,3)   bits: 0x40 0x80
    /// ```
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        let cx = x / 2;
        let cy = y / 4;

        if cx >= self.width || cy >= self.height {
            return;
        }

        self.pixels[cy][cx] |= Self::bit(x, y);
        self.colors[cy][cx] = self.pen;
    }

    /// Set a pixel using signed coordinates (ignores negative values)
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    /// Remove a dot. Used by opaque layers to occlude what is behind them.
    pub fn clear_pixel_signed(&mut self, x: i32, y: i32) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        let (cx, cy) = (x / 2, y / 4);
        if cx >= self.width || cy >= self.height {
            return;
        }
        self.pixels[cy][cx] &= !Self::bit(x, y);
    }

    /// Whether a dot is set (out-of-range reads as unset).
    pub fn is_set(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        let (x, y) = (x as usize, y as usize);
        let (cx, cy) = (x / 2, y / 4);
        if cx >= self.width || cy >= self.height {
            return false;
        }
        self.pixels[cy][cx] & Self::bit(x, y) != 0
    }

    /// Color of a character cell, `None` when the cell has no dots.
    pub fn cell_color(&self, col: usize, row: usize) -> Option<Color> {
        let bits = *self.pixels.get(row)?.get(col)?;
        (bits != 0).then(|| self.colors[row][col])
    }

    /// Convert the canvas to a string of Braille characters
    #[cfg(test)]
    pub fn to_string(&self) -> String {
        self.pixels
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&b| char::from_u32(0x2800 + b as u32).unwrap_or(' '))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Iterate the cells of a row as (braille char, color)
    pub fn row_cells(&self, row: usize) -> impl Iterator<Item = (char, Color)> + '_ {
        let bits = self.pixels.get(row).map(Vec::as_slice).unwrap_or(&[]);
        let colors = self.colors.get(row).map(Vec::as_slice).unwrap_or(&[]);
        bits.iter()
            .zip(colors)
            .map(|(&b, &c)| (char::from_u32(0x2800 + b as u32).unwrap_or(' '), c))
    }

    /// Number of set dots (used by tests and frame stats)
    pub fn dot_count(&self) -> usize {
        self.pixels
            .iter()
            .flatten()
            .map(|b| b.count_ones() as usize)
            .sum()
    }
}
