//! The framebuffer device: five write registers and a fixed RGB pixel grid.
//!
//! The device itself has no threading concerns. A renderer is expected to
//! poll [take_dirty](Screen::take_dirty) at its own cadence and pull a
//! [snapshot](Screen::snapshot) of the grid when the flag was set, so all
//! mutation stays with the execution engine.

/// A single RGB color value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

/// Default grid dimensions.
pub const DEFAULT_WIDTH: usize = 64;
pub const DEFAULT_HEIGHT: usize = 64;

/// The pixel framebuffer.
///
/// The `SET_*` opcodes write the registers; `DRAW_PIXEL` commits the register
/// state into the grid.
#[derive(Debug, Clone)]
pub struct Screen {
    /// X coordinate register.
    pub x: u8,

    /// Y coordinate register.
    pub y: u8,

    /// Red channel register.
    pub r: u8,

    /// Green channel register.
    pub g: u8,

    /// Blue channel register.
    pub b: u8,

    width: usize,
    height: usize,
    grid: Vec<u8>,
    dirty: bool,
}

impl Default for Screen {
    fn default() -> Screen {
        Screen::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl Screen {
    pub fn new(width: usize, height: usize) -> Screen {
        Screen {
            x: 0,
            y: 0,
            r: 0,
            g: 0,
            b: 0,
            width,
            height,
            grid: vec![0; width * height * 3],
            dirty: false,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Commits (X, Y) → (R, G, B) into the grid and sets the dirty flag.
    /// Returns whether the write landed.
    ///
    /// Out-of-bounds coordinates are a silent no-op, not an error.
    pub fn draw_pixel(&mut self) -> bool {
        let (x, y) = (self.x as usize, self.y as usize);

        if x >= self.width || y >= self.height {
            return false;
        }

        let offset = (y * self.width + x) * 3;
        self.grid[offset] = self.r;
        self.grid[offset + 1] = self.g;
        self.grid[offset + 2] = self.b;
        self.dirty = true;

        true
    }

    /// Zeroes the grid and sets the dirty flag.
    pub fn clear(&mut self) {
        for cell in &mut self.grid {
            *cell = 0;
        }

        self.dirty = true;
    }

    /// Returns the stored color, or black for out-of-range coordinates.
    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        if x >= self.width || y >= self.height {
            return BLACK;
        }

        let offset = (y * self.width + x) * 3;

        Rgb {
            r: self.grid[offset],
            g: self.grid[offset + 1],
            b: self.grid[offset + 2],
        }
    }

    /// Returns whether unconsumed pixel changes exist and clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// A copy of the raw grid, `width * height * 3` bytes in row-major RGB
    /// order, for the renderer.
    pub fn snapshot(&self) -> Vec<u8> {
        self.grid.clone()
    }
}
