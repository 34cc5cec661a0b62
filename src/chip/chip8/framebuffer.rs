use crate::chip::chip8::constants::{
    CHIP8_DISPLAY_HEIGHT, CHIP8_DISPLAY_SIZE, CHIP8_DISPLAY_WIDTH, CHIP8_RGBA_BYTES_PER_PIXEL,
};

/// The 64x32 monochrome display. Pixels are stored row-major, `true` meaning set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: [bool; CHIP8_DISPLAY_SIZE],
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: [false; CHIP8_DISPLAY_SIZE],
        }
    }

    pub fn clear(&mut self) {
        self.pixels = [false; CHIP8_DISPLAY_SIZE];
    }

    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }

    /// Returns the pixel at (`x`, `y`). Coordinates wrap around the display edges.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[Self::translate(x, y)]
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|pixel| !pixel)
    }

    /// XORs an 8 pixel wide sprite row onto the display with its leftmost pixel at
    /// (`x`, `y`). Every pixel wraps around the display edges independently. Returns
    /// whether a set pixel was cleared, and whether any pixel changed at all.
    pub(crate) fn xor_row(&mut self, x: usize, y: usize, row: u8) -> (bool, bool) {
        let mut collision = false;
        let mut changed = false;
        for x_pos in 0..8 {
            if row & (0x80 >> x_pos) == 0 {
                continue;
            }
            let pixel_pos = Self::translate(x + x_pos, y);
            if self.pixels[pixel_pos] {
                collision = true;
            }
            self.pixels[pixel_pos] ^= true;
            changed = true;
        }
        (collision, changed)
    }

    /// Writes the display as packed RGBA into `out`: four 0xFF bytes per set pixel,
    /// four 0x00 bytes per clear pixel.
    ///
    /// # Panics
    /// In case `out` is not exactly `64 * 32 * 4` bytes long.
    pub fn write_rgba(&self, out: &mut [u8]) {
        assert_eq!(out.len(), CHIP8_DISPLAY_SIZE * CHIP8_RGBA_BYTES_PER_PIXEL);
        for (pixel, chunk) in self
            .pixels
            .iter()
            .zip(out.chunks_exact_mut(CHIP8_RGBA_BYTES_PER_PIXEL))
        {
            chunk.fill(if *pixel { 0xFF } else { 0x00 });
        }
    }

    pub fn to_rgba(&self) -> Vec<u8> {
        let mut out = vec![0; CHIP8_DISPLAY_SIZE * CHIP8_RGBA_BYTES_PER_PIXEL];
        self.write_rgba(&mut out);
        out
    }

    fn translate(x: usize, y: usize) -> usize {
        (x % CHIP8_DISPLAY_WIDTH) + (y % CHIP8_DISPLAY_HEIGHT) * CHIP8_DISPLAY_WIDTH
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Framebuffer::new()
    }
}
