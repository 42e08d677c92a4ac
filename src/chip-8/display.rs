pub const FRAME_BUFFER_PIXEL_WIDTH: usize = 64;
pub const FRAME_BUFFER_PIXEL_HEIGHT: usize = 32;

const PIXEL_ON: u32 = 0x00_FF_FF_FF;
const PIXEL_OFF: u32 = 0x00_00_00_00;

/// The 64x32 monochrome screen.
///
/// Sprites are clipped at the right and bottom edges, they never wrap.
pub struct Framebuffer {
    pixels: [[bool; FRAME_BUFFER_PIXEL_WIDTH]; FRAME_BUFFER_PIXEL_HEIGHT],
    dirty: bool,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self {
            pixels: [[false; FRAME_BUFFER_PIXEL_WIDTH]; FRAME_BUFFER_PIXEL_HEIGHT],
            dirty: true,
        }
    }
}

impl Framebuffer {
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Whether the pixel at column `x`, row `y` is lit. Off-screen pixels are never lit.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(false)
    }

    /// One `0x00RRGGBB` value per pixel in row-major order, white on black.
    pub fn rgba_framebuffer(&self) -> Vec<u32> {
        self.pixels
            .iter()
            .flat_map(|row| row.iter())
            .map(|&lit| if lit { PIXEL_ON } else { PIXEL_OFF })
            .collect()
    }

    pub(crate) fn cls(&mut self) {
        self.pixels = [[false; FRAME_BUFFER_PIXEL_WIDTH]; FRAME_BUFFER_PIXEL_HEIGHT];
        self.dirty = true;
    }

    /// XOR `rows` onto the screen with the top left corner at (`x`, `y`).
    ///
    /// Returns true if any lit pixel was turned off.
    pub(crate) fn draw_sprite(&mut self, x: u8, y: u8, rows: &[u8]) -> bool {
        self.dirty = true;
        let x = x as usize;
        let y = y as usize;

        rows.iter()
            .enumerate()
            .take_while(|(y_offset, _)| y + y_offset < FRAME_BUFFER_PIXEL_HEIGHT)
            .fold(false, |did_collide, (y_offset, &sprite)| {
                let row = &mut self.pixels[y + y_offset];
                let inner_collide = (0..8_usize)
                    .take_while(|&x_bit| x + x_bit < FRAME_BUFFER_PIXEL_WIDTH)
                    .filter(|&x_bit| (sprite << x_bit) & 0x80 != 0)
                    .fold(false, |did_collide_inner, x_bit| {
                        let pixel = &mut row[x + x_bit];
                        let was_lit = *pixel;
                        *pixel = !was_lit;

                        did_collide_inner || was_lit
                    });

                did_collide || inner_collide
            })
    }
}
