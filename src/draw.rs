// Window + software drawing utilities.
// Visual effects provided here:
// 1) A window that shows the mirrored camera image (or the obstacle mask).
// 2) The falling letters, drawn as small rotated tiles on top.
// 3) A one-line HUD in the 5x7 bitmap font.

use crate::coords::{scene_column, scene_row};
use crate::error::Error;
use crate::glyph::{GlyphAtlas, glyph5x7};
use crate::rain::Particle;
use crate::types::FrameBuffer;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

/// Side of a letter tile in scene units (the scene is 2 units wide).
pub const DROP_SIZE: f32 = 0.03;

pub struct Drawer {
    window: Window, // the on-screen window you see
}

impl Drawer {
    /// Create a window sized to the camera feed.
    /// Visual: a new empty window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Keep the window responsive on ticks where there is nothing new to show.
    pub fn pump(&mut self) {
        self.window.update();
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    // D flips between the live view and the obstacle mask.
    pub fn d_pressed_once(&self) -> bool {
        self.window.is_key_pressed(Key::D, KeyRepeat::No)
    }

    // Up/Down move the threshold; holding the key keeps stepping.
    pub fn up_pressed(&self) -> bool {
        self.window.is_key_pressed(Key::Up, KeyRepeat::Yes)
    }

    pub fn down_pressed(&self) -> bool {
        self.window.is_key_pressed(Key::Down, KeyRepeat::Yes)
    }
}

/* ---------- Software drawing: pixels, letter tiles, tiny bitmap font ---------- */

#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

#[inline]
fn pack(px: [u8; 4]) -> u32 {
    ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32
}

/// Draw every particle as a tile of `DROP_SIZE` scene units, rotated by its `rotation`.
/// Visual: letters appear where the simulation put them; resting ones tilt and turn red.
pub fn draw_particles(fb: &mut FrameBuffer, particles: &[Particle], atlas: &mut GlyphAtlas) {
    if fb.width == 0 || fb.height == 0 {
        return;
    }
    let side_w = (DROP_SIZE / 2.0 * fb.width as f32).max(1.0);
    let side_h = (DROP_SIZE / 2.0 * fb.height as f32).max(1.0);
    let reach = ((side_w * side_w + side_h * side_h).sqrt() / 2.0).ceil() as i32;

    for p in particles {
        let tex = atlas.texture_for(p.glyph, p.state);
        let (tw, th) = (tex.width() as f32, tex.height() as f32);
        let cx = scene_column(p.x, fb.width) as i32;
        let cy = scene_row(p.y, fb.height) as i32;
        let (sin, cos) = p.rotation.sin_cos();

        // Inverse-rotate each screen pixel into tile space and sample the nearest texel.
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let (fx, fy) = (dx as f32, -(dy as f32)); // scene orientation, +y up
                let u = fx * cos + fy * sin;
                let v = -fx * sin + fy * cos;
                let tx = (u / side_w + 0.5) * tw;
                let ty = (0.5 - v / side_h) * th;
                if tx < 0.0 || ty < 0.0 || tx >= tw || ty >= th {
                    continue;
                }
                if let Some(px) = tex.pixel(tx as usize, ty as usize) {
                    put_pixel(fb, cx + dx, cy + dy, pack(px));
                }
            }
        }
    }
}

/// Draw a single 5x7 character at (x,y) with a 1-pixel black shadow.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32) {
    if let Some(rows) = glyph5x7(ch) {
        for (offset, c) in [(1, 0x00000000), (0, color)] {
            for (ry, rowbits) in rows.iter().enumerate() {
                for rx in 0..5 {
                    if (rowbits & (1 << (4 - rx))) != 0 {
                        put_pixel(fb, x + rx as i32 + offset, y + ry as i32 + offset, c);
                    }
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs, 1-pixel spacing.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color);
        x += 6;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::{BLOCKED_TILE, FALLING_TILE};
    use crate::rain::DropState;

    fn screen(w: usize, h: usize) -> FrameBuffer {
        FrameBuffer { width: w, height: h, pixels: vec![0; w * h] }
    }

    #[test]
    fn particle_tile_lands_at_its_scene_position() {
        let mut fb = screen(200, 200);
        let mut atlas = GlyphAtlas::new();
        // blank glyph: the whole tile is background
        let mut p = Particle::new(' ', 0.0);
        p.y = 0.0;
        draw_particles(&mut fb, &[p], &mut atlas);
        assert_eq!(fb.pixels[100 * 200 + 100], pack(FALLING_TILE));
        assert_eq!(fb.pixels[0], 0);
    }

    #[test]
    fn blocked_particles_use_blocked_tile() {
        let mut fb = screen(200, 200);
        let mut atlas = GlyphAtlas::new();
        let mut p = Particle::new(' ', 0.0);
        p.y = 0.0;
        p.state = DropState::Blocked;
        p.rotation = 0.4;
        draw_particles(&mut fb, &[p], &mut atlas);
        assert_eq!(fb.pixels[100 * 200 + 100], pack(BLOCKED_TILE));
    }

    #[test]
    fn particles_off_screen_are_clipped() {
        let mut fb = screen(50, 50);
        let mut atlas = GlyphAtlas::new();
        let mut p = Particle::new('x', 1.0);
        p.y = -1.0;
        draw_particles(&mut fb, &[p], &mut atlas);
        assert_eq!(fb.pixels.len(), 2500);
    }

    #[test]
    fn hud_text_draws_something() {
        let mut fb = screen(120, 12);
        draw_text_5x7(&mut fb, 1, 1, "FPS 30.0", 0x00FFFFFF);
        assert!(fb.pixels.iter().any(|&p| p == 0x00FFFFFF));
    }
}
