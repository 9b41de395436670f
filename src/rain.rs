// Falling letters that come to rest on dark silhouettes.
// Visual outcomes:
// - Every few frames a random word drops in from the top, one letter per particle.
// - Letters over a dark region of the obstacle mask stop and sit on its upper edge.
// - Letters that leave the bottom of the screen reappear at the top.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::coords::{clamp_to_raster, row_to_y, scene_column, scene_row};
use crate::types::PixelBuffer;

/// Live particle cap.
pub const MAX_DROPS: usize = 250;
/// A new word is spawned on every Nth tick.
pub const SPAWN_INTERVAL: u32 = 5;
/// Downward speed in scene units per second.
pub const FALL_SPEED: f32 = 0.25;
/// Stand-in for words that contain nothing printable.
pub const PLACEHOLDER_GLYPH: char = 'a';
/// Tilt applied while a letter is being pushed up (radians per second of frame time).
pub const BLOCKED_TILT: f32 = 30.0;

pub const DEFAULT_TEXT: &str = "On the loose to climb a mountain On the loose where I am free \
On the loose to live my life the way I think my life should be \
For I only have a moment and a whole world yet to see \
I'll be looking for tomorrow on the loose";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DropState {
    Falling,
    Blocked,
}

/// One falling letter. Position is in scene space.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub glyph: char,
    pub rotation: f32,
    pub state: DropState,
}

impl Particle {
    /// A falling letter at the top edge of the scene.
    pub fn new(glyph: char, x: f32) -> Self {
        Self {
            x,
            y: 1.0,
            vx: 0.0,
            vy: -FALL_SPEED,
            glyph,
            rotation: 0.0,
            state: DropState::Falling,
        }
    }

    fn fall(&mut self) {
        self.vx = 0.0;
        self.vy = -FALL_SPEED;
        self.state = DropState::Falling;
    }
}

/// The words letters are drawn from.
#[derive(Clone, Debug)]
pub struct SpawnText {
    words: Vec<String>,
}

impl SpawnText {
    /// Split on single spaces. Empty and whitespace-only words are kept; they spawn a placeholder.
    pub fn from_text(text: &str) -> Self {
        Self {
            words: text.split(' ').map(str::to_owned).collect(),
        }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        self.words.choose(rng).map(String::as_str).unwrap_or(" ")
    }

    /// Letters a word turns into: its printable characters, or a single placeholder.
    pub fn glyphs_for(word: &str) -> Vec<char> {
        let glyphs: Vec<char> = word.chars().filter(|c| !c.is_whitespace()).collect();
        if glyphs.is_empty() {
            vec![PLACEHOLDER_GLYPH]
        } else {
            glyphs
        }
    }
}

impl Default for SpawnText {
    fn default() -> Self {
        Self::from_text(DEFAULT_TEXT)
    }
}

/// Walk up from `row` while the mask is dark, stopping at row 0.
/// Returns the row reached and how many steps it took.
fn climb_to_clear_row(mask: &PixelBuffer, col: usize, mut row: usize) -> (usize, usize) {
    let mut steps = 0;
    while row > 0 && mask.red(col, row).is_some_and(|r| r < 255) {
        row -= 1;
        steps += 1;
    }
    (row, steps)
}

/// Advance one particle by one tick against the obstacle mask.
pub fn step_drop(p: &mut Particle, mask: &PixelBuffer, dt: f32) {
    let w = mask.width();
    let h = mask.height();
    let cell = clamp_to_raster(scene_column(p.x, w), scene_row(p.y, h), w, h);

    match cell {
        Some((col, row)) if mask.red(col, row).is_some_and(|r| r < 255) => {
            p.state = DropState::Blocked;
            p.vx = 0.0;
            p.vy = 0.0;
            let (clear, steps) = climb_to_clear_row(mask, col, row);
            if steps > 0 {
                p.rotation = BLOCKED_TILT * dt;
            }
            p.y = row_to_y(clear as i64, h);
        }
        _ => {
            p.fall();
            p.rotation = 0.0;
        }
    }

    p.x += p.vx * dt;
    p.y += p.vy * dt;

    if p.y < -1.0 {
        p.y = 1.0;
        p.fall();
    }
}

/// Owns every live particle plus the spawn clock.
pub struct Rain {
    drops: Vec<Particle>,
    text: SpawnText,
    ticks: u32,
}

impl Rain {
    pub fn new(text: SpawnText) -> Self {
        Self {
            drops: Vec::with_capacity(MAX_DROPS),
            text,
            ticks: 0,
        }
    }

    pub fn drops(&self) -> &[Particle] {
        &self.drops
    }

    pub fn len(&self) -> usize {
        self.drops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drops.is_empty()
    }

    /// Add a particle directly. Refused (returns false) once the cap is reached.
    pub fn push(&mut self, p: Particle) -> bool {
        if self.drops.len() >= MAX_DROPS {
            return false;
        }
        self.drops.push(p);
        true
    }

    /// Drop one random word in from the top. Letters beyond the cap are skipped.
    /// Visual: a short burst of new letters appears along the top edge.
    pub fn spawn_word<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let glyphs = SpawnText::glyphs_for(self.text.choose(rng));
        let room = MAX_DROPS.saturating_sub(self.drops.len());
        let mut spawned = 0;
        for glyph in glyphs.into_iter().take(room) {
            let x = rng.gen_range(-1.0..=1.0);
            self.drops.push(Particle::new(glyph, x));
            spawned += 1;
        }
        log::trace!("spawned {spawned} letters ({} live)", self.drops.len());
        spawned
    }

    /// One simulation step: maybe spawn, then move every particle against `mask`.
    pub fn tick<R: Rng + ?Sized>(&mut self, mask: &PixelBuffer, dt: f32, rng: &mut R) {
        // Counts 1..=SPAWN_INTERVAL, then starts over.
        self.ticks += 1;
        if self.ticks >= SPAWN_INTERVAL {
            self.ticks = 0;
            if self.drops.len() < MAX_DROPS {
                self.spawn_word(rng);
            }
        }

        for p in &mut self.drops {
            step_drop(p, mask, dt);
        }
    }
}
